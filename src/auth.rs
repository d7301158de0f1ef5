use crate::config::ClientAuthConfig;
use crate::error::BridgeError;
use http::header::{HeaderName, AUTHORIZATION};

const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Client credential policy, resolved once from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientKey {
    /// No token configured: every request is accepted.
    Disabled,
    Required(Box<str>),
}

impl ClientKey {
    #[must_use]
    pub fn from_config(config: &ClientAuthConfig) -> Self {
        match config.auth_token.as_deref() {
            Some(token) if !token.is_empty() => ClientKey::Required(token.into()),
            _ => ClientKey::Disabled,
        }
    }
}

/// Extract the presented client key.
///
/// A non-empty `x-api-key` wins; otherwise `Authorization` is used with a
/// leading `Bearer ` removed when present.
#[must_use]
pub fn extract_client_key(headers: &http::HeaderMap) -> Option<&str> {
    headers
        .get(X_API_KEY)
        .and_then(|v| v.to_str().ok())
        .filter(|key| !key.is_empty())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(|value| value.strip_prefix("Bearer ").unwrap_or(value))
        })
}

/// Authenticate an incoming request against the configured client key.
///
/// # Errors
///
/// Returns `BridgeError::Auth` when a key is required and the presented one
/// is missing or different.
pub fn authenticate(headers: &http::HeaderMap, expected: &ClientKey) -> Result<(), BridgeError> {
    match expected {
        ClientKey::Disabled => Ok(()),
        ClientKey::Required(token) => match extract_client_key(headers) {
            Some(key) if key == token.as_ref() => Ok(()),
            _ => Err(BridgeError::Auth("Invalid API key".to_string())),
        },
    }
}
