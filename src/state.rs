use crate::auth::{authenticate, ClientKey};
use crate::config::AppConfig;
use crate::error::BridgeError;
use crate::routing::ModelResolver;
use crate::transport::HttpTransport;

/// Shared application state accessible to all handlers.
///
/// Everything here is read-only after construction.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
    pub resolver: ModelResolver,
    client_key: ClientKey,
}

impl AppState {
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when the upstream transport cannot be
    /// built from `config`.
    pub fn new(config: AppConfig) -> Result<Self, BridgeError> {
        let transport = HttpTransport::new(&config.server, &config.upstream)?;
        let resolver = ModelResolver::new(config.model_map.clone());
        let client_key = ClientKey::from_config(&config.client_authentication);
        Ok(Self {
            config,
            transport,
            resolver,
            client_key,
        })
    }

    /// Authenticate a request against the configured client key.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Auth` when authentication fails.
    pub fn authenticate(&self, headers: &http::HeaderMap) -> Result<(), BridgeError> {
        authenticate(headers, &self.client_key)
    }

    #[must_use]
    pub fn requires_auth(&self) -> bool {
        !matches!(self.client_key, ClientKey::Disabled)
    }
}
