use crate::protocol::error_shapes::front_error_payload;

/// Error type shared by every layer of the gateway.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad error category for status code and envelope type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    InvalidRequest,
    Upstream,
    NotFound,
    Internal,
}

impl BridgeError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::Auth(_) => ErrorCategory::Authentication,
            BridgeError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            BridgeError::Upstream { .. } => ErrorCategory::Upstream,
            BridgeError::NotFound(_) => ErrorCategory::NotFound,
            BridgeError::Config(_) | BridgeError::Transport(_) | BridgeError::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// The caller-facing message, without the variant prefix used by `Display`.
    ///
    /// Upstream bodies are forwarded verbatim.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            BridgeError::Config(msg)
            | BridgeError::Auth(msg)
            | BridgeError::InvalidRequest(msg)
            | BridgeError::Transport(msg)
            | BridgeError::NotFound(msg)
            | BridgeError::Internal(msg) => msg,
            BridgeError::Upstream { message, .. } => message,
        }
    }

    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        match self {
            BridgeError::Upstream { status, .. } => {
                http::StatusCode::from_u16(*status).unwrap_or(http::StatusCode::BAD_GATEWAY)
            }
            other => http_status_for_category(other.category()),
        }
    }
}

fn http_status_for_category(cat: ErrorCategory) -> http::StatusCode {
    match cat {
        ErrorCategory::Authentication => http::StatusCode::UNAUTHORIZED,
        ErrorCategory::InvalidRequest => http::StatusCode::BAD_REQUEST,
        ErrorCategory::NotFound => http::StatusCode::NOT_FOUND,
        ErrorCategory::Upstream => http::StatusCode::BAD_GATEWAY,
        ErrorCategory::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Internal(err.to_string())
    }
}

/// Format an error as `(status, {error: {type, message}})`.
#[must_use]
pub fn format_error(err: &BridgeError) -> (http::StatusCode, serde_json::Value) {
    (
        err.status(),
        front_error_payload(err.category(), err.message()),
    )
}

// ---------------------------------------------------------------------------
// Axum integration
// ---------------------------------------------------------------------------

/// Convert a `BridgeError` into a JSON axum response.
#[must_use]
pub fn into_axum_response(err: &BridgeError) -> axum::response::Response {
    use axum::response::IntoResponse;
    let (status, body) = format_error(err);
    (status, axum::Json(body)).into_response()
}

impl axum::response::IntoResponse for BridgeError {
    fn into_response(self) -> axum::response::Response {
        into_axum_response(&self)
    }
}
