use crate::error::ErrorCategory;

fn front_error_type(cat: ErrorCategory) -> &'static str {
    match cat {
        ErrorCategory::Authentication => "authentication_error",
        ErrorCategory::InvalidRequest => "invalid_request_error",
        ErrorCategory::Upstream => "api_error",
        ErrorCategory::NotFound => "not_found",
        ErrorCategory::Internal => "internal_error",
    }
}

#[must_use]
pub(crate) fn front_error_payload(cat: ErrorCategory, message: &str) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "type": front_error_type(cat),
            "message": message,
        }
    })
}
