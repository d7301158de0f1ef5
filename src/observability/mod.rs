use crate::protocol::front::FrontUsage;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (TRACE, DEBUG, INFO, ERROR)
pub fn init_tracing(log_level: &str) {
    let Some(directive) = tracing_directive(log_level) else {
        return;
    };

    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("INFO"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn tracing_directive(log_level: &str) -> Option<String> {
    let level = log_level.to_uppercase();
    match level.as_str() {
        "DISABLED" => None,
        "WARNING" => Some("WARN".to_string()),
        "CRITICAL" => Some("ERROR".to_string()),
        _ => Some(level),
    }
}

/// Per-request context for the completion log line.
#[derive(Debug, Clone)]
pub struct RequestLog {
    front_model: String,
    upstream_model: String,
    stream: bool,
    started: Instant,
}

impl RequestLog {
    #[must_use]
    pub fn new(
        front_model: impl Into<String>,
        upstream_model: impl Into<String>,
        stream: bool,
        started: Instant,
    ) -> Self {
        Self {
            front_model: front_model.into(),
            upstream_model: upstream_model.into(),
            stream,
            started,
        }
    }

    /// Emit the completion line. Streaming requests only know output tokens.
    pub fn complete(&self, usage: FrontUsage) {
        log_request_complete(
            &self.front_model,
            &self.upstream_model,
            self.stream,
            usage,
            self.started,
        );
    }
}

/// Log token usage for a completed request, computing duration from start time.
pub fn log_request_complete(
    front_model: &str,
    upstream_model: &str,
    stream: bool,
    usage: FrontUsage,
    start_time: Instant,
) {
    info!(
        front_model,
        upstream_model,
        stream,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "request complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(tracing_directive("DISABLED"), None);
        assert_eq!(tracing_directive("disabled"), None);
        assert_eq!(tracing_directive("WARNING").as_deref(), Some("WARN"));
        assert_eq!(tracing_directive("critical").as_deref(), Some("ERROR"));
        assert_eq!(tracing_directive("debug").as_deref(), Some("DEBUG"));
    }
}
