use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::response::{IntoResponse, Json, Response};
use tracing::{debug, warn};

use crate::error::{into_axum_response, BridgeError, ErrorCategory};
use crate::observability::RequestLog;
use crate::protocol::back::BackResponse;
use crate::protocol::front::{is_truthy, FrontRequest};
use crate::protocol::{translate_request, translate_response};
use crate::state::AppState;
use crate::stream::{reframe_stream, StreamReframer};

/// `POST /v1/messages`.
pub async fn handler(state: Arc<AppState>, body: bytes::Bytes) -> Response {
    let started = Instant::now();
    match handler_inner(state, body, started).await {
        Ok(response) => response,
        Err(err) => {
            match err.category() {
                ErrorCategory::Upstream | ErrorCategory::Internal => {
                    warn!(error = %err, "messages request failed");
                }
                _ => debug!(error = %err, "messages request rejected"),
            }
            into_axum_response(&err)
        }
    }
}

async fn handler_inner(
    state: Arc<AppState>,
    body: bytes::Bytes,
    started: Instant,
) -> Result<Response, BridgeError> {
    let request = parse_front_request(&body)?;
    let back = translate_request(&request, &state.resolver)?;
    let front_model = request.model.unwrap_or_default();
    let log = RequestLog::new(front_model.as_str(), back.model.as_str(), back.stream, started);

    let payload = bytes::Bytes::from(serde_json::to_vec(&back)?);
    let upstream = state.transport.post_chat_completions(payload).await?;

    if back.stream {
        let reframer = StreamReframer::new(front_model);
        let body = reframe_stream(upstream.bytes_stream(), reframer, log);
        return Ok(sse_ok_response(Body::from_stream(body)));
    }

    let body_bytes = upstream
        .bytes()
        .await
        .map_err(|e| BridgeError::Transport(format!("Failed to read upstream body: {e}")))?;
    let back_response: BackResponse = serde_json::from_slice(&body_bytes)?;
    let front = translate_response(back_response, &front_model);
    log.complete(front.usage);
    Ok(Json(front).into_response())
}

/// Decode the request body.
///
/// The `model` presence check runs on the raw JSON so that a missing model is
/// always an invalid request, whatever else is wrong with the body.
///
/// # Errors
///
/// `BridgeError::InvalidRequest` for a missing model, `BridgeError::Internal`
/// for a body that is not JSON or not a Messages request.
pub(crate) fn parse_front_request(body: &[u8]) -> Result<FrontRequest, BridgeError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if !value.get("model").is_some_and(is_truthy) {
        return Err(BridgeError::InvalidRequest("model is required".to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

#[inline]
fn sse_ok_response(body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = http::StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    response
}
