use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use crate::api::{health, messages, models};
use crate::error::{into_axum_response, BridgeError, ErrorCategory};
use crate::protocol::error_shapes::front_error_payload;
use crate::state::AppState;

const DEFAULT_BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, x-api-key, anthropic-version";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteMatch {
    Preflight,
    Health,
    Messages,
    Models,
    NotFound,
}

/// Dispatch a raw HTTP request to the matching handler.
///
/// Preflight requests are answered before authentication. Every response
/// carries `Access-Control-Allow-Origin: *`.
///
/// # Errors
///
/// This function currently never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, body) = request.into_parts();
    let route = match_route(&parts.method, parts.uri.path());
    tracing::trace!(method = %parts.method, path = parts.uri.path(), ?route, "dispatch");

    if route == RouteMatch::Preflight {
        return Ok(preflight_response());
    }

    let auth = state.authenticate(&parts.headers);
    let mut response = match auth {
        Err(err) => into_axum_response(&err),
        Ok(()) => match route {
            RouteMatch::Health => health::health_handler().into_response(),
            RouteMatch::Models => models::handler(state).await,
            RouteMatch::Messages => match read_request_body(body).await {
                Ok(bytes) => messages::handler(state, bytes).await,
                Err(response) => response,
            },
            RouteMatch::NotFound | RouteMatch::Preflight => {
                into_axum_response(&BridgeError::NotFound("Not found".to_string()))
            }
        },
    };

    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    Ok(response)
}

fn preflight_response() -> Response {
    let mut response = Response::new(Body::empty());
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

async fn read_request_body(body: Body) -> Result<bytes::Bytes, Response> {
    body::to_bytes(body, DEFAULT_BODY_LIMIT_BYTES)
        .await
        .map_err(|_| {
            (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(front_error_payload(
                    ErrorCategory::InvalidRequest,
                    "Request body too large (max 2MiB)",
                )),
            )
                .into_response()
        })
}

fn match_route(method: &Method, path: &str) -> RouteMatch {
    if method == Method::OPTIONS {
        return RouteMatch::Preflight;
    }
    match path {
        "/" | "/health" => RouteMatch::Health,
        "/v1/messages" if method == Method::POST => RouteMatch::Messages,
        "/v1/models" if method == Method::GET => RouteMatch::Models,
        _ => RouteMatch::NotFound,
    }
}
