use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use msgbridge::config::{AppConfig, ClientAuthConfig, ModelsConfig, ModelsSource, UpstreamConfig};
use msgbridge::routing::dispatch::dispatch_request;
use msgbridge::state::AppState;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Captured {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

impl Captured {
    fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last(&self) -> (Option<String>, Value) {
        self.requests.lock().unwrap().last().cloned().expect("upstream was called")
    }
}

fn record(captured: &Captured, headers: &HeaderMap, body: Value) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    captured.requests.lock().unwrap().push((auth, body));
}

async fn spawn_upstream(app: Router) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/v1"), server)
}

fn build_state(base_url: String, auth_token: Option<&str>, source: ModelsSource) -> Arc<AppState> {
    let config = AppConfig {
        upstream: UpstreamConfig {
            base_url,
            api_key: "upstream-secret".to_string(),
        },
        client_authentication: ClientAuthConfig {
            auth_token: auth_token.map(str::to_string),
        },
        models: ModelsConfig { source },
        ..AppConfig::default()
    };
    Arc::new(AppState::new(config).expect("build state"))
}

fn post_messages(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize request")))
        .expect("build request")
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body).expect("json payload")
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

fn completion_router(captured: Captured) -> Router {
    Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    record(&captured, &headers, body);
                    Json(json!({
                        "id": "chatcmpl_mock",
                        "object": "chat.completion",
                        "model": "minimaxai/minimax-m2.1",
                        "choices": [{
                            "index": 0,
                            "message": {"role": "assistant", "content": "pong"},
                            "finish_reason": "stop"
                        }],
                        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
                    }))
                },
            ),
        )
        .with_state(captured)
}

#[tokio::test]
async fn test_non_streaming_round_trip_keeps_front_model() {
    let captured = Captured::default();
    let (base_url, server) = spawn_upstream(completion_router(captured.clone())).await;
    let state = build_state(base_url, None, ModelsSource::Static);

    let request = post_messages(&json!({
        "model": "claude-opus-4-x",
        "system": "be brief",
        "max_tokens": 64,
        "temperature": 0.5,
        "stop_sequences": ["END"],
        "messages": [{"role": "user", "content": "hi"}]
    }));
    let response = dispatch_request(state, request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let payload = body_json(response).await;
    assert_eq!(
        payload,
        json!({
            "id": "chatcmpl_mock",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "pong"}],
            "model": "claude-opus-4-x",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 5, "output_tokens": 2}
        })
    );

    let (auth, upstream_body) = captured.last();
    assert_eq!(auth.as_deref(), Some("Bearer upstream-secret"));
    assert_eq!(
        upstream_body,
        json!({
            "model": "minimaxai/minimax-m2.1",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hi"}
            ],
            "max_tokens": 64,
            "stream": false,
            "temperature": 0.5,
            "stop": ["END"]
        })
    );

    server.abort();
}

#[tokio::test]
async fn test_null_choices_yield_empty_text_block() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { Json(json!({"id": "chatcmpl_null", "choices": null, "usage": null})) }),
    );
    let (base_url, server) = spawn_upstream(app).await;
    let state = build_state(base_url, None, ModelsSource::Static);

    let request = post_messages(&json!({
        "model": "claude-opus-4-x",
        "messages": [{"role": "user", "content": "hi"}]
    }));
    let response = dispatch_request(state, request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = body_json(response).await;
    assert_eq!(payload["id"], "chatcmpl_null");
    assert_eq!(payload["content"], json!([{"type": "text", "text": ""}]));
    assert_eq!(payload["stop_reason"], "end_turn");
    assert_eq!(payload["usage"], json!({"input_tokens": 0, "output_tokens": 0}));

    server.abort();
}

#[tokio::test]
async fn test_missing_model_rejected_without_upstream_call() {
    let captured = Captured::default();
    let (base_url, server) = spawn_upstream(completion_router(captured.clone())).await;
    let state = build_state(base_url, None, ModelsSource::Static);

    let request = post_messages(&json!({"messages": [{"role": "user", "content": "hi"}]}));
    let response = dispatch_request(state, request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": {"type": "invalid_request_error", "message": "model is required"}})
    );
    assert_eq!(captured.count(), 0);

    server.abort();
}

#[tokio::test]
async fn test_malformed_body_is_internal_error() {
    let captured = Captured::default();
    let (base_url, server) = spawn_upstream(completion_router(captured.clone())).await;
    let state = build_state(base_url, None, ModelsSource::Static);

    let request = Request::builder()
        .method("POST")
        .uri("/v1/messages")
        .body(Body::from("{not json"))
        .expect("build request");
    let response = dispatch_request(state, request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"]["type"], "internal_error");
    assert_eq!(captured.count(), 0);

    server.abort();
}

#[tokio::test]
async fn test_upstream_error_status_and_body_forwarded() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited, slow down").into_response() }),
    );
    let (base_url, server) = spawn_upstream(app).await;
    let state = build_state(base_url, None, ModelsSource::Static);

    for stream in [false, true] {
        let request = post_messages(&json!({
            "model": "claude-sonnet-4-5",
            "stream": stream,
            "messages": [{"role": "user", "content": "hi"}]
        }));
        let response = dispatch_request(Arc::clone(&state), request)
            .await
            .expect("dispatch");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(
            body_json(response).await,
            json!({"error": {"type": "api_error", "message": "rate limited, slow down"}})
        );
    }

    server.abort();
}

#[tokio::test]
async fn test_unreachable_upstream_is_internal_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("reserve port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let state = build_state(format!("http://{addr}/v1"), None, ModelsSource::Static);

    let request = post_messages(&json!({
        "model": "claude-opus-4",
        "messages": [{"role": "user", "content": "hi"}]
    }));
    let response = dispatch_request(state, request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"]["type"], "internal_error");
}

#[tokio::test]
async fn test_streaming_reframes_upstream_deltas() {
    let captured = Captured::default();
    let app = Router::new()
        .route(
            "/v1/chat/completions",
            post(
                |State(captured): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    record(&captured, &headers, body);
                    let sse = concat!(
                        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
                        ": keep-alive\n\n",
                        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
                        "data: {broken\n\n",
                        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}],\"usage\":{\"prompt_tokens\":4,\"completion_tokens\":9}}\n\n",
                        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"length\"}],\"usage\":{\"prompt_tokens\":4,\"completion_tokens\":11}}\n\n",
                        "data: [DONE]\n\n"
                    );
                    Response::builder()
                        .header("content-type", "text/event-stream")
                        .body(Body::from(sse))
                        .expect("sse response")
                },
            ),
        )
        .with_state(captured.clone());
    let (base_url, server) = spawn_upstream(app).await;
    let state = build_state(base_url, None, ModelsSource::Static);

    let request = post_messages(&json!({
        "model": "claude-sonnet-4-5",
        "stream": true,
        "messages": [{"role": "user", "content": "hi"}]
    }));
    let response = dispatch_request(state, request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    assert_eq!(response.headers()["cache-control"], "no-cache");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let text = body_text(response).await;
    let frames: Vec<(&str, Value)> = text
        .split_terminator("\n\n")
        .map(|frame| {
            let (event, data) = frame.split_once('\n').expect("two-line frame");
            let name = event.strip_prefix("event: ").expect("event line");
            let data = data.strip_prefix("data: ").expect("data line");
            (name, serde_json::from_str(data).expect("json data"))
        })
        .collect();

    let names: Vec<&str> = frames.iter().map(|(name, _)| *name).collect();
    assert_eq!(
        names,
        vec![
            "message_start",
            "content_block_start",
            "content_block_delta",
            "content_block_delta",
            "content_block_stop",
            "message_delta",
            "message_stop"
        ]
    );
    for (name, data) in &frames {
        assert_eq!(data["type"], *name);
    }
    assert_eq!(frames[0].1["message"]["model"], "claude-sonnet-4-5");
    assert!(frames[0].1["message"]["stop_reason"].is_null());
    assert_eq!(frames[1].1["content_block"], json!({"type": "text", "text": ""}));
    assert_eq!(frames[2].1["delta"], json!({"type": "text_delta", "text": "Hel"}));
    assert_eq!(frames[3].1["delta"]["text"], "lo");
    assert_eq!(
        frames[5].1,
        json!({
            "type": "message_delta",
            "delta": {"stop_reason": "max_tokens"},
            "usage": {"output_tokens": 9}
        })
    );

    let (_, upstream_body) = captured.last();
    assert_eq!(upstream_body["model"], "z-ai/glm4.7");
    assert_eq!(upstream_body["stream"], true);

    server.abort();
}

#[tokio::test]
async fn test_client_auth_required_when_configured() {
    let captured = Captured::default();
    let (base_url, server) = spawn_upstream(completion_router(captured.clone())).await;
    let state = build_state(base_url, Some("client-secret"), ModelsSource::Static);
    let body = json!({"model": "claude-opus-4", "messages": [{"role": "user", "content": "hi"}]});

    let response = dispatch_request(Arc::clone(&state), post_messages(&body))
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        body_json(response).await,
        json!({"error": {"type": "authentication_error", "message": "Invalid API key"}})
    );
    assert_eq!(captured.count(), 0);

    for (name, value) in [("x-api-key", "client-secret"), ("authorization", "Bearer client-secret")] {
        let mut request = post_messages(&body);
        request
            .headers_mut()
            .insert(name, value.parse().expect("header value"));
        let response = dispatch_request(Arc::clone(&state), request)
            .await
            .expect("dispatch");
        assert_eq!(response.status(), StatusCode::OK, "{name}");
    }
    assert_eq!(captured.count(), 2);

    let health = Request::builder().uri("/health").body(Body::empty()).expect("request");
    let response = dispatch_request(Arc::clone(&state), health)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    server.abort();
}

#[tokio::test]
async fn test_preflight_bypasses_auth() {
    let state = build_state("http://127.0.0.1:1/v1".to_string(), Some("secret"), ModelsSource::Static);
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/v1/messages")
        .body(Body::empty())
        .expect("request");
    let response = dispatch_request(state, request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(
        headers["access-control-allow-headers"],
        "Content-Type, Authorization, x-api-key, anthropic-version"
    );
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_health_and_not_found() {
    let state = build_state("http://127.0.0.1:1/v1".to_string(), None, ModelsSource::Static);

    for uri in ["/", "/health"] {
        let request = Request::builder().uri(uri).body(Body::empty()).expect("request");
        let response = dispatch_request(Arc::clone(&state), request)
            .await
            .expect("dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    let request = Request::builder()
        .uri("/v1/complete")
        .body(Body::empty())
        .expect("request");
    let response = dispatch_request(Arc::clone(&state), request)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        body_json(response).await,
        json!({"error": {"type": "not_found", "message": "Not found"}})
    );
}

#[tokio::test]
async fn test_static_model_listing() {
    let state = build_state("http://127.0.0.1:1/v1".to_string(), None, ModelsSource::Static);
    let request = Request::builder()
        .uri("/v1/models")
        .body(Body::empty())
        .expect("request");
    let response = dispatch_request(state, request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = body_json(response).await;
    let ids: Vec<&str> = payload["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|m| m["id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, vec!["claude-opus-4", "claude-sonnet-4"]);
    assert_eq!(payload["has_more"], false);
    assert_eq!(payload["first_id"], "claude-opus-4");
    assert_eq!(payload["last_id"], "claude-sonnet-4");
}

#[tokio::test]
async fn test_upstream_model_listing() {
    let app = Router::new().route(
        "/v1/models",
        get(|headers: HeaderMap| async move {
            assert_eq!(headers["authorization"], "Bearer upstream-secret");
            Json(json!({
                "object": "list",
                "data": [{"id": "z-ai/glm4.7", "object": "model", "created": 1_735_689_600}]
            }))
        }),
    );
    let (base_url, server) = spawn_upstream(app).await;
    let state = build_state(base_url, None, ModelsSource::Upstream);

    let request = Request::builder()
        .uri("/v1/models")
        .body(Body::empty())
        .expect("request");
    let response = dispatch_request(state, request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "data": [{
                "id": "z-ai/glm4.7",
                "type": "model",
                "display_name": "z-ai/glm4.7",
                "created_at": "2025-01-01T00:00:00Z"
            }],
            "has_more": false,
            "first_id": "z-ai/glm4.7",
            "last_id": "z-ai/glm4.7"
        })
    );

    server.abort();
}
