use crate::config::{ServerConfig, UpstreamConfig};
use crate::error::BridgeError;
use std::time::Duration;
use tracing::{debug, warn};

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    timeout: Option<Duration>,
) -> Result<reqwest::Client, BridgeError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .tcp_nodelay(true)
        .redirect(reqwest::redirect::Policy::none());

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|err| BridgeError::Config(format!("Failed to build HTTP client: {err}")))
}

fn endpoint_url(base_url: &str, path: &str) -> Result<url::Url, BridgeError> {
    let mut raw = String::with_capacity(base_url.len() + path.len());
    raw.push_str(base_url.trim_end_matches('/'));
    raw.push_str(path);
    url::Url::parse(&raw)
        .map_err(|err| BridgeError::Config(format!("Invalid upstream URL '{raw}': {err}")))
}

/// HTTP transport for the single OpenAI-compatible upstream.
///
/// Holds one pooled client shared by every request. Non-2xx upstream
/// statuses are turned into [`BridgeError::Upstream`] before the response is
/// handed back, so callers only ever see successful bodies.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    chat_completions_url: url::Url,
    models_url: url::Url,
    authorization: http::HeaderValue,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns [`BridgeError::Config`] when the base URL or API key cannot be
    /// used, or the client cannot be built.
    pub fn new(server: &ServerConfig, upstream: &UpstreamConfig) -> Result<Self, BridgeError> {
        let client = build_reqwest_client(
            server.pool_max_idle_per_host,
            server.upstream_timeout_secs.map(Duration::from_secs),
        )?;
        let mut authorization = http::HeaderValue::try_from(format!("Bearer {}", upstream.api_key))
            .map_err(|_| BridgeError::Config("upstream.api_key is not a valid header value".into()))?;
        authorization.set_sensitive(true);

        Ok(Self {
            client,
            chat_completions_url: endpoint_url(&upstream.base_url, "/chat/completions")?,
            models_url: endpoint_url(&upstream.base_url, "/models")?,
            authorization,
        })
    }

    #[must_use]
    pub fn chat_completions_url(&self) -> &url::Url {
        &self.chat_completions_url
    }

    /// POST a serialized chat-completion request.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] when the request cannot be sent, or
    /// [`BridgeError::Upstream`] carrying the upstream status and body text.
    pub async fn post_chat_completions(
        &self,
        body: bytes::Bytes,
    ) -> Result<reqwest::Response, BridgeError> {
        let request = self
            .client
            .post(self.chat_completions_url.clone())
            .header(http::header::AUTHORIZATION, self.authorization.clone())
            .header(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static("application/json"),
            )
            .body(body);
        send(request).await
    }

    /// GET the upstream model listing.
    ///
    /// # Errors
    ///
    /// Same as [`HttpTransport::post_chat_completions`].
    pub async fn get_models(&self) -> Result<reqwest::Response, BridgeError> {
        let request = self
            .client
            .get(self.models_url.clone())
            .header(http::header::AUTHORIZATION, self.authorization.clone());
        send(request).await
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, BridgeError> {
    let response = request
        .send()
        .await
        .map_err(|err| BridgeError::Transport(err.to_string()))?;
    ensure_success(response).await
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BridgeError> {
    let status = response.status();
    if status.is_success() {
        debug!(status = status.as_u16(), url = %response.url(), "upstream responded");
        return Ok(response);
    }
    let body_bytes = response
        .bytes()
        .await
        .map_err(|e| BridgeError::Transport(format!("Failed to read error body: {e}")))?;
    let message = String::from_utf8_lossy(&body_bytes).into_owned();
    warn!(status = status.as_u16(), body_len = body_bytes.len(), "upstream returned error status");
    Err(BridgeError::Upstream {
        status: status.as_u16(),
        message,
    })
}
