use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tokio_util::sync::CancellationToken;
use translator_logging::{translator_debug, translator_info, translator_warn};

use crate::provider::error_message;
use crate::{FailureKind, ModelError, ModelRequest, ModelResponse, Provider};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub openai_base_url: String,
    pub openrouter_base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com".to_string(),
            openrouter_base_url: "https://openrouter.ai".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            max_bytes: 4 * 1024 * 1024,
        }
    }
}

impl ClientSettings {
    /// Points both providers at one server, e.g. a local mock.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            openai_base_url: base_url.clone(),
            openrouter_base_url: base_url,
            ..Self::default()
        }
    }

    fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAi => &self.openai_base_url,
            Provider::OpenRouter => &self.openrouter_base_url,
        }
    }
}

/// Sends a translation request and turns the answer into plain text.
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    /// Issues the HTTP call. Non-2xx answers come back as `HttpStatus`.
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError>;

    /// Locates the translated text in a successful payload.
    fn extract_text(&self, response: &ModelResponse) -> Result<String, ModelError>;

    /// `send` that returns `Cancelled` as soon as `cancel` fires. Dropping
    /// the in-flight `send` future aborts the connection. A token that is
    /// already cancelled skips the call entirely.
    async fn send_cancellable(
        &self,
        request: &ModelRequest,
        cancel: &CancellationToken,
    ) -> Result<ModelResponse, ModelError> {
        if cancel.is_cancelled() {
            return Err(ModelError::cancelled());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(ModelError::cancelled()),
            result = self.send(request) => result,
        }
    }

    /// One-shot `send_cancellable` + `extract_text`.
    async fn translate(
        &self,
        request: &ModelRequest,
        cancel: &CancellationToken,
    ) -> Result<String, ModelError> {
        let response = self.send_cancellable(request, cancel).await?;
        self.extract_text(&response)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestModelClient {
    settings: ClientSettings,
}

impl ReqwestModelClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, request: &ModelRequest) -> Result<reqwest::Client, ModelError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", request.api_key.trim()))
            .map_err(|_| ModelError::new(FailureKind::InvalidRequest, "API key is not a valid header value"))?;
        headers.insert(AUTHORIZATION, bearer);
        if request.provider == Provider::OpenRouter {
            headers.insert("X-Title", HeaderValue::from_static("CMS AI Translator"));
        }

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| ModelError::new(FailureKind::Network, err.to_string()))
    }

    fn endpoint(&self, provider: Provider) -> Result<reqwest::Url, ModelError> {
        let base = self.settings.base_url(provider).trim_end_matches('/');
        let raw = format!("{}/{}", base, provider.strategy().path());
        reqwest::Url::parse(&raw)
            .map_err(|err| ModelError::new(FailureKind::InvalidRequest, format!("{raw}: {err}")))
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, ModelError> {
        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(ModelError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(ModelError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl ModelClient for ReqwestModelClient {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.endpoint(request.provider)?;
        let client = self.build_client(request)?;
        let body = serde_json::to_vec(&request.provider.strategy().body(request))
            .map_err(|err| ModelError::new(FailureKind::InvalidRequest, err.to_string()))?;

        translator_info!(
            "sending translation request provider={} model={} text_len={} target={}",
            request.provider,
            request.model,
            request.source_text.len(),
            request.target_language
        );

        let response = client
            .post(url)
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = self.read_body(response).await?;
        translator_debug!("model answered status={} bytes={}", status.as_u16(), bytes.len());

        if !status.is_success() {
            let message = error_message(&bytes);
            translator_warn!("model request failed with {}: {}", status.as_u16(), message);
            return Err(ModelError::new(FailureKind::HttpStatus(status.as_u16()), message));
        }

        let body = serde_json::from_slice(&bytes)
            .map_err(|err| ModelError::malformed(format!("response is not JSON: {err}")))?;

        Ok(ModelResponse {
            provider: request.provider,
            status: status.as_u16(),
            body,
        })
    }

    fn extract_text(&self, response: &ModelResponse) -> Result<String, ModelError> {
        response.provider.strategy().extract_text(&response.body)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ModelError {
    if err.is_timeout() {
        return ModelError::new(FailureKind::Timeout, err.to_string());
    }
    ModelError::new(FailureKind::Network, err.to_string())
}
