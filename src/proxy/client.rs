// OpenRouter chat-completions client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::{UpstreamError, GENERIC_UPSTREAM_MESSAGE};
use super::request::ChatRequest;
use super::runtime::RuntimeConfig;

pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline and cancellation for a single upstream call.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl CallOptions {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::new(DEFAULT_UPSTREAM_TIMEOUT, CancellationToken::new())
    }
}

/// One chat-completion round trip. Returns the decoded payload untouched.
#[async_trait]
pub trait ChatCompletions: Send + Sync {
    async fn complete(
        &self,
        config: &RuntimeConfig,
        request: &ChatRequest,
        options: &CallOptions,
    ) -> Result<Value, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct ProviderClient {
    endpoint: String,
    http_client: reqwest::Client,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl ProviderClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            endpoint: OPENROUTER_ENDPOINT.to_string(),
            http_client,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// HTTP client routed through an optional outbound proxy.
    pub fn build_http_client(proxy_url: Option<&str>) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(url) = proxy_url.filter(|u| !u.is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(url)?);
        }
        builder.build()
    }

    async fn send(
        &self,
        config: &RuntimeConfig,
        request: &ChatRequest,
    ) -> Result<Value, UpstreamError> {
        let mut req = self
            .http_client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", config.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(request);

        if let Some(referer) = &config.referer {
            req = req.header("HTTP-Referer", referer);
        }
        if let Some(app_name) = &config.app_name {
            req = req.header("X-Title", app_name);
        }

        tracing::debug!("[OpenRouter] POST {} model={}", self.endpoint, request.model);

        let response = req.send().await.map_err(UpstreamError::Transport)?;
        let status = response.status();

        let payload = match response.json::<Value>().await {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                tracing::warn!("[OpenRouter] {} with undecodable body", status);
                return Err(UpstreamError::Provider {
                    status: status.as_u16(),
                    message: GENERIC_UPSTREAM_MESSAGE.to_string(),
                });
            }
            Err(e) => return Err(UpstreamError::Decode(e)),
        };

        let provider_message = provider_error_message(&payload);
        if !status.is_success() || provider_message.is_some() {
            tracing::warn!(
                "[OpenRouter] request failed: status={} provider_error={}",
                status,
                provider_message.is_some()
            );
            return Err(UpstreamError::Provider {
                status: status.as_u16(),
                message: provider_message.unwrap_or_else(|| GENERIC_UPSTREAM_MESSAGE.to_string()),
            });
        }

        Ok(payload)
    }
}

#[async_trait]
impl ChatCompletions for ProviderClient {
    async fn complete(
        &self,
        config: &RuntimeConfig,
        request: &ChatRequest,
        options: &CallOptions,
    ) -> Result<Value, UpstreamError> {
        tokio::select! {
            biased;
            _ = options.cancel.cancelled() => Err(UpstreamError::Cancelled),
            result = tokio::time::timeout(options.timeout, self.send(config, request)) => {
                result.unwrap_or(Err(UpstreamError::DeadlineExceeded(options.timeout)))
            }
        }
    }
}

/// `error.message`, or `error` itself when the provider sends a bare string.
fn provider_error_message(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
