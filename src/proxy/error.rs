// Error taxonomy for the OpenRouter proxy core

use std::time::Duration;

use thiserror::Error;

/// Fallback message when OpenRouter fails without saying why.
pub const GENERIC_UPSTREAM_MESSAGE: &str = "OpenRouter request failed";

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Client input is missing a field or has the wrong shape.
    #[error("Invalid {field}")]
    Validation { field: String },

    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Unknown OpenRouter action: {0}")]
    UnknownAction(String),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("Invalid JSON body: {0}")]
    MalformedBody(#[source] serde_json::Error),
}

impl ProxyError {
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Non-success status or an `error` object in the decoded payload.
    #[error("{message}")]
    Provider { status: u16, message: String },

    #[error("OpenRouter request timed out after {}s", .0.as_secs_f64())]
    DeadlineExceeded(Duration),

    #[error("OpenRouter request was cancelled")]
    Cancelled,

    #[error("OpenRouter request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("OpenRouter returned a non-JSON response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("OpenRouter returned a malformed director summary: {0}")]
    MalformedSummary(#[source] serde_json::Error),

    #[error("OpenRouter did not return an image")]
    MissingImage,
}
