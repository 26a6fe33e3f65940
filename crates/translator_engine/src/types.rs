use std::fmt;

use crate::Provider;

/// Everything the model client needs for one call.
#[derive(Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub provider: Provider,
    pub source_text: String,
    pub target_language: String,
    pub model: String,
    pub system_prompt: String,
    pub api_key: String,
}

impl fmt::Debug for ModelRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRequest")
            .field("provider", &self.provider)
            .field("source_len", &self.source_text.len())
            .field("target_language", &self.target_language)
            .field("model", &self.model)
            .field("system_prompt_len", &self.system_prompt.len())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Decoded JSON payload of a successful call. Only the issuing client
/// knows how to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub provider: Provider,
    pub status: u16,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ModelError {
    pub kind: FailureKind,
    pub message: String,
}

impl ModelError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "request cancelled")
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedPayload, message)
    }

    pub(crate) fn empty() -> Self {
        Self::new(FailureKind::EmptyResponse, "no text content found in response")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidRequest,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    MalformedPayload,
    EmptyResponse,
    Cancelled,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::MalformedPayload => write!(f, "malformed payload"),
            FailureKind::EmptyResponse => write!(f, "empty response"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
