use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{ModelError, ModelRequest};

/// Which LLM API a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    OpenRouter,
}

impl Provider {
    pub(crate) fn strategy(self) -> &'static dyn ProviderStrategy {
        match self {
            Provider::OpenAi => &OpenAiResponses,
            Provider::OpenRouter => &OpenRouterChat,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::OpenRouter => write!(f, "openrouter"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

/// Wire format of one provider: where to post, what to send, where the
/// translated text lives in the answer.
pub(crate) trait ProviderStrategy: Send + Sync {
    fn path(&self) -> &'static str;

    fn body(&self, request: &ModelRequest) -> Value;

    fn extract_text(&self, body: &Value) -> Result<String, ModelError>;
}

fn user_prompt(request: &ModelRequest) -> String {
    format!("{} translate to {}", request.source_text, request.target_language)
}

fn non_empty_text(text: Option<&str>) -> Result<String, ModelError> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(ModelError::empty)
}

/// OpenAI Responses API (`/v1/responses`).
struct OpenAiResponses;

impl ProviderStrategy for OpenAiResponses {
    fn path(&self) -> &'static str {
        "v1/responses"
    }

    fn body(&self, request: &ModelRequest) -> Value {
        json!({
            "model": request.model,
            "instructions": request.system_prompt,
            "input": user_prompt(request),
        })
    }

    fn extract_text(&self, body: &Value) -> Result<String, ModelError> {
        let output = body
            .get("output")
            .and_then(Value::as_array)
            .ok_or_else(|| ModelError::malformed("response has no output array"))?;

        // Reasoning models put other items first; the message is usually last.
        let message = output
            .iter()
            .find(|item| item.get("type").and_then(Value::as_str) == Some("message"))
            .or_else(|| output.last())
            .ok_or_else(|| ModelError::malformed("response output is empty"))?;

        let content = message
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| ModelError::malformed("no message content found in response"))?;

        let text = content
            .iter()
            .find(|item| item.get("type").and_then(Value::as_str) == Some("output_text"))
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str);
        non_empty_text(text)
    }
}

/// OpenRouter chat completions (`/api/v1/chat/completions`).
struct OpenRouterChat;

impl ProviderStrategy for OpenRouterChat {
    fn path(&self) -> &'static str {
        "api/v1/chat/completions"
    }

    fn body(&self, request: &ModelRequest) -> Value {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.trim().is_empty() {
            messages.push(json!({ "role": "system", "content": request.system_prompt }));
        }
        messages.push(json!({ "role": "user", "content": user_prompt(request) }));
        json!({
            "model": request.model,
            "messages": messages,
        })
    }

    fn extract_text(&self, body: &Value) -> Result<String, ModelError> {
        let choice = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .ok_or_else(|| ModelError::malformed("response has no choices"))?;
        let text = choice
            .get("message")
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str);
        non_empty_text(text)
    }
}

/// Pulls `error.message` out of a provider error body.
pub(crate) fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| "Unknown error".to_string())
}
