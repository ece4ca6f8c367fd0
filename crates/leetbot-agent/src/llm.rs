//! Chat-completion client with tool calling, against any OpenAI-compatible
//! endpoint. The message history is kept as raw JSON values so the wire
//! shape (including assistant tool_calls) survives round trips untouched.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("Invalid model configuration: {0}")]
    Config(String),

    #[error("Model request failed: {0}")]
    Transport(String),

    #[error("Model endpoint returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Malformed model response: {0}")]
    Protocol(String),
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// The model's reply for one assistant turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    /// The wire-form assistant message, pushed back into the history as-is.
    pub raw_message: Value,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API (no trailing path).
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

/// The seam between the solver and the hosted model, so tests can script
/// replies.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One assistant turn over the running history, with the tool menu
    /// offered.
    async fn complete_with_tools(
        &self,
        messages: &[Value],
        tools: &Value,
    ) -> Result<ChatTurn, LlmError>;

    /// Plain completion for the generation/repair prompts (no tools).
    async fn complete_text(&self, prompt: &str) -> Result<String, LlmError>;
}

pub struct OpenAiChat {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiChat {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("api_key must not be empty".into()));
        }
        if config.model.trim().is_empty() {
            return Err(LlmError::Config("model name must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    async fn post(&self, body: &Value) -> Result<Value, LlmError> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LlmError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LlmError::Protocol(format!("invalid JSON body: {}", e)))
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete_with_tools(
        &self,
        messages: &[Value],
        tools: &Value,
    ) -> Result<ChatTurn, LlmError> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": messages,
            "tools": tools,
        });
        debug!(model = %self.config.model, history = messages.len(), "requesting assistant turn");
        let reply = self.post(&body).await?;
        parse_chat_turn(&reply)
    }

    async fn complete_text(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        let reply = self.post(&body).await?;
        let turn = parse_chat_turn(&reply)?;
        turn.text
            .ok_or_else(|| LlmError::Protocol("completion had no text content".into()))
    }
}

/// Extract the assistant message from a chat-completions response.
pub fn parse_chat_turn(reply: &Value) -> Result<ChatTurn, LlmError> {
    let message = reply
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| LlmError::Protocol("response has no choices[0].message".into()))?;

    let text = message
        .get("content")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(ToOwned::to_owned);

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for call in calls {
            let id = call
                .get("id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| LlmError::Protocol("tool call without id".into()))?;
            let function = call
                .get("function")
                .ok_or_else(|| LlmError::Protocol("tool call without function".into()))?;
            let name = function
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| LlmError::Protocol("tool call without name".into()))?;
            // Arguments arrive as a JSON-encoded string on the wire.
            let arguments = match function.get("arguments") {
                Some(Value::String(s)) if !s.trim().is_empty() => serde_json::from_str(s)
                    .map_err(|e| LlmError::Protocol(format!("tool arguments not JSON: {}", e)))?,
                Some(Value::Object(o)) => Value::Object(o.clone()),
                _ => json!({}),
            };
            tool_calls.push(ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments,
            });
        }
    }

    Ok(ChatTurn {
        text,
        tool_calls,
        raw_message: message.clone(),
    })
}

pub fn system_message(content: &str) -> Value {
    json!({"role": "system", "content": content})
}

pub fn user_message(content: &str) -> Value {
    json!({"role": "user", "content": content})
}

pub fn tool_message(tool_call_id: &str, content: &str) -> Value {
    json!({"role": "tool", "tool_call_id": tool_call_id, "content": content})
}
