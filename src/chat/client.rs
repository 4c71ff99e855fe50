use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::config::{ChatConfig, ModelPreset};
use super::{ChatError, CompletionBackend};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 4096;

/// Header carrying the LoRA adapter id.
const LORA_HEADER: &str = "lora_id";

/// One message of an OpenAI-style conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    stream_options: StreamOptions,
    search_disable: bool,
    show_ref_label: bool,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    plugins_content: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Parsed first choice of a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub content: String,
    pub reasoning_content: Option<String>,
    pub plugins_content: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

/// Blocking client for an OpenAI-compatible chat-completions endpoint.
pub struct ChatClient {
    http: Client,
    api_key: String,
    api_base: String,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

impl CompletionBackend for ChatClient {
    fn complete(&self, preset: &ModelPreset, messages: &[ChatMessage]) -> Result<ChatReply, ChatError> {
        let url = format!("{}/chat/completions", self.api_base);
        debug!(
            model = %preset.model_id,
            lora = %preset.lora_resource_id,
            messages = messages.len(),
            "sending chat completion"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(LORA_HEADER, &preset.lora_resource_id)
            .json(&build_request(preset, messages))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(response.json()?)
    }
}

fn build_request<'a>(preset: &'a ModelPreset, messages: &'a [ChatMessage]) -> ChatRequest<'a> {
    ChatRequest {
        model: &preset.model_id,
        messages,
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
        stream: false,
        stream_options: StreamOptions {
            include_usage: true,
        },
        search_disable: false,
        show_ref_label: true,
    }
}

fn parse_response(response: ChatResponse) -> Result<ChatReply, ChatError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(ChatError::EmptyReply)?;

    let content = choice
        .message
        .content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(ChatError::EmptyReply)?;

    let plugins_content = choice.message.plugins_content.and_then(|v| match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    });

    Ok(ChatReply {
        content,
        reasoning_content: choice.message.reasoning_content.filter(|r| !r.is_empty()),
        plugins_content: plugins_content.filter(|p| !p.is_empty()),
        finish_reason: choice.finish_reason,
        usage: response.usage,
    })
}
