//! Adapter for OpenAI-chat-style providers: role-tagged message array,
//! bearer credential required.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::{ProviderConfig, Settings};
use crate::error::GhostwriterError;
use crate::prompt::{self, ChatMessage, Role};
use crate::router::{parse_error, post_json, GenerationRequest, RequestKind};

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

pub fn build_body(
    config: &ProviderConfig,
    req: &GenerationRequest,
    settings: &Settings,
) -> Result<serde_json::Value, GhostwriterError> {
    let messages = match &req.kind {
        RequestKind::Completion { prefix, .. } => vec![ChatMessage {
            role: Role::User,
            content: prefix.clone(),
        }],
        RequestKind::Chat { messages, files } => {
            if messages.is_empty() {
                return Err(GhostwriterError::InvalidRequest(
                    "chat requires at least one message".to_string(),
                ));
            }
            prompt::build_cloud_messages(
                messages,
                files,
                &settings.chat_system_prompt,
                settings.file_context_max_chars,
            )
        }
    };

    Ok(serde_json::json!({
        "model": config.model_name,
        "messages": messages,
        "max_tokens": req.max_tokens,
        "temperature": req.temperature,
    }))
}

pub fn extract_text(mode: &str, body: &[u8]) -> Result<String, GhostwriterError> {
    let completion: ChatCompletion =
        serde_json::from_slice(body).map_err(|e| parse_error(mode, e))?;

    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GhostwriterError::ProviderCallFailed {
            mode: mode.to_string(),
            message: "empty choices or null content".to_string(),
            status: None,
        })
}

pub(crate) async fn generate(
    client: &Client,
    config: &ProviderConfig,
    req: &GenerationRequest,
    settings: &Settings,
    timeout: Duration,
) -> Result<String, GhostwriterError> {
    let body = build_body(config, req, settings)?;
    let key = config
        .api_key
        .as_deref()
        .ok_or_else(|| GhostwriterError::Configuration {
            mode: config.mode.clone(),
            message: "api key not configured".to_string(),
        })?;
    let bytes = post_json(
        client,
        config,
        &config.endpoint_url,
        Some(key),
        &body,
        timeout,
    )
    .await?;
    extract_text(&config.mode, &bytes)
}
