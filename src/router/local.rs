//! Adapter for local generate-style servers (Ollama `/api/generate`).
//! Single-shot prompt string, no chat roles, no credential.

use std::time::Duration;

use reqwest::Client;

use crate::config::{ProviderConfig, Settings, WireStyle};
use crate::error::GhostwriterError;
use crate::prompt;
use crate::router::{parse_error, post_json, GenerationRequest, RequestKind};

/// Stop sequences that keep completion output to a single construct instead
/// of a whole file.
const COMPLETION_STOP: [&str; 5] = ["\n\n\n", "class ", "def ", "public class", "public static"];

/// Build the provider request body. Completion runs in raw mode with
/// sampling options so the model continues text instead of chatting; chat
/// sends the flattened transcript as a plain prompt.
pub fn build_body(
    config: &ProviderConfig,
    req: &GenerationRequest,
    settings: &Settings,
) -> Result<serde_json::Value, GhostwriterError> {
    match &req.kind {
        RequestKind::Completion { prefix, .. } => {
            let prompt = prompt::build_completion_prompt(prefix, WireStyle::LocalGenerate);
            Ok(serde_json::json!({
                "model": config.model_name,
                "prompt": prompt,
                "stream": false,
                "raw": true,
                "options": {
                    "temperature": req.temperature,
                    "num_predict": req.max_tokens,
                    "stop": COMPLETION_STOP,
                    "top_p": 0.95,
                },
            }))
        }
        RequestKind::Chat { messages, files } => {
            if messages.is_empty() {
                return Err(GhostwriterError::InvalidRequest(
                    "chat requires at least one message".to_string(),
                ));
            }
            let prompt = prompt::build_chat_prompt(
                messages,
                files,
                &settings.chat_system_prompt,
                settings.file_context_max_chars,
            );
            Ok(serde_json::json!({
                "model": config.model_name,
                "prompt": prompt,
                "stream": false,
            }))
        }
    }
}

/// Pull the generated text out of a local server response. The canonical
/// field is `response`, but older servers use a handful of aliases, and
/// some nest the payload one level down.
pub fn extract_text(mode: &str, body: &[u8]) -> Result<String, GhostwriterError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| parse_error(mode, e))?;

    scan_text_fields(&value)
        .or_else(|| value.get("response").and_then(scan_text_fields))
        .ok_or_else(|| parse_error(mode, "no text field in response"))
}

fn scan_text_fields(value: &serde_json::Value) -> Option<String> {
    for key in ["completion", "text", "response", "result", "output"] {
        if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
            return Some(text.to_string());
        }
    }
    None
}

pub(crate) async fn generate(
    client: &Client,
    config: &ProviderConfig,
    req: &GenerationRequest,
    settings: &Settings,
    timeout: Duration,
) -> Result<String, GhostwriterError> {
    let body = build_body(config, req, settings)?;
    let bytes = post_json(client, config, &config.endpoint_url, None, &body, timeout).await?;
    extract_text(&config.mode, &bytes)
}
