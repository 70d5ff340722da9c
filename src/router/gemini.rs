//! Adapter for Gemini-generate-style providers: content array with
//! `user`/`model` roles, API key in the URL, generation config block.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::{ProviderConfig, Settings, WireStyle};
use crate::error::GhostwriterError;
use crate::prompt;
use crate::router::{parse_error, post_json, GenerationRequest, RequestKind};

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// The model name lives in the URL path and the credential in the query
/// string, not in headers.
pub fn request_url(config: &ProviderConfig) -> Result<String, GhostwriterError> {
    let key = config
        .api_key
        .as_deref()
        .ok_or_else(|| GhostwriterError::Configuration {
            mode: config.mode.clone(),
            message: "api key not configured".to_string(),
        })?;
    Ok(format!(
        "{}/{}:generateContent?key={key}",
        config.endpoint_url, config.model_name
    ))
}

pub fn build_body(
    req: &GenerationRequest,
    settings: &Settings,
) -> Result<serde_json::Value, GhostwriterError> {
    let contents = match &req.kind {
        RequestKind::Completion { prefix, .. } => {
            let prompt = prompt::build_completion_prompt(prefix, WireStyle::GeminiGenerate);
            vec![serde_json::json!({ "parts": [{ "text": prompt }] })]
        }
        RequestKind::Chat { messages, files } => {
            if messages.is_empty() {
                return Err(GhostwriterError::InvalidRequest(
                    "chat requires at least one message".to_string(),
                ));
            }
            prompt::build_gemini_contents(
                messages,
                files,
                &settings.chat_system_prompt,
                settings.file_context_max_chars,
            )
        }
    };

    Ok(serde_json::json!({
        "contents": contents,
        "generationConfig": {
            "temperature": req.temperature,
            "maxOutputTokens": req.max_tokens,
        },
    }))
}

/// Normalize a generateContent response. A candidate blocked by the safety
/// filter has no content; that yields empty text (no suggestion) rather
/// than an error, since it is a policy outcome, not a transport failure.
pub fn extract_text(mode: &str, body: &[u8]) -> Result<String, GhostwriterError> {
    let response: GenerateContentResponse =
        serde_json::from_slice(body).map_err(|e| parse_error(mode, e))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(GhostwriterError::ProviderCallFailed {
            mode: mode.to_string(),
            message: "no candidates in response".to_string(),
            status: None,
        });
    };

    if let Some(text) = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
    {
        return Ok(text);
    }

    match candidate.finish_reason.as_deref() {
        Some(reason @ ("SAFETY" | "RECITATION" | "OTHER")) => {
            tracing::warn!(mode, reason, "candidate blocked, returning empty text");
            Ok(String::new())
        }
        _ => Err(GhostwriterError::ProviderCallFailed {
            mode: mode.to_string(),
            message: "candidate has no text parts".to_string(),
            status: None,
        }),
    }
}

pub(crate) async fn generate(
    client: &Client,
    config: &ProviderConfig,
    req: &GenerationRequest,
    settings: &Settings,
    timeout: Duration,
) -> Result<String, GhostwriterError> {
    let url = request_url(config)?;
    let body = build_body(req, settings)?;
    let bytes = post_json(client, config, &url, None, &body, timeout).await?;
    extract_text(&config.mode, &bytes)
}
