pub mod gemini;
pub mod local;
pub mod openai;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::Client;

use crate::config::{ProviderConfig, ProviderSet, Settings, WireStyle};
use crate::error::GhostwriterError;
use crate::prompt::{ChatMessage, FileReference};

/// Cap on provider response bodies to prevent memory exhaustion from a
/// misbehaving endpoint.
const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024; // 2MB

/// What the caller wants generated. Built once per attempt, never mutated.
#[derive(Debug, Clone)]
pub enum RequestKind {
    Completion {
        prefix: String,
        suffix: String,
    },
    Chat {
        messages: Vec<ChatMessage>,
        files: Vec<FileReference>,
    },
}

/// Generic generation request, independent of any provider wire format.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: RequestKind,
    pub language: Option<String>,
    pub file_path: Option<String>,
    pub max_tokens: u64,
    pub temperature: f64,
    /// Per-request mode override; `None` means the process default applies.
    pub requested_mode: Option<String>,
}

/// Normalized provider output. Always carries which mode/model actually
/// answered, even when it differed from the caller's hint.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    pub mode_used: String,
    pub model_used: String,
}

/// Routes each request to exactly one configured provider and normalizes
/// the heterogeneous responses into [`GenerationResult`].
///
/// Stateless per request: every call resolves the effective mode fresh and
/// works against one `Arc` snapshot of the provider set, so a reconfigure
/// takes effect on the very next request without a restart and never
/// mutates state under an in-flight call.
pub struct ProviderRouter {
    providers: RwLock<Arc<ProviderSet>>,
    settings: Settings,
    client: Client,
}

impl ProviderRouter {
    pub fn new(providers: ProviderSet, settings: Settings) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to build HTTP client");
        Self {
            providers: RwLock::new(Arc::new(providers)),
            settings,
            client,
        }
    }

    /// Current provider set snapshot. A call holds its snapshot for the
    /// whole request; later replacements don't affect it.
    pub fn snapshot(&self) -> Arc<ProviderSet> {
        match self.providers.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Atomically swap in a new provider set. Whole-set replacement only;
    /// in-flight calls keep the snapshot they started with.
    pub fn replace(&self, providers: ProviderSet) {
        let next = Arc::new(providers);
        match self.providers.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolve the mode, dispatch to the matching wire-style adapter, and
    /// normalize the response. No automatic retry and no fallback to a
    /// secondary provider; the caller decides what a failure means.
    pub async fn generate(
        &self,
        req: &GenerationRequest,
    ) -> Result<GenerationResult, GhostwriterError> {
        let providers = self.snapshot();
        let config = providers.resolve(req.requested_mode.as_deref())?;

        let timeout = match req.kind {
            RequestKind::Completion { .. } => self.settings.completion_timeout,
            RequestKind::Chat { .. } => self.settings.chat_timeout,
        };

        let text = match config.wire_style {
            WireStyle::LocalGenerate => {
                local::generate(&self.client, config, req, &self.settings, timeout).await?
            }
            WireStyle::OpenAiChat => {
                openai::generate(&self.client, config, req, &self.settings, timeout).await?
            }
            WireStyle::GeminiGenerate => {
                gemini::generate(&self.client, config, req, &self.settings, timeout).await?
            }
        };

        Ok(GenerationResult {
            text,
            mode_used: config.mode.clone(),
            model_used: config.model_name.clone(),
        })
    }
}

/// Shared HTTP POST for all adapters: send JSON, enforce the timeout, check
/// the status, and cap the body read. Every failure becomes a single
/// `ProviderCallFailed` tagged with the mode being served.
pub(crate) async fn post_json(
    client: &Client,
    config: &ProviderConfig,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<Vec<u8>, GhostwriterError> {
    let mode = &config.mode;
    let mut request = client
        .post(url)
        .header("Content-Type", "application/json")
        .timeout(timeout)
        .json(body);
    if let Some(key) = bearer {
        request = request.header("Authorization", format!("Bearer {key}"));
    }

    let response = request
        .send()
        .await
        .map_err(|e| GhostwriterError::from_transport(mode, e))?;

    let status = response.status();
    if !status.is_success() {
        let error_bytes = response.bytes().await.unwrap_or_default();
        let truncated = &error_bytes[..error_bytes.len().min(MAX_RESPONSE_BYTES)];
        return Err(GhostwriterError::ProviderCallFailed {
            mode: mode.clone(),
            message: String::from_utf8_lossy(truncated).to_string(),
            status: Some(status.as_u16()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| GhostwriterError::from_transport(mode, e))?;

    if bytes.len() > MAX_RESPONSE_BYTES {
        return Err(GhostwriterError::ProviderCallFailed {
            mode: mode.clone(),
            message: format!(
                "response too large: {} bytes (max {MAX_RESPONSE_BYTES})",
                bytes.len()
            ),
            status: None,
        });
    }

    Ok(bytes.to_vec())
}

/// Parse-failure helper so all adapters report malformed bodies uniformly.
pub(crate) fn parse_error(mode: &str, detail: impl std::fmt::Display) -> GhostwriterError {
    GhostwriterError::ProviderCallFailed {
        mode: mode.to_string(),
        message: format!("failed to parse response: {detail}"),
        status: None,
    }
}
