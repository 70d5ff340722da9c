//! Editor-side HTTP client for the backend wire contract.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::{resolve_mode, Settings};
use crate::error::GhostwriterError;
use crate::wire::{ChatRequest, ChatResponse, CompleteRequest, CompleteResponse};

/// Seam the scheduler talks through, so tests can substitute a scripted
/// transport for the real backend.
#[async_trait]
pub trait CompletionTransport: Send + Sync + 'static {
    async fn complete(&self, req: CompleteRequest) -> Result<CompleteResponse, GhostwriterError>;
}

/// Talks to the backend over the JSON wire contract. Completion calls use
/// the short interactive timeout; chat calls the long one. The two may
/// overlap freely; they are different logical intents.
pub struct BackendClient {
    http: Client,
    base_url: String,
    /// Persisted user preference for the mode, applied when a request
    /// carries no explicit override. `None` leaves the choice to the
    /// backend's process default.
    preferred_mode: Option<String>,
    completion_timeout: Duration,
    chat_timeout: Duration,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, settings: &Settings) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.into(),
            preferred_mode: None,
            completion_timeout: settings.completion_timeout,
            chat_timeout: settings.chat_timeout,
        }
    }

    pub fn with_preferred_mode(mut self, mode: impl Into<String>) -> Self {
        self.preferred_mode = Some(mode.into());
        self
    }

    /// Effective mode sent on the wire: explicit override → persisted
    /// preference → absent (backend default). Recomputed per request.
    fn effective_mode(&self, explicit: Option<&str>) -> Option<String> {
        resolve_mode(explicit, self.preferred_mode.as_deref()).map(str::to_string)
    }

    async fn post<Req: serde::Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
        timeout: Duration,
    ) -> Result<Resp, GhostwriterError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| GhostwriterError::from_transport("backend", e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GhostwriterError::ProviderCallFailed {
                mode: "backend".to_string(),
                message: detail,
                status: Some(status.as_u16()),
            });
        }

        response
            .json()
            .await
            .map_err(|e| GhostwriterError::from_transport("backend", e))
    }

    pub async fn chat(&self, mut req: ChatRequest) -> Result<ChatResponse, GhostwriterError> {
        req.api_mode = self.effective_mode(req.api_mode.as_deref());
        self.post("/chat", &req, self.chat_timeout).await
    }
}

#[async_trait]
impl CompletionTransport for BackendClient {
    async fn complete(
        &self,
        mut req: CompleteRequest,
    ) -> Result<CompleteResponse, GhostwriterError> {
        req.api_mode = self.effective_mode(req.api_mode.as_deref());
        self.post("/complete", &req, self.completion_timeout).await
    }
}
