//! Backend HTTP endpoints: the server side of the wire contract.
//!
//! Handlers are stateless per request: the router resolves the mode and
//! takes a provider-set snapshot fresh on every call, so arbitrary editor
//! sessions can hit the server concurrently and a reload takes effect on
//! the next request.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;

use crate::config::{load_properties, ProviderSet};
use crate::error::GhostwriterError;
use crate::router::{GenerationRequest, ProviderRouter, RequestKind};
use crate::wire::{ChatRequest, ChatResponse, CompleteRequest, CompleteResponse};

pub struct AppState {
    pub router: ProviderRouter,
    pub properties_path: PathBuf,
}

/// Error wrapper giving the taxonomy an HTTP shape: configuration and
/// request mistakes are the caller's (400), provider failures are upstream
/// (502). Body matches the `{"detail": ...}` shape clients already parse.
struct ApiError(GhostwriterError);

impl From<GhostwriterError> for ApiError {
    fn from(err: GhostwriterError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GhostwriterError::Configuration { .. } | GhostwriterError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::BAD_GATEWAY,
        };
        if !self.0.is_silent() {
            tracing::warn!(mode = self.0.mode(), "request failed: {}", self.0);
        }
        let body = serde_json::json!({ "detail": self.0.user_message() });
        (status, Json(body)).into_response()
    }
}

pub fn app(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/config", get(config_info))
        .route("/complete", post(complete))
        .route("/chat", post(chat))
        .route("/reload", post(reload))
        .with_state(state)
}

async fn complete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let settings = state.router.settings();
    // The cap is floored at load time; the max here keeps the clamp range
    // valid even for a hand-built Settings.
    let cap = settings.completion_max_tokens.max(16);
    let max_tokens = req.max_tokens.unwrap_or(cap).clamp(16, cap);
    let temperature = req.temperature.unwrap_or(settings.completion_temperature);

    tracing::debug!(
        language = req.language.as_deref(),
        prefix_len = req.prefix.len(),
        mode = req.api_mode.as_deref(),
        "completion request"
    );

    let generation = GenerationRequest {
        kind: RequestKind::Completion {
            prefix: req.prefix,
            suffix: req.suffix.unwrap_or_default(),
        },
        language: req.language,
        file_path: req.file_path,
        max_tokens,
        temperature,
        requested_mode: req.api_mode,
    };

    let result = state.router.generate(&generation).await?;
    Ok(Json(CompleteResponse {
        completion: result.text.trim().to_string(),
        api_mode_used: Some(result.mode_used),
        model_used: Some(result.model_used),
    }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.messages.is_empty() {
        return Err(GhostwriterError::InvalidRequest(
            "chat requires at least one message".to_string(),
        )
        .into());
    }

    let settings = state.router.settings();
    let cap = settings.chat_max_tokens.max(32);
    let max_tokens = req.max_tokens.unwrap_or(cap).clamp(64, cap * 2);
    let temperature = req.temperature.unwrap_or(settings.chat_temperature);

    tracing::debug!(
        messages = req.messages.len(),
        files = req.files.as_ref().map_or(0, Vec::len),
        mode = req.api_mode.as_deref(),
        "chat request"
    );

    let generation = GenerationRequest {
        kind: RequestKind::Chat {
            messages: req.messages,
            files: req.files.unwrap_or_default(),
        },
        language: None,
        file_path: None,
        max_tokens,
        temperature,
        requested_mode: req.api_mode,
    };

    let result = state.router.generate(&generation).await?;
    Ok(Json(ChatResponse {
        answer: result.text,
        api_mode_used: Some(result.mode_used),
        model_used: Some(result.model_used),
    }))
}

/// Re-read the properties file and atomically swap the provider set. The
/// next request sees the new configuration; in-flight calls finish on
/// their snapshot.
async fn reload(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let props = load_properties(&state.properties_path);
    let providers = ProviderSet::from_properties(&props);
    let modes = providers.mode_names();
    let default_mode = providers.default_mode.clone();
    state.router.replace(providers);
    tracing::info!(default_mode = %default_mode, "provider configuration reloaded");
    Json(serde_json::json!({
        "status": "ok",
        "api_mode": default_mode,
        "modes": modes,
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let providers = state.router.snapshot();
    let model = providers
        .get(&providers.default_mode)
        .map(|c| c.model_name.clone());
    Json(serde_json::json!({
        "status": "ok",
        "api_mode": providers.default_mode,
        "model": model,
    }))
}

/// Current non-secret configuration. Credentials never appear here.
async fn config_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let providers = state.router.snapshot();
    let settings = state.router.settings();
    Json(serde_json::json!({
        "api_mode": providers.default_mode,
        "modes": providers.mode_names(),
        "max_tokens": settings.chat_max_tokens,
        "temperature": settings.chat_temperature,
        "completion_max_tokens": settings.completion_max_tokens,
        "completion_temperature": settings.completion_temperature,
    }))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "title": "Unified AI Code Assistant (Local + Cloud)",
        "endpoints": {
            "POST /complete": { "body": { "prefix": "text before cursor", "suffix": "(optional) text after cursor" } },
            "POST /chat": { "body": { "messages": "[{role, content}]", "files": "(optional) linked file snippets" } },
            "POST /reload": {},
            "GET /health": {},
            "GET /config": {},
        },
    }))
}

pub async fn serve(state: Arc<AppState>, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {addr}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
