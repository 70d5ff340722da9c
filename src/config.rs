use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::GhostwriterError;

/// Java-style `key=value` property store, as produced by the deployment's
/// `app.properties` file.
pub type Properties = HashMap<String, String>;

/// Parse a properties file. A missing file is not an error; the caller
/// falls back to environment variables and built-in defaults.
pub fn load_properties(path: impl AsRef<Path>) -> Properties {
    let path = path.as_ref();
    let mut props = Properties::new();
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => {
            tracing::warn!("{} not found, using defaults", path.display());
            return props;
        }
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    tracing::info!("loaded configuration from {}", path.display());
    props
}

/// Look up a config value: properties file first, then the environment
/// (`api.mode` → `API_MODE`), then the default.
pub fn get_config(key: &str, default: &str, props: &Properties) -> String {
    if let Some(value) = props.get(key) {
        return value.clone();
    }
    let env_key = key.replace('.', "_").to_uppercase();
    env::var(env_key).unwrap_or_else(|_| default.to_string())
}

fn get_parsed<T: std::str::FromStr>(key: &str, default: T, props: &Properties) -> T {
    let env_key = key.replace('.', "_").to_uppercase();
    props
        .get(key)
        .cloned()
        .or_else(|| env::var(env_key).ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// The request/response JSON shape a provider family expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireStyle {
    /// Single-shot prompt string, no chat roles, no credential (Ollama-style
    /// `/api/generate`).
    LocalGenerate,
    /// Role-tagged message array with a bearer credential.
    OpenAiChat,
    /// Provider-specific content array, API key in the URL.
    GeminiGenerate,
}

/// One configured provider. Immutable after load; a reload builds a whole
/// new set rather than mutating entries in place.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub mode: String,
    pub endpoint_url: String,
    pub model_name: String,
    pub api_key: Option<String>,
    pub wire_style: WireStyle,
}

impl ProviderConfig {
    /// Wire styles that authenticate need a non-empty credential.
    fn requires_key(&self) -> bool {
        !matches!(self.wire_style, WireStyle::LocalGenerate)
    }
}

/// The full set of configured providers plus the process default mode.
/// Treated as an immutable snapshot for the duration of one call.
#[derive(Debug, Clone)]
pub struct ProviderSet {
    modes: HashMap<String, ProviderConfig>,
    pub default_mode: String,
}

impl ProviderSet {
    pub fn new(default_mode: impl Into<String>, configs: Vec<ProviderConfig>) -> Self {
        let modes = configs.into_iter().map(|c| (c.mode.clone(), c)).collect();
        Self {
            modes,
            default_mode: default_mode.into(),
        }
    }

    /// Build the three built-in provider entries from the
    /// `<mode>.api.url` / `<mode>.model.name` / `<mode>.api.key` triples.
    pub fn from_properties(props: &Properties) -> Self {
        let entry = |mode: &str, url_default: &str, model_default: &str, style: WireStyle| {
            ProviderConfig {
                mode: mode.to_string(),
                endpoint_url: get_config(&format!("{mode}.api.url"), url_default, props),
                model_name: get_config(&format!("{mode}.model.name"), model_default, props),
                api_key: Some(get_config(&format!("{mode}.api.key"), "", props))
                    .filter(|k| !k.is_empty()),
                wire_style: style,
            }
        };

        let configs = vec![
            entry(
                "local",
                "http://localhost:11434/api/generate",
                "deepseek-coder:6.7b",
                WireStyle::LocalGenerate,
            ),
            entry(
                "openai",
                "https://api.openai.com/v1/chat/completions",
                "gpt-3.5-turbo",
                WireStyle::OpenAiChat,
            ),
            entry(
                "gemini",
                "https://generativelanguage.googleapis.com/v1beta/models",
                "gemini-2.5-flash",
                WireStyle::GeminiGenerate,
            ),
        ];

        Self::new(get_config("api.mode", "local", props), configs)
    }

    /// Resolve the provider for a request. The effective mode is the
    /// request-level override when present and non-empty, else the process
    /// default. Recomputed on every call, never cached across requests.
    ///
    /// An unknown mode or a missing credential is a configuration error, not
    /// a silent fallback: routing the prompt to the wrong provider would
    /// leak it to the wrong destination.
    pub fn resolve(&self, requested: Option<&str>) -> Result<&ProviderConfig, GhostwriterError> {
        let mode = requested
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.default_mode);
        // Legacy "token" mode predates the per-provider config surface.
        let mode = if mode == "token" { "openai" } else { mode };

        let config = self
            .modes
            .get(mode)
            .ok_or_else(|| GhostwriterError::Configuration {
                mode: mode.to_string(),
                message: "no provider configured for this mode".to_string(),
            })?;

        if config.requires_key() && config.api_key.is_none() {
            return Err(GhostwriterError::Configuration {
                mode: mode.to_string(),
                message: "api key not configured".to_string(),
            });
        }
        Ok(config)
    }

    pub fn get(&self, mode: &str) -> Option<&ProviderConfig> {
        self.modes.get(mode)
    }

    /// Configured mode names, sorted for stable display.
    pub fn mode_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modes.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Client-side half of the effective-mode precedence chain: explicit
/// per-request override, else the persisted user preference, else none
/// (the backend applies its process default). Empty strings never win.
pub fn resolve_mode<'a>(explicit: Option<&'a str>, preference: Option<&'a str>) -> Option<&'a str> {
    explicit
        .filter(|m| !m.trim().is_empty())
        .or_else(|| preference.filter(|m| !m.trim().is_empty()))
}

/// Tuning knobs shared by the server handlers and the client scheduler.
/// All values come from the same properties surface as the provider set.
#[derive(Debug, Clone)]
pub struct Settings {
    pub chat_max_tokens: u64,
    pub chat_temperature: f64,
    pub completion_max_tokens: u64,
    pub completion_temperature: f64,
    pub file_context_max_chars: usize,
    pub debounce: Duration,
    /// Interactive budget for automatic completion calls.
    pub completion_timeout: Duration,
    /// Chat tolerates larger generations.
    pub chat_timeout: Duration,
    pub chat_system_prompt: String,
    pub bind_addr: String,
}

pub const DEFAULT_CHAT_SYSTEM_PROMPT: &str = "You are a code assistant. When given code:\n\
- Read it carefully FIRST\n\
- If asked to explain: explain what the code ACTUALLY does (don't invent problems)\n\
- If asked to modify: return the COMPLETE modified code in ```language blocks\n\
- Keep the same structure, class names, and method names\n\
- Be accurate and concise";

impl Settings {
    pub fn from_properties(props: &Properties) -> Self {
        Self {
            // Caps are floored so the handlers' clamp ranges stay valid
            // (completion requests clamp to [16, cap], chat to [64, 2*cap]).
            chat_max_tokens: get_parsed("chat.max.tokens", 512, props).max(32),
            chat_temperature: get_parsed("chat.temperature", 0.3, props),
            completion_max_tokens: get_parsed("completion.max.tokens", 128, props).max(16),
            completion_temperature: get_parsed("completion.temperature", 0.0, props),
            file_context_max_chars: get_parsed("file.context.max.chars", 4000, props),
            debounce: Duration::from_millis(get_parsed("completion.debounce.ms", 2000, props)),
            completion_timeout: Duration::from_secs(get_parsed(
                "completion.timeout.secs",
                30,
                props,
            )),
            chat_timeout: Duration::from_secs(get_parsed("chat.timeout.secs", 120, props)),
            chat_system_prompt: env::var("CHAT_SYSTEM_PROMPT")
                .unwrap_or_else(|_| DEFAULT_CHAT_SYSTEM_PROMPT.to_string()),
            bind_addr: get_config("server.bind", "127.0.0.1:8000", props),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_properties(&Properties::new())
    }
}
