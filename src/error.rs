use thiserror::Error;

#[derive(Debug, Error)]
pub enum GhostwriterError {
    /// The attempt was superseded by a newer one. Expected churn from fast
    /// typing; never shown to the user, never logged at error level.
    #[error("request cancelled")]
    Cancelled,

    /// The provider returned nothing usable after cleaning. Treated as
    /// "no suggestion available", not a failure.
    #[error("empty result")]
    EmptyResult,

    /// Transport failure, timeout, non-2xx status, or malformed body from a
    /// provider. Carries the mode that failed so the log line names it.
    #[error("provider call failed for mode {mode}: {message}")]
    ProviderCallFailed {
        mode: String,
        message: String,
        status: Option<u16>,
    },

    /// The requested or default mode has no usable provider configuration
    /// (unknown mode, missing credential). Always surfaced, never silently
    /// downgraded to another provider.
    #[error("configuration error for mode {mode}: {message}")]
    Configuration { mode: String, message: String },

    /// The caller sent a request the router cannot act on (e.g. an empty
    /// message list).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GhostwriterError {
    /// True for outcomes that must produce no user-visible error: a
    /// superseded attempt and a cleaned-to-nothing suggestion.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Cancelled | Self::EmptyResult)
    }

    /// Extract the mode name from variants that carry one.
    pub fn mode(&self) -> Option<&str> {
        match self {
            Self::ProviderCallFailed { mode, .. } => Some(mode),
            Self::Configuration { mode, .. } => Some(mode),
            _ => None,
        }
    }

    /// Sanitized message safe for returning to editor clients. Does not leak
    /// endpoint URLs or credentials.
    pub fn user_message(&self) -> String {
        match self {
            Self::Cancelled => "request cancelled".to_string(),
            Self::EmptyResult => "no suggestion available".to_string(),
            Self::ProviderCallFailed {
                mode,
                message,
                status,
            } => match status {
                Some(code) => format!("provider for mode {mode} returned {code}: {message}"),
                None => format!("provider call failed for mode {mode}: {message}"),
            },
            Self::Configuration { mode, message } => {
                format!("mode {mode} is not configured: {message}")
            }
            Self::InvalidRequest(msg) => msg.clone(),
        }
    }

    /// Classify a reqwest failure into a provider-call failure tagged with
    /// the mode that was being served.
    pub fn from_transport(mode: &str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            err.to_string()
        };
        Self::ProviderCallFailed {
            mode: mode.to_string(),
            message,
            status: err.status().map(|s| s.as_u16()),
        }
    }
}
