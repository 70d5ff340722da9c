//! Client-side completion request scheduler.
//!
//! Converts a stream of edit events into at most one useful outbound
//! completion call at a time: `Idle → Debouncing → InFlight → Idle`.
//! Concurrency is expressed purely through cancellation tokens: exactly one
//! token is current per edit stream, and superseding a token invalidates it
//! permanently. A result is applied only if its token is still current, so a
//! late response from an aborted network call is discarded even when the
//! remote side completed it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::CompletionTransport;
use crate::postprocess::clean_suggestion;
use crate::wire::CompleteRequest;

pub const CONTEXT_LINES_BEFORE: usize = 50;
pub const CONTEXT_LINES_AFTER: usize = 20;
pub const MAX_PREFIX_CHARS: usize = 4000;
pub const MAX_SUFFIX_CHARS: usize = 1000;

/// Editor buffer state at trigger time. `cursor_col` is a character offset
/// into the cursor line.
#[derive(Debug, Clone)]
pub struct EditorSnapshot {
    pub lines: Vec<String>,
    pub cursor_line: usize,
    pub cursor_col: usize,
    pub language: Option<String>,
    pub file_path: Option<String>,
}

impl EditorSnapshot {
    /// The part of the cursor line the user has already typed. Used both
    /// for the whitespace-only guard and for echo removal.
    pub fn line_prefix(&self) -> String {
        self.lines
            .get(self.cursor_line)
            .map(|line| line.chars().take(self.cursor_col).collect())
            .unwrap_or_default()
    }
}

/// Bounded context around the cursor sent with a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    pub prefix: String,
    pub suffix: String,
}

/// Capture up to [`CONTEXT_LINES_BEFORE`]/[`CONTEXT_LINES_AFTER`] lines
/// around the cursor, then apply the character caps. Truncation always
/// drops the far end; the content nearest the cursor survives.
pub fn capture_context(snapshot: &EditorSnapshot) -> ContextWindow {
    let cursor_line = snapshot.cursor_line.min(snapshot.lines.len().saturating_sub(1));
    let start = cursor_line.saturating_sub(CONTEXT_LINES_BEFORE);
    let end = (cursor_line + 1 + CONTEXT_LINES_AFTER).min(snapshot.lines.len());

    let mut prefix = String::new();
    for line in &snapshot.lines[start..cursor_line] {
        prefix.push_str(line);
        prefix.push('\n');
    }
    prefix.push_str(&snapshot.line_prefix());

    let mut suffix = String::new();
    if let Some(line) = snapshot.lines.get(cursor_line) {
        suffix.extend(line.chars().skip(snapshot.cursor_col));
    }
    let after_start = (cursor_line + 1).min(snapshot.lines.len());
    for line in &snapshot.lines[after_start..end] {
        suffix.push('\n');
        suffix.push_str(line);
    }

    ContextWindow {
        prefix: keep_tail_chars(&prefix, MAX_PREFIX_CHARS),
        suffix: keep_head_chars(&suffix, MAX_SUFFIX_CHARS),
    }
}

fn keep_tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    text.chars().skip(count - max).collect()
}

fn keep_head_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}

/// A cleaned suggestion ready to surface as ghost text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    pub mode_used: Option<String>,
    pub model_used: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Debouncing,
    InFlight,
}

pub struct CompletionScheduler {
    transport: Arc<dyn CompletionTransport>,
    suggestions: mpsc::Sender<Suggestion>,
    state: Arc<Mutex<SchedulerState>>,
    /// The one current token for this edit stream. Replaced (never reused)
    /// on every trigger; the old token is cancelled first.
    current: CancellationToken,
    debounce: Duration,
}

fn read_state(state: &Mutex<SchedulerState>) -> SchedulerState {
    match state.lock() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn write_state(state: &Mutex<SchedulerState>, next: SchedulerState) {
    match state.lock() {
        Ok(mut guard) => *guard = next,
        Err(poisoned) => *poisoned.into_inner() = next,
    }
}

impl CompletionScheduler {
    /// Returns the scheduler and the receiving end of the suggestion
    /// channel, the editor side that renders ghost text.
    pub fn new(
        transport: Arc<dyn CompletionTransport>,
        debounce: Duration,
    ) -> (Self, mpsc::Receiver<Suggestion>) {
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                transport,
                suggestions: tx,
                state: Arc::new(Mutex::new(SchedulerState::Idle)),
                current: CancellationToken::new(),
                debounce,
            },
            rx,
        )
    }

    pub fn state(&self) -> SchedulerState {
        read_state(&self.state)
    }

    /// Automatic trigger: an edit event while typing. Cancels any pending
    /// timer or in-flight call, then re-enters Debouncing with a fresh
    /// timer. A whitespace-only line prefix yields no request at all.
    pub fn notify_edit(&mut self, snapshot: EditorSnapshot) {
        self.supersede();
        if snapshot.line_prefix().trim().is_empty() {
            write_state(&self.state, SchedulerState::Idle);
            return;
        }
        self.spawn_attempt(snapshot, true);
    }

    /// Manual trigger: explicit user action. Bypasses the debounce delay,
    /// still cancelling any prior attempt first.
    pub fn trigger_manual(&mut self, snapshot: EditorSnapshot) {
        self.supersede();
        self.spawn_attempt(snapshot, false);
    }

    /// Invalidate the previous attempt's token permanently and mint the
    /// next one.
    fn supersede(&mut self) {
        let previous = std::mem::replace(&mut self.current, CancellationToken::new());
        previous.cancel();
    }

    fn spawn_attempt(&self, snapshot: EditorSnapshot, debounce: bool) {
        let token = self.current.clone();
        let state = self.state.clone();
        let transport = self.transport.clone();
        let suggestions = self.suggestions.clone();
        let delay = self.debounce;

        write_state(
            &state,
            if debounce {
                SchedulerState::Debouncing
            } else {
                SchedulerState::InFlight
            },
        );

        tokio::spawn(async move {
            if debounce {
                tokio::select! {
                    () = token.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
                write_state(&state, SchedulerState::InFlight);
            }

            let window = capture_context(&snapshot);
            let line_prefix = snapshot.line_prefix();
            let request = CompleteRequest {
                prefix: window.prefix,
                suffix: Some(window.suffix).filter(|s| !s.is_empty()),
                language: snapshot.language.clone(),
                file_path: snapshot.file_path.clone(),
                max_tokens: None,
                temperature: None,
                api_mode: None,
            };

            // Cancellation is cooperative: the select drops the call future,
            // but the remote side may still complete it.
            let result = tokio::select! {
                () = token.cancelled() => return,
                result = transport.complete(request) => result,
            };

            // A result for a superseded token must never reach the editor,
            // even though the network call completed.
            if token.is_cancelled() {
                return;
            }

            match result {
                Ok(response) => {
                    if let Some(text) = clean_suggestion(&response.completion, &line_prefix) {
                        let _ = suggestions
                            .send(Suggestion {
                                text,
                                mode_used: response.api_mode_used,
                                model_used: response.model_used,
                            })
                            .await;
                    }
                }
                Err(e) if e.is_silent() => {}
                Err(e) => {
                    tracing::warn!("completion attempt failed: {}", e.user_message());
                }
            }

            if !token.is_cancelled() {
                write_state(&state, SchedulerState::Idle);
            }
        });
    }
}
