use serde::{Deserialize, Serialize};

use crate::config::WireStyle;

/// Chat transcript roles, matching the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// A file snippet attached by the editor, consumed as-is. Capture and
/// selection happen on the client; the builders only format it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReference {
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub start_line: Option<u32>,
    #[serde(default)]
    pub end_line: Option<u32>,
}

fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(3);
    let truncated: String = text.chars().take(keep).collect();
    format!("{truncated}...")
}

/// Render attached files into a fenced context block. The char budget is
/// split across files with a 200-char floor per file so a crowd of small
/// attachments never starves one of them.
pub fn build_file_context_block(files: &[FileReference], char_budget: usize) -> String {
    if files.is_empty() {
        return String::new();
    }
    let per_file_limit = (char_budget / files.len()).max(200);
    let mut blocks = Vec::new();

    for file in files {
        let content = file.content.as_deref().unwrap_or("");
        if content.is_empty() {
            tracing::warn!(path = %file.path, "attached file has no content, skipping");
            continue;
        }
        let snippet = truncate_text(content, per_file_limit);
        let mut header = file.path.clone();
        if let Some(ref lang) = file.language {
            header.push_str(&format!(" [{lang}]"));
        }
        if let (Some(start), Some(end)) = (file.start_line, file.end_line) {
            header.push_str(&format!(" (lines {start}-{end})"));
        }
        blocks.push(format!("{header}\n```\n{snippet}\n```"));
    }

    blocks.join("\n\n")
}

/// Heuristic from the chat UX: questions get the file block as reading
/// material, everything else is treated as a modification request.
fn is_explanation(content: &str) -> bool {
    let lower = content.to_lowercase();
    ["explain", "what", "how", "why", "describe"]
        .iter()
        .any(|w| lower.contains(w))
}

fn inject_file_block(file_block: &str, content: &str) -> String {
    if is_explanation(content) {
        format!("{file_block}\n\nQuestion: {content}")
    } else {
        format!(
            "{file_block}\n\nModify the above code to: {content}\n\nReturn the complete modified code."
        )
    }
}

/// Flatten a chat transcript into a single prompt for local generate-style
/// models (no chat roles on the wire). File context is injected into the
/// first user message; a caller-provided system message overrides the
/// default system prompt.
pub fn build_chat_prompt(
    messages: &[ChatMessage],
    files: &[FileReference],
    default_system_prompt: &str,
    file_char_budget: usize,
) -> String {
    let mut system_prompt = default_system_prompt.to_string();
    let file_block = build_file_context_block(files, file_char_budget);
    let mut injected = file_block.is_empty();
    let mut conversation = Vec::new();

    for msg in messages {
        if msg.role == Role::System {
            system_prompt = msg.content.clone();
            continue;
        }
        let speaker = match msg.role {
            Role::User => "User",
            _ => "Assistant",
        };
        if msg.role == Role::User && !injected {
            conversation.push(format!("{speaker}: {}", inject_file_block(&file_block, &msg.content)));
            injected = true;
        } else {
            conversation.push(format!("{speaker}: {}", msg.content));
        }
    }

    let mut sections = vec![format!("System: {system_prompt}")];
    sections.extend(conversation);
    sections.push("Assistant:".to_string());
    sections.join("\n\n")
}

/// Role-preserving message list for OpenAI-chat-style providers. The system
/// message goes first; file context is injected into the first user message.
pub fn build_cloud_messages(
    messages: &[ChatMessage],
    files: &[FileReference],
    default_system_prompt: &str,
    file_char_budget: usize,
) -> Vec<ChatMessage> {
    let mut system_prompt = default_system_prompt.to_string();
    let file_block = build_file_context_block(files, file_char_budget);
    let mut injected = file_block.is_empty();
    let mut out = Vec::new();

    for msg in messages {
        if msg.role == Role::System {
            system_prompt = msg.content.clone();
            continue;
        }
        if msg.role == Role::User && !injected {
            out.push(ChatMessage {
                role: Role::User,
                content: inject_file_block(&file_block, &msg.content),
            });
            injected = true;
        } else {
            out.push(msg.clone());
        }
    }

    out.insert(
        0,
        ChatMessage {
            role: Role::System,
            content: system_prompt,
        },
    );
    out
}

/// Gemini content turns: only `user` and `model` roles exist, and there is
/// no system slot, so the system prompt is prepended to the first user turn.
pub fn build_gemini_contents(
    messages: &[ChatMessage],
    files: &[FileReference],
    default_system_prompt: &str,
    file_char_budget: usize,
) -> Vec<serde_json::Value> {
    let mut system_prompt = default_system_prompt.to_string();
    let file_block = build_file_context_block(files, file_char_budget);
    let mut injected = file_block.is_empty();
    let mut contents: Vec<(String, String)> = Vec::new();

    for msg in messages {
        if msg.role == Role::System {
            system_prompt = msg.content.clone();
            continue;
        }
        let role = match msg.role {
            Role::Assistant => "model",
            _ => "user",
        };
        let text = if msg.role == Role::User && !injected {
            injected = true;
            inject_file_block(&file_block, &msg.content)
        } else {
            msg.content.clone()
        };
        contents.push((role.to_string(), text));
    }

    if !system_prompt.is_empty()
        && let Some(first_user) = contents.iter_mut().find(|(role, _)| role == "user")
    {
        first_user.1 = format!("{system_prompt}\n\n{}", first_user.1);
    }

    contents
        .into_iter()
        .map(|(role, text)| {
            serde_json::json!({ "role": role, "parts": [{ "text": text }] })
        })
        .collect()
}

const GEMINI_COMPLETION_INSTRUCTION: &str = "Complete the following code. Return ONLY the code \
continuation, no explanations, no markdown, no backticks:\n\n";

/// Fill-in-middle prompt for `/complete`. Local models get the bare prefix;
/// Gemini needs an explicit only-code instruction or it chats back.
pub fn build_completion_prompt(prefix: &str, wire_style: WireStyle) -> String {
    match wire_style {
        WireStyle::GeminiGenerate => format!("{GEMINI_COMPLETION_INSTRUCTION}{prefix}"),
        _ => prefix.to_string(),
    }
}
