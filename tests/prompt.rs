//! Tests for prompt assembly: file context blocks, transcript flattening,
//! role mapping, and the completion prompt per wire style.

use ghostwriter::config::WireStyle;
use ghostwriter::prompt::{
    build_chat_prompt, build_cloud_messages, build_completion_prompt, build_file_context_block,
    build_gemini_contents, ChatMessage, FileReference, Role,
};

const SYSTEM: &str = "You are a concise coding assistant.";
const BUDGET: usize = 4000;

fn user(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::User,
        content: content.to_string(),
    }
}

fn assistant(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: content.to_string(),
    }
}

fn file(path: &str, content: &str) -> FileReference {
    FileReference {
        path: path.to_string(),
        content: Some(content.to_string()),
        language: Some("python".to_string()),
        start_line: Some(1),
        end_line: Some(20),
    }
}

// ---------------------------------------------------------------------------
// File context block
// ---------------------------------------------------------------------------

#[test]
fn file_block_carries_header_and_fence() {
    let block = build_file_context_block(&[file("src/util.py", "def add(a, b):\n    return a + b")], BUDGET);
    assert!(block.starts_with("src/util.py [python] (lines 1-20)\n```\n"));
    assert!(block.contains("def add(a, b):"));
    assert!(block.ends_with("\n```"));
}

#[test]
fn file_block_splits_budget_with_floor() {
    // 10 files against a 1000-char budget: each gets 100, floored to 200.
    let long = "x".repeat(500);
    let files: Vec<FileReference> = (0..10).map(|i| file(&format!("f{i}.py"), &long)).collect();
    let block = build_file_context_block(&files, 1000);

    for section in block.split("\n\n") {
        let snippet = section
            .split("```\n")
            .nth(1)
            .unwrap()
            .trim_end_matches("\n```");
        assert_eq!(snippet.chars().count(), 200);
        assert!(snippet.ends_with("..."));
    }
}

#[test]
fn file_block_skips_empty_content() {
    let empty = FileReference {
        path: "empty.py".to_string(),
        content: None,
        language: None,
        start_line: None,
        end_line: None,
    };
    let block = build_file_context_block(&[empty, file("real.py", "pass")], BUDGET);
    assert!(!block.contains("empty.py"));
    assert!(block.contains("real.py"));
}

#[test]
fn no_files_yields_empty_block() {
    assert_eq!(build_file_context_block(&[], BUDGET), "");
}

// ---------------------------------------------------------------------------
// Flattened chat prompt (local generate style)
// ---------------------------------------------------------------------------

#[test]
fn chat_prompt_flattens_with_trailing_cue() {
    let prompt = build_chat_prompt(
        &[user("explain this"), assistant("it adds"), user("shorter please")],
        &[],
        SYSTEM,
        BUDGET,
    );
    assert!(prompt.starts_with(&format!("System: {SYSTEM}")));
    assert!(prompt.contains("User: explain this"));
    assert!(prompt.contains("Assistant: it adds"));
    assert!(prompt.ends_with("Assistant:"));
}

#[test]
fn transcript_system_message_overrides_default() {
    let custom = ChatMessage {
        role: Role::System,
        content: "Answer in French.".to_string(),
    };
    let prompt = build_chat_prompt(&[custom, user("hello")], &[], SYSTEM, BUDGET);
    assert!(prompt.starts_with("System: Answer in French."));
    assert!(!prompt.contains(SYSTEM));
}

#[test]
fn explanation_request_injects_files_as_question() {
    let prompt = build_chat_prompt(
        &[user("explain what this function does")],
        &[file("a.py", "def f(): pass")],
        SYSTEM,
        BUDGET,
    );
    assert!(prompt.contains("a.py"));
    assert!(prompt.contains("Question: explain what this function does"));
    assert!(!prompt.contains("Modify the above code"));
}

#[test]
fn modification_request_injects_files_as_edit_instruction() {
    let prompt = build_chat_prompt(
        &[user("add type hints")],
        &[file("a.py", "def f(): pass")],
        SYSTEM,
        BUDGET,
    );
    assert!(prompt.contains("Modify the above code to: add type hints"));
    assert!(prompt.contains("Return the complete modified code."));
}

#[test]
fn files_injected_into_first_user_message_only() {
    let prompt = build_chat_prompt(
        &[user("add logging"), assistant("done"), user("add more logging")],
        &[file("a.py", "def f(): pass")],
        SYSTEM,
        BUDGET,
    );
    assert_eq!(prompt.matches("a.py").count(), 1);
    assert!(prompt.contains("User: add more logging"));
}

// ---------------------------------------------------------------------------
// Role-preserving cloud messages
// ---------------------------------------------------------------------------

#[test]
fn cloud_messages_put_system_first_and_keep_roles() {
    let out = build_cloud_messages(
        &[user("q1"), assistant("a1"), user("q2")],
        &[],
        SYSTEM,
        BUDGET,
    );
    assert_eq!(out.len(), 4);
    assert_eq!(out[0].role, Role::System);
    assert_eq!(out[0].content, SYSTEM);
    assert_eq!(out[1].role, Role::User);
    assert_eq!(out[2].role, Role::Assistant);
    assert_eq!(out[3].content, "q2");
}

#[test]
fn cloud_messages_inject_files_into_first_user_turn() {
    let out = build_cloud_messages(
        &[user("explain this")],
        &[file("a.py", "def f(): pass")],
        SYSTEM,
        BUDGET,
    );
    assert_eq!(out.len(), 2);
    assert!(out[1].content.contains("a.py"));
    assert!(out[1].content.contains("Question: explain this"));
}

// ---------------------------------------------------------------------------
// Gemini content turns
// ---------------------------------------------------------------------------

#[test]
fn gemini_contents_map_roles_and_prepend_system() {
    let contents = build_gemini_contents(
        &[user("q1"), assistant("a1"), user("q2")],
        &[],
        SYSTEM,
        BUDGET,
    );
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["role"], "user");
    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[2]["role"], "user");

    // System prompt rides along in the first user turn only.
    let first = contents[0]["parts"][0]["text"].as_str().unwrap();
    assert!(first.starts_with(SYSTEM));
    assert!(first.ends_with("q1"));
    assert_eq!(contents[2]["parts"][0]["text"], "q2");
}

// ---------------------------------------------------------------------------
// Completion prompt
// ---------------------------------------------------------------------------

#[test]
fn local_completion_prompt_is_the_bare_prefix() {
    assert_eq!(
        build_completion_prompt("def foo", WireStyle::LocalGenerate),
        "def foo"
    );
    assert_eq!(
        build_completion_prompt("def foo", WireStyle::OpenAiChat),
        "def foo"
    );
}

#[test]
fn gemini_completion_prompt_carries_instruction() {
    let prompt = build_completion_prompt("def foo", WireStyle::GeminiGenerate);
    assert!(prompt.contains("Return ONLY the code"));
    assert!(prompt.ends_with("def foo"));
}
