//! Turns a raw provider string into a clean insertable suggestion.
//!
//! Models decorate completions with markdown fences and frequently echo the
//! code the user already typed. Both have to go before the text is shown as
//! a ghost suggestion, and cleaning an already-clean suggestion must be the
//! identity so repeated passes are safe.

/// Clean a raw suggestion against the current-line prefix the user typed.
/// Returns `None` when nothing usable remains: "no suggestion", not an
/// error.
pub fn clean_suggestion(raw: &str, typed_prefix: &str) -> Option<String> {
    let stripped = strip_markup(raw);
    let deduped = strip_echoed_prefix(&stripped, typed_prefix);

    // Leading spaces can be meaningful indentation for continuation lines;
    // leading newlines and trailing whitespace never are.
    let cleaned = deduped
        .trim_start_matches(['\n', '\r'])
        .trim_end()
        .to_string();

    if cleaned.trim().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Drop fenced code block marker lines and unwrap whole-string inline
/// emphasis (`` `code` ``, `**code**`).
pub fn strip_markup(raw: &str) -> String {
    let body: Vec<&str> = raw.lines().filter(|line| !is_fence(line)).collect();
    let joined = body.join("\n");
    strip_inline_wrapper(&joined)
}

fn strip_inline_wrapper(text: &str) -> String {
    let trimmed = text.trim();
    for wrapper in ["**", "`"] {
        if trimmed.len() > 2 * wrapper.len()
            && trimmed.starts_with(wrapper)
            && trimmed.ends_with(wrapper)
        {
            let inner = &trimmed[wrapper.len()..trimmed.len() - wrapper.len()];
            // Only unwrap a full-string wrapper, not a string that happens
            // to start and end with the marker around other markers.
            if !inner.contains(wrapper) {
                return inner.to_string();
            }
        }
    }
    text.to_string()
}

/// Remove an echoed duplicate of what the user already typed. Primary check:
/// the trimmed current-line prefix against the suggestion start. Secondary:
/// the last few whitespace-delimited tokens of the typed prefix, which
/// catches models that re-emit only the tail of the line. A match only
/// counts on a word boundary, so a suggestion that merely continues the
/// typed identifier is left intact.
pub fn strip_echoed_prefix(suggestion: &str, typed_prefix: &str) -> String {
    let typed = typed_prefix.trim();
    if typed.is_empty() {
        return suggestion.to_string();
    }

    let candidate = suggestion.trim_start();
    if let Some(rest) = candidate.strip_prefix(typed)
        && boundary_at_start(rest)
    {
        return rest.to_string();
    }

    let tokens: Vec<&str> = typed.split_whitespace().collect();
    let window = tokens.len().min(3);
    for n in (1..=window).rev() {
        let tail = tokens[tokens.len() - n..].join(" ");
        // Skip the full-prefix case, already checked above with original
        // spacing preserved.
        if tail == typed {
            continue;
        }
        if let Some(rest) = candidate.strip_prefix(&tail)
            && boundary_at_start(rest)
        {
            return rest.to_string();
        }
    }

    suggestion.to_string()
}

/// True when `rest` does not begin mid-identifier.
fn boundary_at_start(rest: &str) -> bool {
    rest.chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric() && c != '_')
}
