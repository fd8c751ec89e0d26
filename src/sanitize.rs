//! Prompt sanitization.
//!
//! Strips markup and script-like fragments before a prompt reaches any
//! provider. This guards downstream consumers that may render model output;
//! it is not a security boundary.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::{ConsiliumError, Result};

/// Maximum prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 50_000;

static COMMENT_BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|/\*.*?\*/").expect("valid regex"));

static SCRIPT_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<script\b[^>]*/?>").expect("valid regex")
});

static DANGEROUS_FRAGMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)javascript\s*:|vbscript\s*:|data\s*:|eval\s*\(|exec\s*\(")
        .expect("valid regex")
});

/// Validate and clean raw prompt text.
///
/// Returns [`ConsiliumError::InvalidInput`] when the prompt is empty, either
/// as given or after cleaning.
pub fn sanitize(prompt: &str) -> Result<String> {
    if prompt.trim().is_empty() {
        return Err(ConsiliumError::InvalidInput(
            "prompt must be a non-empty string".to_string(),
        ));
    }

    let cleaned = COMMENT_BLOCKS.replace_all(prompt, "");
    let cleaned = SCRIPT_TAGS.replace_all(&cleaned, "");
    let cleaned = DANGEROUS_FRAGMENTS.replace_all(&cleaned, "");

    let char_count = cleaned.chars().count();
    let cleaned = if char_count > MAX_PROMPT_CHARS {
        warn!(
            original_chars = char_count,
            retained_chars = MAX_PROMPT_CHARS,
            "prompt truncated"
        );
        cleaned.chars().take(MAX_PROMPT_CHARS).collect::<String>()
    } else {
        cleaned.into_owned()
    };

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return Err(ConsiliumError::InvalidInput(
            "prompt is empty after sanitization".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
