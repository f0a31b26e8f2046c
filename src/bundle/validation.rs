//! Content rules for bundle names, descriptions, and bodies.

use crate::error::{ParseError, ParseErrorKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Size and naming limits applied to every bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleLimits {
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,

    #[serde(default = "default_max_description_len")]
    pub max_description_len: usize,

    /// Body line ceiling. Longer bodies are rejected, never truncated.
    #[serde(default = "default_max_body_lines")]
    pub max_body_lines: usize,

    /// Header lines read before giving up on finding the closing fence
    #[serde(default = "default_max_header_lines")]
    pub max_header_lines: usize,

    /// Tokens a name may not contain
    #[serde(default = "default_reserved_tokens")]
    pub reserved_tokens: Vec<String>,
}

fn default_max_name_len() -> usize {
    64
}

fn default_max_description_len() -> usize {
    1024
}

fn default_max_body_lines() -> usize {
    500
}

fn default_max_header_lines() -> usize {
    64
}

fn default_reserved_tokens() -> Vec<String> {
    vec!["anthropic".to_string(), "claude".to_string()]
}

impl Default for BundleLimits {
    fn default() -> Self {
        Self {
            max_name_len: default_max_name_len(),
            max_description_len: default_max_description_len(),
            max_body_lines: default_max_body_lines(),
            max_header_lines: default_max_header_lines(),
            reserved_tokens: default_reserved_tokens(),
        }
    }
}

/// Phrases that tell a caller when a skill applies.
const APPLICABILITY_CUES: &[&str] = &[
    "use when",
    "use this",
    "use for",
    "use it",
    "used when",
    "used for",
    "when ",
    "whenever",
    "applies to",
    "applicable",
    "useful for",
    "triggered by",
    "trigger",
];

/// Words that make a description personal rather than descriptive.
const PERSONAL_PRONOUNS: &[&str] = &[
    "i", "i'm", "i'll", "i've", "me", "my", "mine", "we", "we're", "we'll", "our", "ours",
    "you", "you're", "you'll", "your", "yours",
];

const MIN_DESCRIPTION_WORDS: usize = 4;

/// Trim and NFKC-normalize a skill name before validation or lookup.
pub fn normalize_name(name: &str) -> String {
    name.trim().nfkc().collect::<String>()
}

pub fn validate_name(name: &str, location: &Path, limits: &BundleLimits) -> Result<(), ParseError> {
    let fail = |message: String| {
        Err(ParseError::new(ParseErrorKind::NameFormat, location, message).with_field("name"))
    };

    if name.is_empty() {
        return fail("name must be non-empty".to_string());
    }
    if name.chars().count() > limits.max_name_len {
        return fail(format!(
            "name must be at most {} characters",
            limits.max_name_len
        ));
    }
    if !name.chars().next().map_or(false, |c| c.is_ascii_lowercase()) {
        return fail("name must start with a lowercase letter".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return fail("name may only contain lowercase letters, digits, and '-'".to_string());
    }
    if name.ends_with('-') {
        return fail("name must not end with '-'".to_string());
    }
    if name.contains("--") {
        return fail("name must not contain consecutive '-'".to_string());
    }
    if let Some(token) = limits
        .reserved_tokens
        .iter()
        .find(|t| !t.is_empty() && name.contains(t.as_str()))
    {
        return fail(format!("name must not contain reserved token '{}'", token));
    }
    Ok(())
}

pub fn validate_description(
    description: &str,
    location: &Path,
    limits: &BundleLimits,
) -> Result<(), ParseError> {
    let fail = |message: String| {
        Err(
            ParseError::new(ParseErrorKind::DescriptionFormat, location, message)
                .with_field("description"),
        )
    };

    let desc = description.trim();
    if desc.is_empty() {
        return fail("description must be non-empty".to_string());
    }
    if desc.chars().count() > limits.max_description_len {
        return fail(format!(
            "description must be at most {} characters",
            limits.max_description_len
        ));
    }
    if desc.contains('<') && desc.contains('>') {
        return fail("description must not contain XML-like tags".to_string());
    }

    let words: Vec<String> = desc
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '\'' | '/')))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    if let Some(word) = words.iter().find(|w| PERSONAL_PRONOUNS.contains(&w.as_str())) {
        return fail(format!(
            "description must be written in the third person (found '{}'); describe what the skill does, e.g. \"Processes Excel files\"",
            word
        ));
    }
    if words.len() < MIN_DESCRIPTION_WORDS {
        return fail(
            "description is too short to state what the skill does and when it applies"
                .to_string(),
        );
    }

    let lower = format!("{} ", desc.to_lowercase());
    if !APPLICABILITY_CUES.iter().any(|cue| lower.contains(cue)) {
        return fail(
            "description must say when the skill applies (e.g. \"Use when working with PDF forms\")"
                .to_string(),
        );
    }
    Ok(())
}

pub fn validate_body(body: &str, location: &Path, limits: &BundleLimits) -> Result<(), ParseError> {
    let lines = body.lines().count();
    if lines > limits.max_body_lines {
        return Err(ParseError::new(
            ParseErrorKind::SizeLimit,
            location,
            format!(
                "body has {} lines, limit is {}; move detailed material into files under references/ and link to them from the body",
                lines, limits.max_body_lines
            ),
        )
        .with_field("body"));
    }
    Ok(())
}
