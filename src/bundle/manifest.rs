//! `SKILL.md` layout: a `---` fenced YAML header followed by the body.
//!
//! The header schema is closed. `name` and `description` are required;
//! `allowed-tools` and `priority` are the only optional fields. Anything else
//! is rejected so manifests cannot smuggle in undocumented behavior.

use crate::error::{ParseError, ParseErrorKind};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Manifest file name inside a bundle directory.
pub const MANIFEST_FILE: &str = "SKILL.md";

const FENCE: &str = "---";

pub const REQUIRED_FIELDS: [&str; 2] = ["name", "description"];
pub const OPTIONAL_FIELDS: [&str; 2] = ["allowed-tools", "priority"];

/// Raw header as written by the author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ManifestHeader {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<AllowedTools>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// `allowed-tools` may be written inline (`Read Grep, Bash(git:*)`) or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowedTools {
    Inline(String),
    List(Vec<String>),
}

impl ManifestHeader {
    /// Declared restrictions in declaration order, duplicates removed.
    /// `None` means the bundle is unrestricted.
    pub fn restrictions(&self) -> Option<Vec<String>> {
        let tokens: Vec<String> = match self.allowed_tools.as_ref()? {
            AllowedTools::Inline(s) => split_inline_tools(s),
            AllowedTools::List(items) => items
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        };
        let mut ordered: Vec<String> = Vec::with_capacity(tokens.len());
        for token in tokens {
            if !ordered.contains(&token) {
                ordered.push(token);
            }
        }
        Some(ordered)
    }

    pub fn priority(&self) -> i32 {
        self.priority.unwrap_or(0)
    }
}

/// Split an inline tool list on whitespace/commas, keeping `(...)` scopes intact.
fn split_inline_tools(value: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in value.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if (c.is_whitespace() || c == ',') && depth == 0 => {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        tokens.push(current.trim().to_string());
    }
    tokens
}

/// Tool id of a restriction token: `Bash(git status)` -> `Bash`.
pub fn restriction_tool_id(token: &str) -> &str {
    match token.find('(') {
        Some(idx) => token[..idx].trim(),
        None => token.trim(),
    }
}

/// Read only the header block of a manifest, stopping at the closing fence.
///
/// Cost is bounded by `max_header_lines` regardless of how large the body is.
pub fn read_header(path: &Path, max_header_lines: usize) -> Result<String, ParseError> {
    let file = File::open(path).map_err(|e| {
        let kind = if e.kind() == std::io::ErrorKind::NotFound {
            ParseErrorKind::MissingManifest
        } else {
            ParseErrorKind::Io
        };
        ParseError::new(kind, path, format!("failed to open manifest: {}", e))
    })?;
    let mut reader = BufReader::new(file);

    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| ParseError::new(ParseErrorKind::Io, path, e.to_string()))?;
    if read == 0 || trim_line_ending(&line) != FENCE {
        return Err(missing_header(path));
    }

    let mut header = String::new();
    for _ in 0..max_header_lines {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .map_err(|e| ParseError::new(ParseErrorKind::Io, path, e.to_string()))?;
        if read == 0 {
            return Err(unterminated_header(path));
        }
        if trim_line_ending(&line) == FENCE {
            return Ok(header);
        }
        header.push_str(trim_line_ending(&line));
        header.push('\n');
    }
    Err(ParseError::new(
        ParseErrorKind::Malformed,
        path,
        format!("header exceeds {} lines", max_header_lines),
    ))
}

/// Split a full manifest into `(header, body)`.
pub fn split_manifest(
    text: &str,
    path: &Path,
    max_header_lines: usize,
) -> Result<(String, String), ParseError> {
    let normalized = text.replace("\r\n", "\n");
    let mut lines = normalized.split('\n');
    if lines.next() != Some(FENCE) {
        return Err(missing_header(path));
    }

    let mut header = String::new();
    let mut closed = false;
    for (count, line) in (&mut lines).enumerate() {
        if line == FENCE {
            closed = true;
            break;
        }
        if count >= max_header_lines {
            return Err(ParseError::new(
                ParseErrorKind::Malformed,
                path,
                format!("header exceeds {} lines", max_header_lines),
            ));
        }
        header.push_str(line);
        header.push('\n');
    }
    if !closed {
        return Err(unterminated_header(path));
    }
    let body = lines.collect::<Vec<_>>().join("\n");
    Ok((header, body))
}

/// Parse header YAML against the closed schema.
pub fn parse_header(header: &str, path: &Path) -> Result<ManifestHeader, ParseError> {
    let value: serde_yaml::Value = if header.trim().is_empty() {
        serde_yaml::Value::Null
    } else {
        serde_yaml::from_str(header).map_err(|e| {
            ParseError::new(ParseErrorKind::Malformed, path, format!("invalid YAML: {}", e))
        })?
    };

    let mapping = match value {
        serde_yaml::Value::Mapping(m) => m,
        serde_yaml::Value::Null => serde_yaml::Mapping::new(),
        _ => {
            return Err(ParseError::new(
                ParseErrorKind::Malformed,
                path,
                "header must be a YAML mapping",
            ))
        }
    };

    for key in mapping.keys() {
        let key = match key.as_str() {
            Some(k) => k,
            None => {
                return Err(ParseError::new(
                    ParseErrorKind::Malformed,
                    path,
                    "header keys must be strings",
                ))
            }
        };
        if !REQUIRED_FIELDS.contains(&key) && !OPTIONAL_FIELDS.contains(&key) {
            return Err(ParseError::new(
                ParseErrorKind::UnknownField,
                path,
                format!(
                    "'{}' is not a recognized header field (allowed: name, description, allowed-tools, priority)",
                    key
                ),
            )
            .with_field(key));
        }
    }
    for field in REQUIRED_FIELDS {
        if !mapping.contains_key(field) {
            return Err(ParseError::new(
                ParseErrorKind::MissingField,
                path,
                format!("required header field '{}' is missing", field),
            )
            .with_field(field));
        }
    }

    serde_yaml::from_value(serde_yaml::Value::Mapping(mapping)).map_err(|e| {
        ParseError::new(
            ParseErrorKind::Malformed,
            path,
            format!("invalid header value: {}", e),
        )
    })
}

fn missing_header(path: &Path) -> ParseError {
    ParseError::new(
        ParseErrorKind::MissingHeader,
        path,
        "manifest must start with a '---' header fence",
    )
}

fn unterminated_header(path: &Path) -> ParseError {
    ParseError::new(
        ParseErrorKind::UnterminatedHeader,
        path,
        "header is missing its closing '---' fence",
    )
}

fn trim_line_ending(line: &str) -> &str {
    line.trim_end_matches(|c| c == '\n' || c == '\r')
}
