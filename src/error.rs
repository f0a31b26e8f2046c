//! Error types for bundle parsing, index lookups, and activation discipline.
//!
//! Each concern owns a small `thiserror` enum. `ApiError` is the umbrella used
//! at the outer surfaces (CLI, gateway) and converts from all of them.
//!
//! Restriction and script-read denials are deliberately absent here: they are
//! ordinary results (`execution::ActionCheck::Deny`), not errors.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Classification of a bundle parse/validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    /// The bundle directory has no `SKILL.md`
    MissingManifest,
    /// `SKILL.md` does not open with a `---` header fence
    MissingHeader,
    /// The header fence is never closed
    UnterminatedHeader,
    /// Header is not a YAML mapping, has a wrong value type, or is too long
    Malformed,
    /// Header carries a field outside the closed schema
    UnknownField,
    /// A required header field is absent
    MissingField,
    /// `name` violates the naming rules
    NameFormat,
    /// `description` violates the content policy
    DescriptionFormat,
    /// Body exceeds the line ceiling
    SizeLimit,
    /// Filesystem read failure
    Io,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParseErrorKind::MissingManifest => "missing manifest",
            ParseErrorKind::MissingHeader => "missing header",
            ParseErrorKind::UnterminatedHeader => "unterminated header",
            ParseErrorKind::Malformed => "malformed header",
            ParseErrorKind::UnknownField => "unknown field",
            ParseErrorKind::MissingField => "missing field",
            ParseErrorKind::NameFormat => "invalid name",
            ParseErrorKind::DescriptionFormat => "invalid description",
            ParseErrorKind::SizeLimit => "size limit exceeded",
            ParseErrorKind::Io => "io error",
        };
        f.write_str(s)
    }
}

/// Structured bundle failure: what went wrong, on which field, where.
///
/// Authoring tools consume these directly to drive repair without re-parsing,
/// so the fields are public and serializable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind} in {}{}: {message}", .location.display(), field_suffix(.field))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub field: Option<String>,
    pub location: PathBuf,
    pub message: String,
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(f) => format!(" (field `{}`)", f),
        None => String::new(),
    }
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, location: &Path, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            location: location.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// True for name/description content-policy failures.
    pub fn is_content_policy(&self) -> bool {
        matches!(
            self.kind,
            ParseErrorKind::NameFormat | ParseErrorKind::DescriptionFormat
        )
    }
}

/// Capability index lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("skill not found: {name}")]
    NotFound { name: String },

    #[error(transparent)]
    Load(#[from] ParseError),
}

/// Activation discipline failures. These indicate a bug in the calling layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("skill '{name}' is already active in execution unit {unit}")]
    AlreadyActive { name: String, unit: String },

    #[error(
        "cannot deactivate '{requested}': innermost active skill is {}",
        .innermost.as_deref().unwrap_or("<none>")
    )]
    StackDiscipline {
        requested: String,
        innermost: Option<String>,
    },

    #[error("activation depth limit of {max} reached")]
    DepthExceeded { max: usize },
}

/// Crate-level error umbrella.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error("skill not found: {name}{}", suggestion_suffix(.suggestion))]
    SkillNotFound {
        name: String,
        suggestion: Option<String>,
    },

    #[error("skill '{0}' is not active in this execution unit")]
    NotActive(String),

    #[error("resource path escapes the bundle directory: {0}")]
    InvalidResourcePath(String),

    #[error("bundle already exists at {}", .0.display())]
    BundleExists(PathBuf),

    #[error("IO error: {0}")]
    Io(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
