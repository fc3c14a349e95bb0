//! Error types with fix suggestions (v0.1)

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostic::Diagnostic;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Fatal linker errors.
///
/// Per-declaration and per-binding problems are [`Diagnostic`]s, not errors;
/// they only surface here once merged into [`LinkError::UnresolvedBindings`].
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ─────────────────────────────────────────────────────────────
    // Registry store (LINK-010 to LINK-013)
    // ─────────────────────────────────────────────────────────────

    #[error("LINK-010: Malformed registry line {line_no}: '{line}' ({reason})")]
    MalformedRegistry {
        line_no: usize,
        line: String,
        reason: String,
    },

    #[error("LINK-011: Unknown binding kind '{kind}'")]
    UnknownBindingKind { kind: String },

    #[error("LINK-012: Registry file '{}' is not valid UTF-8", .path.display())]
    RegistryEncoding { path: PathBuf },

    #[error("LINK-013: Implementation version must be a single non-empty line, got {version:?}")]
    InvalidVersion { version: String },

    // ─────────────────────────────────────────────────────────────
    // Declaration input (LINK-020 to LINK-021)
    // ─────────────────────────────────────────────────────────────

    #[error("LINK-020: Invalid type reference '{text}': {reason}")]
    InvalidTypeRef { text: String, reason: String },

    #[error("LINK-021: Cannot read compilation unit '{}': {source}", .path.display())]
    UnitParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    // ─────────────────────────────────────────────────────────────
    // Pass outcome (LINK-030)
    // ─────────────────────────────────────────────────────────────

    #[error("LINK-030: Unresolved API bindings:\n{}", .messages.join("\n"))]
    UnresolvedBindings {
        messages: Vec<String>,
        /// Positioned diagnostics reported by the same pass
        diagnostics: Vec<Diagnostic>,
    },

    // ─────────────────────────────────────────────────────────────
    // Configuration (LINK-040)
    // ─────────────────────────────────────────────────────────────

    #[error("LINK-040: Invalid configuration: {details}")]
    InvalidConfig { details: String },
}

impl FixSuggestion for LinkError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            LinkError::Io(_) => Some("Check the registry path and its permissions"),
            LinkError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            LinkError::MalformedRegistry { .. } => {
                Some("Delete the registry file and rebuild all modules from scratch")
            }
            LinkError::UnknownBindingKind { .. } => {
                Some("Valid kinds are SERVICE, PROVIDES, PROVIDED and TWO_WAY")
            }
            LinkError::RegistryEncoding { .. } => {
                Some("Delete the registry file and rebuild all modules from scratch")
            }
            LinkError::InvalidVersion { .. } => {
                Some("Pass a one-line version such as --impl-version 21.0.4-b509")
            }
            LinkError::InvalidTypeRef { .. } => {
                Some("Use a primitive, void, a binary class name, or append [] for arrays")
            }
            LinkError::UnitParse { .. } => {
                Some("Each unit needs a 'declarations' list of type/method/field entries")
            }
            LinkError::UnresolvedBindings { .. } => {
                Some("Fix the reported bindings; the registry was already updated")
            }
            LinkError::InvalidConfig { .. } => {
                Some("Pass --registry and one of --impl-version or --version-file")
            }
        }
    }
}
