//! Error types for the worth-core library.

use thiserror::Error;

/// Main error type for the worth library.
#[derive(Error, Debug)]
pub enum WorthError {
    /// Configuration error (bad format rule, delimiter token, selector...).
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors. These are fatal to the call that raised them and are
/// always returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A separator token is not one of the known tokens.
    #[error("unrecognized delimiter token: {0:?}")]
    UnrecognizedDelimiter(String),

    /// A symbol or code is already owned by another format rule.
    #[error("{key:?} already maps to format {existing:?}, cannot register it for {attempted:?}")]
    DuplicateSymbol {
        key: String,
        existing: String,
        attempted: String,
    },

    /// A format rule with the same id is already registered.
    #[error("format {0:?} is already registered")]
    DuplicateFormat(String),

    /// A format rule is structurally invalid.
    #[error("invalid format {id:?}: {reason}")]
    InvalidFormat { id: String, reason: String },

    /// A generated pattern failed to compile.
    #[error("invalid pattern for format {format:?}: {reason}")]
    InvalidPattern { format: String, reason: String },

    /// A site handler selector failed to parse.
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Errors local to one extraction attempt. Logged and skipped, never returned
/// from the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Candidate text was empty.
    #[error("empty candidate text")]
    EmptyText,

    /// No pattern matched.
    #[error("no pattern matched")]
    NoMatch,

    /// Currency symbol or code could not be resolved to a format.
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),

    /// Failed to parse a price component.
    #[error("failed to parse {field}: {value:?}")]
    Parse { field: String, value: String },

    /// Amount does not fit into minor units.
    #[error("amount out of range: {0}")]
    Overflow(String),
}

/// Result type for the worth library.
pub type Result<T> = std::result::Result<T, WorthError>;
