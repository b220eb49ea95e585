//! Error types for primer-dimer screening

use thiserror::Error;

/// Result type alias for screening operations
pub type Result<T> = std::result::Result<T, ScreenError>;

/// Errors raised by the screening core and its ingestion layer
#[derive(Debug, Error)]
pub enum ScreenError {
    /// A sequence contains a character outside {A, T, C, G}
    #[error("Invalid base '{base}' at position {position}")]
    InvalidBase {
        /// Offending character
        base: char,
        /// Zero-based position within the sequence
        position: usize,
    },

    /// A parameter is outside its accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A positional hash does not fit the table sized for the key length
    #[error("Hash of a {len}-base key does not fit a table of {table_size} buckets")]
    HashOverflow {
        /// Length of the hashed sequence
        len: usize,
        /// Number of buckets in the target table
        table_size: usize,
    },

    /// A primer failed validation during ingestion
    #[error("Primer '{name}': {source}")]
    InvalidPrimer {
        name: String,
        #[source]
        source: Box<ScreenError>,
    },

    /// Malformed line in a delimited primer table
    #[error("Parse error at line {line}: {msg}")]
    ParseError { line: usize, msg: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScreenError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
