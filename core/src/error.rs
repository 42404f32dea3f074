//! Error types for rowdelta

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rowdelta operations
pub type Result<T> = std::result::Result<T, RowDeltaError>;

/// Main error type for rowdelta
#[derive(Error, Debug)]
pub enum RowDeltaError {
    /// Old and new headers differ in membership or order
    #[error("Schema mismatch: {detail} (old: [{}], new: [{}])", .old.join(", "), .new.join(", "))]
    SchemaMismatch {
        old: Vec<String>,
        new: Vec<String>,
        detail: String,
    },

    /// Configured observation column is not part of the header
    #[error("Observation column '{column}' not found in header [{}]", .header.join(", "))]
    MissingObservationColumn { column: String, header: Vec<String> },

    /// A row's width does not match its dataset header
    #[error("Malformed row {row_index} in {dataset} dataset: {found} fields, expected {expected}")]
    MalformedRow {
        dataset: String,
        row_index: u64,
        expected: usize,
        found: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{}' at line {line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    /// Broken internal invariant; indicates a bug rather than bad input
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    StdIo(#[from] std::io::Error),
}

impl RowDeltaError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error was raised while loading input, before any reconciliation ran
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Parse { .. } | Self::Csv(_))
    }
}

impl From<toml::de::Error> for RowDeltaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RowDeltaError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(err.to_string())
    }
}
