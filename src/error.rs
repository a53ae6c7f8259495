//! Error types for serialscope.
//!
//! Only transport failures are meant to reach the user. Decode noise and
//! field-count mismatches never become errors; they are absorbed by the
//! ingestion pipeline (see [`crate::ingest::LineOutcome`]).

use thiserror::Error;

/// Result type alias for serialscope operations.
pub type Result<T> = std::result::Result<T, ScopeError>;

#[derive(Debug, Error)]
pub enum ScopeError {
    /// The byte source could not be opened or failed while streaming.
    #[error("transport failure on '{address}': {source}")]
    Transport {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading or writing a settings file failed.
    #[error("settings file {path}: {source}")]
    ConfigIo {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A settings file is not valid JSON for [`crate::config::ScopeConfig`].
    #[error("settings file format: {0}")]
    ConfigFormat(#[from] serde_json::Error),

    /// `select_column` named a column that is not in the schema.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// A scale mode string could not be understood.
    #[error("invalid scale mode '{0}' (expected 'Auto' or '±<value>')")]
    InvalidScaleMode(String),

    /// A record was folded into a window sized for a different schema.
    #[error("record has {found} fields but the window holds {expected} columns")]
    RecordWidth { expected: usize, found: usize },
}
