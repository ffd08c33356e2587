use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Gimpa Assist
#[derive(Error, Debug)]
pub enum GimpaError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid request input (maps to HTTP 400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Source document unreadable when an index build is required
    #[error("Source document unavailable at {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file exists at the index path but cannot be deserialized
    #[error("Index corrupt: {0}")]
    IndexCorrupt(String),

    /// Embedding API errors
    #[error("Embedding API error: {0}")]
    Embedding(String),

    /// Chat completion API errors
    #[error("Completion API error: {0}")]
    Completion(String),
}

/// Convenient Result type using GimpaError
pub type Result<T> = std::result::Result<T, GimpaError>;
