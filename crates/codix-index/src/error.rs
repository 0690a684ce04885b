//! Error types for codix-index.

/// Errors that can occur while scanning or writing output.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source files or writing payloads.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error.
    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Scan root is missing or not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
