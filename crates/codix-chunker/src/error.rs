//! Error types for codix-chunker.

use serde::{Deserialize, Serialize};

use crate::languages::Lang;

/// Reasons the AST path can fail. None of them escapes [`crate::Chunker::chunk`]:
/// each one is converted into a fallback outcome carrying its [`FallbackReason`].
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// File exceeds the parse size limit.
    #[error("file too large for AST parsing ({size} > {limit} bytes)")]
    FileTooLarge { size: usize, limit: usize },

    /// Path matched a skip glob or the test/example filename heuristic.
    #[error("filtered by pattern `{0}`")]
    FilteredByPattern(String),

    /// No language profile matched, or the language is not enabled.
    #[error("unsupported language")]
    UnsupportedLanguage,

    /// Every construction shape failed for this language.
    #[error("parser unavailable for {lang}: {reason}")]
    ResourceUnavailable { lang: Lang, reason: String },

    /// A single construction shape failed. Only seen while probing.
    #[error("grammar construction failed: {0}")]
    Grammar(String),

    /// Query compilation or execution failed, or the parse was aborted.
    #[error("query execution failed: {0}")]
    QueryExecutionFailed(String),

    /// AST path succeeded but found no qualifying declarations.
    #[error("no semantic blocks extracted")]
    ZeroBlocksExtracted,

    /// Content is not valid UTF-8.
    #[error("content is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

impl ChunkError {
    /// Observability key for this error.
    #[must_use]
    pub fn reason(&self) -> FallbackReason {
        match self {
            Self::FileTooLarge { .. } => FallbackReason::FileTooLarge,
            Self::FilteredByPattern(_) => FallbackReason::FilteredPattern,
            Self::UnsupportedLanguage => FallbackReason::UnsupportedLanguage,
            Self::ResourceUnavailable { .. } | Self::Grammar(_) => {
                FallbackReason::ResourceUnavailable
            }
            Self::QueryExecutionFailed(_) => FallbackReason::QueryFailed,
            Self::ZeroBlocksExtracted => FallbackReason::ZeroBlocks,
            Self::Decode(_) => FallbackReason::DecodeFailure,
        }
    }
}

/// Why a file did not get AST-derived blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    FileTooLarge,
    FilteredPattern,
    UnsupportedLanguage,
    ResourceUnavailable,
    QueryFailed,
    ZeroBlocks,
    DecodeFailure,
}

impl FallbackReason {
    pub const ALL: [Self; 7] = [
        Self::FileTooLarge,
        Self::FilteredPattern,
        Self::UnsupportedLanguage,
        Self::ResourceUnavailable,
        Self::QueryFailed,
        Self::ZeroBlocks,
        Self::DecodeFailure,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileTooLarge => "file_too_large",
            Self::FilteredPattern => "filtered_pattern",
            Self::UnsupportedLanguage => "unsupported_language",
            Self::ResourceUnavailable => "resource_unavailable",
            Self::QueryFailed => "query_failed",
            Self::ZeroBlocks => "zero_blocks",
            Self::DecodeFailure => "decode_failure",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias using `ChunkError`.
pub type Result<T> = std::result::Result<T, ChunkError>;
