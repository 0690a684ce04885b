//! Chunking data model: requests, limits, blocks and outcomes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FallbackReason;
use crate::languages::Lang;

/// Category of a produced block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Function,
    Method,
    Class,
    Impl,
    Module,
    Generic,
}

impl BlockKind {
    /// Map a capture name (or generic node category) to a block kind.
    #[must_use]
    pub fn from_capture(name: &str) -> Self {
        match name {
            "function" | "arrow_function" | "function_expression" => Self::Function,
            "method" | "constructor" => Self::Method,
            "class" | "struct" | "enum" | "interface" | "trait" | "type" | "object"
            | "union" => Self::Class,
            "impl" => Self::Impl,
            "module" | "namespace" | "mod" | "section" | "table" => Self::Module,
            _ => Self::Generic,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Impl => "impl",
            Self::Module => "module",
            Self::Generic => "generic",
        }
    }

    /// Functions and methods share one per-file cap.
    #[must_use]
    pub fn is_function_like(self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrievable block of source. `text` is always a verbatim run of whole lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub path: String,
    /// 1-indexed, inclusive.
    pub start_line: usize,
    /// 1-indexed, inclusive.
    pub end_line: usize,
    pub kind: BlockKind,
    /// Declared name when the query captured one.
    pub name: Option<String>,
    pub text: String,
}

impl CodeBlock {
    /// Stable identifier within a file, e.g. `function:12`.
    #[must_use]
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.kind, self.start_line)
    }

    /// blake3 hex digest of the block text.
    #[must_use]
    pub fn content_hash(&self) -> String {
        blake3::hash(self.text.as_bytes()).to_hex().to_string()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// Chunking mode requested by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Ast,
    Line,
    Token,
}

impl Strategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ast => "ast",
            Self::Line => "line",
            Self::Token => "token",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ast" | "treesitter" | "tree-sitter" => Ok(Self::Ast),
            "line" | "lines" => Ok(Self::Line),
            "token" | "tokens" => Ok(Self::Token),
            other => Err(format!("unknown chunking strategy `{other}`")),
        }
    }
}

fn default_max_file_size_bytes() -> usize {
    512 * 1024
}

fn default_max_blocks_per_file() -> usize {
    100
}

fn default_max_functions_per_file() -> usize {
    50
}

fn default_max_classes_per_file() -> usize {
    20
}

fn default_max_impl_blocks_per_file() -> usize {
    30
}

fn default_min_block_chars() -> usize {
    50
}

/// Per-file bounds on parsing and extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: usize,
    #[serde(default = "default_max_blocks_per_file")]
    pub max_blocks_per_file: usize,
    #[serde(default = "default_max_functions_per_file")]
    pub max_functions_per_file: usize,
    #[serde(default = "default_max_classes_per_file")]
    pub max_classes_per_file: usize,
    #[serde(default = "default_max_impl_blocks_per_file")]
    pub max_impl_blocks_per_file: usize,
    #[serde(default = "default_min_block_chars")]
    pub min_block_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size_bytes(),
            max_blocks_per_file: default_max_blocks_per_file(),
            max_functions_per_file: default_max_functions_per_file(),
            max_classes_per_file: default_max_classes_per_file(),
            max_impl_blocks_per_file: default_max_impl_blocks_per_file(),
            min_block_chars: default_min_block_chars(),
        }
    }
}

impl Limits {
    /// Cap applying to `kind`, if it has its own category cap.
    #[must_use]
    pub fn category_cap(&self, kind: BlockKind) -> Option<usize> {
        match kind {
            BlockKind::Function | BlockKind::Method => Some(self.max_functions_per_file),
            BlockKind::Class => Some(self.max_classes_per_file),
            BlockKind::Impl => Some(self.max_impl_blocks_per_file),
            BlockKind::Module | BlockKind::Generic => None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Toggles for the filename heuristics of the pre-parse filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterFlags {
    #[serde(default = "default_true")]
    pub skip_test_files: bool,
    #[serde(default = "default_true")]
    pub skip_examples: bool,
}

impl Default for FilterFlags {
    fn default() -> Self {
        Self {
            skip_test_files: true,
            skip_examples: true,
        }
    }
}

/// Everything needed to chunk one file.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingRequest<'a> {
    pub path: &'a Path,
    pub content: &'a [u8],
    pub limits: Limits,
    pub filter_flags: FilterFlags,
    pub strategy: Strategy,
}

impl<'a> ChunkingRequest<'a> {
    /// Request with default limits, default filter flags and the AST strategy.
    #[must_use]
    pub fn new(path: &'a Path, content: &'a [u8]) -> Self {
        Self {
            path,
            content,
            limits: Limits::default(),
            filter_flags: FilterFlags::default(),
            strategy: Strategy::Ast,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_filter_flags(mut self, filter_flags: FilterFlags) -> Self {
        self.filter_flags = filter_flags;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Path as a forward-slash string, used for block paths and glob matching.
    #[must_use]
    pub fn display_path(&self) -> String {
        normalize_path(self.path)
    }
}

pub(crate) fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Result of one chunking call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkingOutcome {
    pub blocks: Vec<CodeBlock>,
    pub strategy_used: Strategy,
    pub fallback_reason: Option<FallbackReason>,
    pub language: Option<Lang>,
}

impl ChunkingOutcome {
    /// True when the file could not be chunked at all and should be counted as failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.fallback_reason == Some(FallbackReason::DecodeFailure)
    }
}
