//! Semantic chunking engine.
//!
//! Turns the text of one source file into bounded, retrievable code blocks. The AST path
//! parses with tree-sitter, runs a per-language capture query and keeps declarations
//! (functions, classes, impls) in source order. Every failure along that path (oversized
//! file, filtered path, unknown language, missing grammar, failed query, nothing found)
//! degrades to line chunking for that file alone, so a chunking call never fails.

pub mod block;
pub mod error;
pub(crate) mod extractor;
pub mod fallback;
pub mod filter;
pub mod languages;
pub(crate) mod probe;
pub mod queries;
pub(crate) mod query_exec;
pub mod resources;
pub mod selector;
pub(crate) mod source;

pub use block::{
    BlockKind, ChunkingOutcome, ChunkingRequest, CodeBlock, FilterFlags, Limits, Strategy,
};
pub use error::{ChunkError, FallbackReason, Result};
pub use fallback::FallbackConfig;
pub use filter::FilterPolicy;
pub use languages::{Lang, LanguageProfile, PROFILES, resolve, resolve_with_content};
pub use resources::{ConstructionShape, GrammarBackend, ParserResourceManager, TreeSitterBackend};
pub use selector::{Chunker, ChunkerConfig, ChunkerStats};
