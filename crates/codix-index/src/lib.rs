//! Repository indexing driver: walk → read → chunk → emit payload records.
//!
//! The scanner walks a tree with gitignore support and hands raw bytes to a
//! [`codix_chunker::Chunker`]; every resulting block becomes one [`BlockPayload`]
//! delivered to a [`BlockSink`].

pub mod error;
pub mod indexer;
pub mod scanner;

pub use error::{IndexError, Result};
pub use indexer::{BlockPayload, BlockSink, CodeIndexer, CollectSink, IndexReport, IndexerConfig, JsonLinesSink};
pub use scanner::{Scanned, ScanOptions, ScannedFile, Scanner, SkipReason};
