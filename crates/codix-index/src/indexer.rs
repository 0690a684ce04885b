//! Project indexing orchestrator: walk → chunk → emit.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use codix_chunker::{
    BlockKind, Chunker, ChunkingOutcome, ChunkingRequest, CodeBlock, FallbackReason, FilterFlags,
    Limits, Strategy,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scanner::{ScanOptions, Scanned, Scanner};

/// Per-request settings applied to every file of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexerConfig {
    pub limits: Limits,
    pub filter_flags: FilterFlags,
    pub strategy: Strategy,
    pub scan: ScanOptions,
}

/// One output record: a block plus the file-level metadata a downstream store needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPayload {
    pub file_path: String,
    pub language: Option<String>,
    pub kind: BlockKind,
    pub name: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub strategy: Strategy,
    pub content_hash: String,
    /// blake3 of the whole file, for change detection.
    pub file_hash: String,
    pub text: String,
}

impl BlockPayload {
    #[must_use]
    pub fn new(block: &CodeBlock, outcome: &ChunkingOutcome, file_hash: &str) -> Self {
        Self {
            file_path: block.path.clone(),
            language: outcome.language.map(|l| l.id().to_owned()),
            kind: block.kind,
            name: block.name.clone(),
            start_line: block.start_line,
            end_line: block.end_line,
            strategy: outcome.strategy_used,
            content_hash: block.content_hash(),
            file_hash: file_hash.to_owned(),
            text: block.text.clone(),
        }
    }
}

/// Destination for payload records.
pub trait BlockSink {
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn accept(&mut self, payload: BlockPayload) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if buffered output cannot be flushed.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BlockSink for JsonLinesSink<W> {
    fn accept(&mut self, payload: BlockPayload) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &payload)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every payload in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub payloads: Vec<BlockPayload>,
}

impl BlockSink for CollectSink {
    fn accept(&mut self, payload: BlockPayload) -> Result<()> {
        self.payloads.push(payload);
        Ok(())
    }
}

/// Summary of an indexing run.
#[derive(Debug, Default, Serialize)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub files_chunked: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub blocks_emitted: usize,
    pub by_strategy: BTreeMap<String, usize>,
    pub fallbacks: BTreeMap<FallbackReason, usize>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl IndexReport {
    fn record(&mut self, outcome: &ChunkingOutcome) {
        self.blocks_emitted += outcome.blocks.len();
        if outcome.is_failure() {
            self.files_failed += 1;
        } else {
            self.files_chunked += 1;
        }
        *self
            .by_strategy
            .entry(outcome.strategy_used.to_string())
            .or_default() += 1;
        if let Some(reason) = outcome.fallback_reason {
            *self.fallbacks.entry(reason).or_default() += 1;
        }
    }
}

/// Drives a [`Chunker`] over a project tree.
pub struct CodeIndexer {
    chunker: Chunker,
    config: IndexerConfig,
}

impl CodeIndexer {
    #[must_use]
    pub fn new(chunker: Chunker, config: IndexerConfig) -> Self {
        Self { chunker, config }
    }

    #[must_use]
    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Chunk a single in-memory file and hand its blocks to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the sink rejects a record.
    pub fn index_file(
        &mut self,
        rel_path: &str,
        content: &[u8],
        sink: &mut dyn BlockSink,
    ) -> Result<ChunkingOutcome> {
        let request = ChunkingRequest::new(Path::new(rel_path), content)
            .with_limits(self.config.limits)
            .with_filter_flags(self.config.filter_flags)
            .with_strategy(self.config.strategy);
        let outcome = self.chunker.chunk(&request);

        let file_hash = blake3::hash(content).to_hex().to_string();
        for block in &outcome.blocks {
            sink.accept(BlockPayload::new(block, &outcome, &file_hash))?;
        }
        Ok(outcome)
    }

    /// Walk `root`, chunk every readable text file and emit its blocks.
    ///
    /// Per-file read errors are collected in the report; parser resources are
    /// released when the walk ends.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory or the sink fails.
    pub fn index_project(&mut self, root: &Path, sink: &mut dyn BlockSink) -> Result<IndexReport> {
        let start = std::time::Instant::now();
        let mut report = IndexReport::default();

        let scanner = Scanner::new(root, self.config.scan)?;
        let entries = scanner.files();
        let total = entries.len();
        tracing::info!(total, "indexing started");

        let result = self.index_entries(&scanner, &entries, sink, &mut report);
        self.chunker.release_all();
        result?;
        sink.finish()?;

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            files = report.files_chunked,
            blocks = report.blocks_emitted,
            skipped = report.files_skipped,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "indexing complete"
        );
        Ok(report)
    }

    fn index_entries(
        &mut self,
        scanner: &Scanner,
        entries: &[std::path::PathBuf],
        sink: &mut dyn BlockSink,
        report: &mut IndexReport,
    ) -> Result<()> {
        let total = entries.len();
        for (i, path) in entries.iter().enumerate() {
            report.files_scanned += 1;
            let file = match scanner.read(path) {
                Ok(Scanned::File(file)) => file,
                Ok(Scanned::Skipped { rel_path, reason }) => {
                    tracing::debug!(file = %rel_path, %reason, "skipped");
                    report.files_skipped += 1;
                    continue;
                }
                Err(e) => {
                    let rel_path = scanner.relative_path(path);
                    tracing::warn!(file = %rel_path, "failed to read: {e:#}");
                    report.errors.push(format!("{rel_path}: {e:#}"));
                    continue;
                }
            };

            let outcome = self.index_file(&file.rel_path, &file.content, sink)?;
            report.record(&outcome);
            tracing::info!(
                file = %file.rel_path,
                progress = format_args!("{}/{total}", i + 1),
                strategy = %outcome.strategy_used,
                blocks = outcome.blocks.len(),
                "chunked"
            );
        }
        Ok(())
    }
}
