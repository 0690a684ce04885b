//! Per-file strategy selection: AST extraction with transparent line fallback.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::block::{ChunkingOutcome, ChunkingRequest, CodeBlock, Strategy};
use crate::error::{ChunkError, FallbackReason, Result};
use crate::extractor;
use crate::fallback::{self, FallbackConfig};
use crate::filter::{DEFAULT_SKIP_PATTERNS, FilterPolicy};
use crate::languages::{self, Lang};
use crate::query_exec::QueryAdapter;
use crate::resources::ParserResourceManager;
use crate::source::SourceLines;

/// Engine-wide settings that do not vary per request.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub fallback: FallbackConfig,
    pub skip_patterns: Vec<String>,
    /// Languages allowed on the AST path. Empty means all.
    pub enabled_languages: Vec<Lang>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackConfig::default(),
            skip_patterns: DEFAULT_SKIP_PATTERNS.iter().map(|s| (*s).to_owned()).collect(),
            enabled_languages: Vec::new(),
        }
    }
}

/// Running counters over every `chunk` call. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChunkerStats {
    pub files: usize,
    pub failed: usize,
    pub blocks: usize,
    pub by_strategy: BTreeMap<String, usize>,
    pub fallbacks: BTreeMap<FallbackReason, usize>,
}

impl ChunkerStats {
    fn record(&mut self, outcome: &ChunkingOutcome) {
        self.files += 1;
        self.blocks += outcome.blocks.len();
        if outcome.is_failure() {
            self.failed += 1;
        }
        *self
            .by_strategy
            .entry(outcome.strategy_used.to_string())
            .or_default() += 1;
        if let Some(reason) = outcome.fallback_reason {
            *self.fallbacks.entry(reason).or_default() += 1;
        }
    }

    #[must_use]
    pub fn fallback_count(&self, reason: FallbackReason) -> usize {
        self.fallbacks.get(&reason).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn strategy_count(&self, strategy: Strategy) -> usize {
        self.by_strategy.get(strategy.as_str()).copied().unwrap_or(0)
    }
}

/// Single-file chunking entry point. Owns its parser cache; use one per thread.
#[derive(Debug)]
pub struct Chunker {
    config: ChunkerConfig,
    filter: FilterPolicy,
    resources: ParserResourceManager,
    queries: QueryAdapter,
    stats: ChunkerStats,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self::with_resources(config, ParserResourceManager::new())
    }

    /// Use a caller-built resource manager, e.g. one over a custom grammar backend.
    #[must_use]
    pub fn with_resources(config: ChunkerConfig, resources: ParserResourceManager) -> Self {
        Self {
            filter: FilterPolicy::new(&config.skip_patterns),
            config,
            resources,
            queries: QueryAdapter::new(),
            stats: ChunkerStats::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> &ChunkerStats {
        &self.stats
    }

    #[must_use]
    pub fn resources(&self) -> &ParserResourceManager {
        &self.resources
    }

    /// Tear down every cached parser and forget all probed shapes.
    pub fn release_all(&mut self) {
        self.resources.release_all();
        self.queries.clear();
    }

    /// Release one language so the next file in it re-probes from scratch.
    pub fn release(&mut self, lang: Lang) {
        self.resources.release(lang);
        self.queries.forget(lang);
    }

    /// Language the AST path would use for this file, honoring the enabled list.
    #[must_use]
    pub fn resolve(&self, path: &Path, content: &str) -> Option<Lang> {
        let lang = languages::resolve_with_content(path, content)?;
        let enabled = &self.config.enabled_languages;
        (enabled.is_empty() || enabled.contains(&lang)).then_some(lang)
    }

    /// Chunk one file. Never fails: every AST problem becomes a line-chunked outcome
    /// with its reason, and undecodable content becomes an empty outcome.
    pub fn chunk(&mut self, request: &ChunkingRequest<'_>) -> ChunkingOutcome {
        let path = request.display_path();
        let outcome = match std::str::from_utf8(request.content) {
            Ok(content) => self.chunk_text(request, &path, content),
            Err(e) => {
                let err = ChunkError::from(e);
                tracing::warn!(path = %path, error = %err, "skipping undecodable file");
                ChunkingOutcome {
                    blocks: Vec::new(),
                    strategy_used: request.strategy,
                    fallback_reason: Some(err.reason()),
                    language: languages::resolve(request.path),
                }
            }
        };
        self.stats.record(&outcome);
        outcome
    }

    fn chunk_text(
        &mut self,
        request: &ChunkingRequest<'_>,
        path: &str,
        content: &str,
    ) -> ChunkingOutcome {
        let language = self.resolve(request.path, content);
        match request.strategy {
            Strategy::Line => self.line_outcome(request, path, content, language, None),
            Strategy::Token => ChunkingOutcome {
                blocks: fallback::token_chunk(path, content, &request.limits, &self.config.fallback),
                strategy_used: Strategy::Token,
                fallback_reason: None,
                language,
            },
            Strategy::Ast => match self.try_ast(request, path, content, language) {
                Ok(blocks) => {
                    tracing::debug!(path, language = ?language, blocks = blocks.len(), "ast chunked");
                    ChunkingOutcome {
                        blocks,
                        strategy_used: Strategy::Ast,
                        fallback_reason: None,
                        language,
                    }
                }
                Err(err) => {
                    let reason = err.reason();
                    if reason == FallbackReason::QueryFailed {
                        tracing::warn!(path, reason = %reason, error = %err, "falling back to line chunking");
                    } else {
                        tracing::debug!(path, reason = %reason, error = %err, "falling back to line chunking");
                    }
                    self.line_outcome(request, path, content, language, Some(reason))
                }
            },
        }
    }

    fn line_outcome(
        &self,
        request: &ChunkingRequest<'_>,
        path: &str,
        content: &str,
        language: Option<Lang>,
        reason: Option<FallbackReason>,
    ) -> ChunkingOutcome {
        ChunkingOutcome {
            blocks: fallback::line_chunk(path, content, &request.limits, &self.config.fallback),
            strategy_used: Strategy::Line,
            fallback_reason: reason,
            language,
        }
    }

    fn try_ast(
        &mut self,
        request: &ChunkingRequest<'_>,
        path: &str,
        content: &str,
        language: Option<Lang>,
    ) -> Result<Vec<CodeBlock>> {
        self.filter.check(
            request.path,
            request.content.len(),
            &request.limits,
            &request.filter_flags,
        )?;
        let lang = language.ok_or(ChunkError::UnsupportedLanguage)?;

        let handle = self.resources.acquire_handle(lang)?;
        let Some(tree) = handle.parser.parse(content, None) else {
            self.resources.evict(lang);
            return Err(ChunkError::QueryExecutionFailed(format!(
                "{lang} parse aborted"
            )));
        };
        let captures = self
            .queries
            .execute(handle, &tree, content, &request.limits)?;

        let lines = SourceLines::new(content);
        let blocks = extractor::extract(&captures, &request.limits, &lines, path);
        if blocks.is_empty() {
            return Err(ChunkError::ZeroBlocksExtracted);
        }
        Ok(blocks)
    }
}
