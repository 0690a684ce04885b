//! Line- and token-window chunkers used when AST extraction is skipped or fails.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::block::{BlockKind, CodeBlock, Limits};
use crate::source::SourceLines;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+|[^\w\s]").unwrap());

/// Upper bound tolerance over `line_max_chars`, in percent.
const LINE_TOLERANCE_PCT: usize = 115;

fn default_line_max_chars() -> usize {
    1000
}

fn default_token_chunk_size() -> usize {
    1000
}

fn default_token_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_line_max_chars")]
    pub line_max_chars: usize,
    /// Tokens per window.
    #[serde(default = "default_token_chunk_size")]
    pub token_chunk_size: usize,
    /// Tokens shared between consecutive windows.
    #[serde(default = "default_token_chunk_overlap")]
    pub token_chunk_overlap: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            line_max_chars: default_line_max_chars(),
            token_chunk_size: default_token_chunk_size(),
            token_chunk_overlap: default_token_chunk_overlap(),
        }
    }
}

impl FallbackConfig {
    /// Character count at which a line block is cut regardless of the minimum.
    #[must_use]
    pub fn line_upper_bound(&self) -> usize {
        (self.line_max_chars.saturating_mul(LINE_TOLERANCE_PCT) / 100).max(1)
    }
}

fn generic_block(path: &str, lines: &SourceLines<'_>, start: usize, end: usize) -> Option<CodeBlock> {
    let text = lines.slice(start, end);
    if text.trim().is_empty() {
        return None;
    }
    Some(CodeBlock {
        path: path.to_owned(),
        start_line: start,
        end_line: end,
        kind: BlockKind::Generic,
        name: None,
        text: text.to_owned(),
    })
}

/// Split `content` into runs of whole lines.
///
/// A block is cut once it reaches the upper bound, or when the next line would push it
/// past the bound and it already holds `min_block_chars`. The remainder is always emitted.
/// Output stops at `max_blocks_per_file` blocks.
#[must_use]
pub fn line_chunk(
    path: &str,
    content: &str,
    limits: &Limits,
    config: &FallbackConfig,
) -> Vec<CodeBlock> {
    let lines = SourceLines::new(content);
    let upper = config.line_upper_bound();
    let min_block_chars = limits.min_block_chars;
    let max_blocks = limits.max_blocks_per_file;
    let mut blocks = Vec::new();
    let mut start = 1;
    let mut len = 0;

    for n in 1..=lines.total_lines() {
        if blocks.len() >= max_blocks {
            break;
        }
        let line_len = lines.line(n).chars().count() + 1;
        if n > start && len + line_len > upper && len >= min_block_chars {
            blocks.extend(generic_block(path, &lines, start, n - 1));
            start = n;
            len = 0;
        }
        len += line_len;
        if len >= upper {
            blocks.extend(generic_block(path, &lines, start, n));
            start = n + 1;
            len = 0;
        }
    }
    if blocks.len() < max_blocks && start <= lines.total_lines() {
        blocks.extend(generic_block(path, &lines, start, lines.total_lines()));
    }
    blocks.truncate(max_blocks);
    blocks
}

/// Split `content` into overlapping token windows, each widened to the whole lines it
/// touches. Consecutive windows that land on the same lines are emitted once. Output
/// stops at `max_blocks_per_file` blocks.
#[must_use]
pub fn token_chunk(
    path: &str,
    content: &str,
    limits: &Limits,
    config: &FallbackConfig,
) -> Vec<CodeBlock> {
    let tokens: Vec<(usize, usize)> = TOKEN_RE
        .find_iter(content)
        .map(|m| (m.start(), m.end()))
        .collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let lines = SourceLines::new(content);
    let size = config.token_chunk_size.max(1);
    let step = size.saturating_sub(config.token_chunk_overlap).max(1);
    let mut blocks: Vec<CodeBlock> = Vec::new();
    let mut start = 0;

    while blocks.len() < limits.max_blocks_per_file {
        let end = (start + size).min(tokens.len());
        let first_line = lines.line_of(tokens[start].0);
        let last_line = lines.line_of(tokens[end - 1].1 - 1);
        let repeat = blocks
            .last()
            .is_some_and(|b| b.start_line == first_line && b.end_line == last_line);
        if !repeat {
            blocks.extend(generic_block(path, &lines, first_line, last_line));
        }
        if end == tokens.len() {
            break;
        }
        start += step;
    }
    blocks
}
