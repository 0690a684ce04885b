//! Turns normalized captures into bounded, source-ordered code blocks.

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::block::{BlockKind, CodeBlock, Limits};
use crate::query_exec::{Capture, NodeSpan};
use crate::source::SourceLines;

struct Candidate {
    span: NodeSpan,
    kind: BlockKind,
    name: Option<String>,
    start_line: usize,
    end_line: usize,
}

/// Build blocks from `captures`.
///
/// Declarations are deduplicated by span, ordered by start line (outer first on ties),
/// capped per category and overall in that order, and finally dropped when shorter than
/// `min_block_chars` after trimming. Nothing is synthesized for the gaps between blocks.
pub(crate) fn extract(
    captures: &[Capture],
    limits: &Limits,
    lines: &SourceLines<'_>,
    path: &str,
) -> Vec<CodeBlock> {
    let content = lines.content();
    let mut seen = HashSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for cap in captures.iter().filter(|c| !c.is_name()) {
        if !seen.insert((cap.span.start_byte, cap.span.end_byte)) {
            continue;
        }
        let Some((start_line, end_line)) =
            lines.node_lines(cap.span.start_row, cap.span.end_row, cap.span.end_column)
        else {
            continue;
        };
        candidates.push(Candidate {
            span: cap.span,
            kind: BlockKind::from_capture(&cap.name),
            name: None,
            start_line,
            end_line,
        });
    }

    let mut names: Vec<&Capture> = captures.iter().filter(|c| c.is_name()).collect();
    names.sort_by_key(|c| c.span.start_byte);
    for name in names {
        let owner = candidates
            .iter_mut()
            .filter(|c| c.span.contains(&name.span))
            .min_by_key(|c| c.span.len());
        if let Some(owner) = owner
            && owner.name.is_none()
            && let Some(text) = content.get(name.span.start_byte..name.span.end_byte)
        {
            owner.name = Some(text.to_owned());
        }
    }

    candidates.sort_by_key(|c| (c.start_line, Reverse(c.span.len()), c.span.start_byte));

    let mut functions = 0;
    let mut classes = 0;
    let mut impls = 0;
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for c in candidates {
        let counter = match c.kind {
            BlockKind::Function | BlockKind::Method => Some(&mut functions),
            BlockKind::Class => Some(&mut classes),
            BlockKind::Impl => Some(&mut impls),
            BlockKind::Module | BlockKind::Generic => None,
        };
        if let Some(counter) = counter {
            let cap = limits.category_cap(c.kind).unwrap_or(usize::MAX);
            if *counter >= cap {
                continue;
            }
            *counter += 1;
        }
        kept.push(c);
    }

    kept.truncate(limits.max_blocks_per_file);

    kept.into_iter()
        .filter_map(|c| {
            let text = lines.slice(c.start_line, c.end_line);
            if text.trim().chars().count() < limits.min_block_chars {
                return None;
            }
            Some(CodeBlock {
                path: path.to_owned(),
                start_line: c.start_line,
                end_line: c.end_line,
                kind: c.kind,
                name: c.name,
                text: text.to_owned(),
            })
        })
        .collect()
}
