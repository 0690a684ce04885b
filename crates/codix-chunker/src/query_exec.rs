//! Query execution with probe-once capture retrieval.

use tree_sitter::{Language, Node, Query, QueryCursor, StreamingIterator, Tree};

use crate::block::Limits;
use crate::error::{ChunkError, Result};
use crate::languages::Lang;
use crate::probe::ShapeCache;
use crate::queries::{self, NAME_CAPTURE};
use crate::resources::ResourceHandle;

/// Bound on in-progress matches per cursor. A query that exceeds it is treated as failed.
const MATCH_LIMIT: u32 = 4096;

/// Generic extraction does not look below this depth.
const GENERIC_MAX_DEPTH: usize = 7;

/// Query compiled for one handle. Compile errors are kept so they are not retried.
pub(crate) enum CompiledQuery {
    Ready(Query),
    Failed(String),
}

/// Ways captures can be pulled out of a query cursor, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueryShape {
    /// Streaming capture list.
    Captures,
    /// Grouped matches flattened to captures.
    Matches,
    /// Matches run once per top-level child byte range.
    Ranged,
}

impl QueryShape {
    pub(crate) const PRIORITY: [Self; 3] = [Self::Captures, Self::Matches, Self::Ranged];
}

/// Position of a captured node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeSpan {
    pub(crate) start_byte: usize,
    pub(crate) end_byte: usize,
    pub(crate) start_row: usize,
    pub(crate) end_row: usize,
    pub(crate) end_column: usize,
}

impl NodeSpan {
    pub(crate) fn of(node: Node<'_>) -> Self {
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_row: node.start_position().row,
            end_row: node.end_position().row,
            end_column: node.end_position().column,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.end_byte - self.start_byte
    }

    pub(crate) fn contains(&self, other: &Self) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }
}

/// A captured node and the name it was captured under, whatever shape produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Capture {
    pub(crate) name: String,
    pub(crate) span: NodeSpan,
}

impl Capture {
    fn new(name: &str, node: Node<'_>) -> Self {
        Self {
            name: name.to_owned(),
            span: NodeSpan::of(node),
        }
    }

    pub(crate) fn is_name(&self) -> bool {
        self.name == NAME_CAPTURE
    }
}

/// Runs catalog queries, remembering per language which retrieval shape works.
#[derive(Debug)]
pub(crate) struct QueryAdapter {
    shapes: ShapeCache<QueryShape>,
}

impl QueryAdapter {
    pub(crate) fn new() -> Self {
        Self {
            shapes: ShapeCache::new(false),
        }
    }

    /// Captures for `tree`. Languages without a catalog query get generic extraction.
    pub(crate) fn execute(
        &mut self,
        handle: &mut ResourceHandle,
        tree: &Tree,
        source: &str,
        limits: &Limits,
    ) -> Result<Vec<Capture>> {
        let lang = handle.lang;
        let Some(text) = queries::query_for(lang) else {
            return Ok(generic_captures(lang, tree.root_node(), source, limits));
        };

        let compiled = handle
            .query
            .get_or_insert_with(|| compile(&handle.language, lang, text));
        let query = match compiled {
            CompiledQuery::Ready(q) => &*q,
            CompiledQuery::Failed(e) => return Err(ChunkError::QueryExecutionFailed(e.clone())),
        };

        let root = tree.root_node();
        self.shapes
            .run(lang, &QueryShape::PRIORITY, |shape| {
                run_shape(shape, query, root, source.as_bytes())
            })
            .map(|(_, captures)| captures)
            .map_err(|e| ChunkError::QueryExecutionFailed(e.into_message()))
    }

    #[cfg(test)]
    pub(crate) fn remembered_shape(&self, lang: Lang) -> Option<QueryShape> {
        self.shapes.shape(lang)
    }

    pub(crate) fn forget(&mut self, lang: Lang) {
        self.shapes.forget(lang);
    }

    pub(crate) fn clear(&mut self) {
        self.shapes.clear();
    }
}

fn compile(language: &Language, lang: Lang, text: &str) -> CompiledQuery {
    match Query::new(language, text) {
        Ok(q) => CompiledQuery::Ready(q),
        Err(e) => {
            tracing::warn!(language = %lang, error = %e, "query failed to compile");
            CompiledQuery::Failed(format!("{lang} query: {e}"))
        }
    }
}

fn run_shape(
    shape: QueryShape,
    query: &Query,
    root: Node<'_>,
    source: &[u8],
) -> std::result::Result<Vec<Capture>, String> {
    let names = query.capture_names();
    let mut out = Vec::new();
    let mut cursor = QueryCursor::new();
    cursor.set_match_limit(MATCH_LIMIT);

    match shape {
        QueryShape::Captures => {
            let mut captures = cursor.captures(query, root, source);
            while let Some((m, idx)) = captures.next() {
                let cap = &m.captures[*idx];
                out.push(Capture::new(names[cap.index as usize], cap.node));
            }
        }
        QueryShape::Matches => {
            let mut matches = cursor.matches(query, root, source);
            while let Some(m) = matches.next() {
                for cap in m.captures {
                    out.push(Capture::new(names[cap.index as usize], cap.node));
                }
            }
        }
        QueryShape::Ranged => {
            let mut walker = root.walk();
            let children: Vec<Node<'_>> = root.children(&mut walker).collect();
            for child in children {
                cursor.set_byte_range(child.byte_range());
                let mut matches = cursor.matches(query, root, source);
                while let Some(m) = matches.next() {
                    for cap in m.captures {
                        out.push(Capture::new(names[cap.index as usize], cap.node));
                    }
                }
                if cursor.did_exceed_match_limit() {
                    break;
                }
            }
        }
    }

    if cursor.did_exceed_match_limit() {
        return Err(format!("{shape:?} exceeded match limit of {MATCH_LIMIT}"));
    }
    Ok(out)
}

fn generic_capture_name(kind: &str) -> &'static str {
    match kind {
        "function_item" | "function_definition" | "function_declaration" => "function",
        "method_declaration" | "method_definition" | "constructor_declaration" => "method",
        "struct_item" | "enum_item" | "trait_item" | "class_definition" | "class_declaration"
        | "interface_declaration" | "type_declaration" | "struct_specifier"
        | "class_specifier" => "class",
        "impl_item" => "impl",
        "mod_item" | "namespace_definition" | "section" | "table" | "table_array_element" => {
            "module"
        }
        _ => "generic",
    }
}

/// Depth-limited walk collecting declaration-shaped nodes in source order.
fn generic_captures(lang: Lang, root: Node<'_>, source: &str, limits: &Limits) -> Vec<Capture> {
    let kinds = lang.declaration_kinds();
    let mut out = Vec::new();
    let mut blocks = 0;
    let mut stack = vec![(root, 0usize)];

    while let Some((node, depth)) = stack.pop() {
        if blocks >= limits.max_blocks_per_file {
            break;
        }
        if kinds.contains(&node.kind()) {
            let text = source.get(node.byte_range()).unwrap_or_default();
            if text.trim().chars().count() >= limits.min_block_chars {
                out.push(Capture::new(generic_capture_name(node.kind()), node));
                if let Some(name) = node.child_by_field_name("name") {
                    out.push(Capture::new(NAME_CAPTURE, name));
                }
                blocks += 1;
            }
        }
        if depth < GENERIC_MAX_DEPTH {
            let mut walker = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut walker).collect();
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
    }

    tracing::trace!(language = %lang, blocks, "generic extraction");
    out
}
