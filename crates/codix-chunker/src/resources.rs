//! Per-language parser cache with probe-once construction.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::Serialize;
use tree_sitter::{Language, Parser};

use crate::error::{ChunkError, Result};
use crate::languages::Lang;
use crate::probe::ShapeCache;
use crate::query_exec::CompiledQuery;

/// Ways a parser for a language can be constructed, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstructionShape {
    /// The language's primary grammar export.
    Bundled,
    /// A compatible secondary export (TSX for TypeScript, C++ for C).
    Alternate,
}

impl ConstructionShape {
    pub const PRIORITY: [Self; 2] = [Self::Bundled, Self::Alternate];
}

impl std::fmt::Display for ConstructionShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Bundled => "bundled",
            Self::Alternate => "alternate",
        })
    }
}

/// Source of parsers. Implementations must be deterministic for a given
/// `(lang, shape)` pair.
pub trait GrammarBackend: Send {
    /// Build a parser with its language assigned.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::Grammar`] if this shape cannot produce a working parser.
    fn construct(&self, lang: Lang, shape: ConstructionShape) -> Result<(Parser, Language)>;

    /// Shapes to probe, in priority order.
    fn shapes(&self) -> &[ConstructionShape] {
        &ConstructionShape::PRIORITY
    }
}

/// Backend over the grammars compiled into this build.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterBackend;

impl GrammarBackend for TreeSitterBackend {
    fn construct(&self, lang: Lang, shape: ConstructionShape) -> Result<(Parser, Language)> {
        let language = match shape {
            ConstructionShape::Bundled => lang.grammar(),
            ConstructionShape::Alternate => lang.alternate_grammar(),
        }
        .ok_or_else(|| ChunkError::Grammar(format!("no {shape} grammar for {lang}")))?;

        let abi = language.abi_version();
        if !(tree_sitter::MIN_COMPATIBLE_LANGUAGE_VERSION..=tree_sitter::LANGUAGE_VERSION)
            .contains(&abi)
        {
            return Err(ChunkError::Grammar(format!(
                "{lang} grammar ABI {abi} outside supported range {}..={}",
                tree_sitter::MIN_COMPATIBLE_LANGUAGE_VERSION,
                tree_sitter::LANGUAGE_VERSION
            )));
        }

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ChunkError::Grammar(format!("set_language failed: {e}")))?;
        parser
            .parse("", None)
            .ok_or_else(|| ChunkError::Grammar(format!("{lang} smoke parse failed")))?;

        Ok((parser, language))
    }
}

/// A live parser for one language. Owned by [`ParserResourceManager`].
pub(crate) struct ResourceHandle {
    pub(crate) lang: Lang,
    pub(crate) parser: Parser,
    pub(crate) language: Language,
    pub(crate) shape: ConstructionShape,
    /// Compiled on first use.
    pub(crate) query: Option<CompiledQuery>,
}

/// Owns at most one parser handle per language and remembers which construction
/// shape works for each.
///
/// Not shared between threads: give each worker its own manager.
pub struct ParserResourceManager {
    backend: Box<dyn GrammarBackend>,
    handles: HashMap<Lang, ResourceHandle>,
    shapes: ShapeCache<ConstructionShape>,
    construction_attempts: usize,
}

impl Default for ParserResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParserResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut live: Vec<_> = self.handles.keys().copied().collect();
        live.sort();
        f.debug_struct("ParserResourceManager")
            .field("live", &live)
            .field("construction_attempts", &self.construction_attempts)
            .finish_non_exhaustive()
    }
}

impl ParserResourceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(TreeSitterBackend)
    }

    #[must_use]
    pub fn with_backend(backend: impl GrammarBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            handles: HashMap::new(),
            shapes: ShapeCache::new(true),
            construction_attempts: 0,
        }
    }

    /// Make sure a parser for `lang` is live and return the shape it was built with.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::ResourceUnavailable`] if no construction shape works, now
    /// or in an earlier probe.
    pub fn acquire(&mut self, lang: Lang) -> Result<ConstructionShape> {
        self.acquire_handle(lang).map(|h| h.shape)
    }

    pub(crate) fn acquire_handle(&mut self, lang: Lang) -> Result<&mut ResourceHandle> {
        match self.handles.entry(lang) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(slot) => {
                let backend = &self.backend;
                let attempts = &mut self.construction_attempts;
                let (shape, (parser, language)) = self
                    .shapes
                    .run(lang, backend.shapes(), |shape| {
                        *attempts += 1;
                        backend.construct(lang, shape)
                    })
                    .map_err(|e| ChunkError::ResourceUnavailable {
                        lang,
                        reason: e.into_message(),
                    })?;
                tracing::debug!(language = %lang, shape = %shape, "parser constructed");
                Ok(slot.insert(ResourceHandle {
                    lang,
                    parser,
                    language,
                    shape,
                    query: None,
                }))
            }
        }
    }

    /// Drop the handle for `lang` and forget its probe result. Idempotent.
    pub fn release(&mut self, lang: Lang) {
        if self.handles.remove(&lang).is_some() {
            tracing::debug!(language = %lang, "parser released");
        }
        self.shapes.forget(lang);
    }

    /// Release every language.
    pub fn release_all(&mut self) {
        if !self.handles.is_empty() {
            tracing::debug!(count = self.handles.len(), "releasing all parsers");
        }
        self.handles.clear();
        self.shapes.clear();
    }

    /// Drop a handle whose parser may be in a bad state, keeping the remembered shape
    /// so the next acquire rebuilds it without probing.
    pub(crate) fn evict(&mut self, lang: Lang) {
        self.handles.remove(&lang);
    }

    #[must_use]
    pub fn is_live(&self, lang: Lang) -> bool {
        self.handles.contains_key(&lang)
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_unavailable(&self, lang: Lang) -> bool {
        self.shapes.is_unavailable(lang)
    }

    #[must_use]
    pub fn remembered_shape(&self, lang: Lang) -> Option<ConstructionShape> {
        self.shapes.shape(lang)
    }

    /// Total backend construction calls made so far.
    #[must_use]
    pub fn construction_attempts(&self) -> usize {
        self.construction_attempts
    }
}

impl Drop for ParserResourceManager {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Stub {
        broken: Vec<ConstructionShape>,
        calls: Arc<AtomicUsize>,
    }

    impl GrammarBackend for Stub {
        fn construct(&self, lang: Lang, shape: ConstructionShape) -> Result<(Parser, Language)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.broken.contains(&shape) {
                return Err(ChunkError::Grammar(format!("stub rejects {shape}")));
            }
            TreeSitterBackend.construct(lang, ConstructionShape::Bundled)
        }
    }

    fn stub(broken: &[ConstructionShape]) -> (ParserResourceManager, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mgr = ParserResourceManager::with_backend(Stub {
            broken: broken.to_vec(),
            calls: Arc::clone(&calls),
        });
        (mgr, calls)
    }

    #[test]
    fn release_unacquired_and_twice_is_noop() {
        let mut mgr = ParserResourceManager::new();
        mgr.release(Lang::Rust);
        mgr.release(Lang::Rust);
        mgr.release_all();
        assert_eq!(mgr.live_count(), 0);
    }

    #[test]
    fn grammarless_language_marked_unavailable_once() {
        let mut mgr = ParserResourceManager::new();
        let err = mgr.acquire(Lang::Yaml).unwrap_err();
        assert!(matches!(err, ChunkError::ResourceUnavailable { lang: Lang::Yaml, .. }));
        assert!(mgr.is_unavailable(Lang::Yaml));
        let attempts = mgr.construction_attempts();
        assert_eq!(attempts, ConstructionShape::PRIORITY.len());

        assert!(mgr.acquire(Lang::Yaml).is_err());
        assert_eq!(mgr.construction_attempts(), attempts);
    }

    #[cfg(feature = "lang-rust")]
    #[test]
    fn acquire_probes_once_and_reuses_handle() {
        let (mut mgr, calls) = stub(&[]);
        assert_eq!(mgr.acquire(Lang::Rust).unwrap(), ConstructionShape::Bundled);
        assert_eq!(mgr.acquire(Lang::Rust).unwrap(), ConstructionShape::Bundled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(mgr.is_live(Lang::Rust));
    }

    #[cfg(feature = "lang-rust")]
    #[test]
    fn falls_through_to_alternate_shape() {
        let (mut mgr, calls) = stub(&[ConstructionShape::Bundled]);
        assert_eq!(mgr.acquire(Lang::Rust).unwrap(), ConstructionShape::Alternate);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            mgr.remembered_shape(Lang::Rust),
            Some(ConstructionShape::Alternate)
        );
    }

    #[cfg(feature = "lang-rust")]
    #[test]
    fn evict_rebuilds_with_remembered_shape() {
        let (mut mgr, calls) = stub(&[ConstructionShape::Bundled]);
        mgr.acquire(Lang::Rust).unwrap();
        mgr.evict(Lang::Rust);
        assert!(!mgr.is_live(Lang::Rust));
        mgr.acquire(Lang::Rust).unwrap();
        // 2 for the first probe, 1 rebuild.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[cfg(feature = "lang-rust")]
    #[test]
    fn release_then_acquire_reprobes() {
        let (mut mgr, calls) = stub(&[ConstructionShape::Bundled]);
        mgr.acquire(Lang::Rust).unwrap();
        mgr.release(Lang::Rust);
        mgr.release(Lang::Rust);
        assert_eq!(mgr.remembered_shape(Lang::Rust), None);
        mgr.acquire(Lang::Rust).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn all_shapes_failing_marks_unavailable() {
        let (mut mgr, calls) = stub(&ConstructionShape::PRIORITY);
        assert!(mgr.acquire(Lang::Go).is_err());
        assert!(mgr.acquire(Lang::Go).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        mgr.release(Lang::Go);
        assert!(!mgr.is_unavailable(Lang::Go));
    }

    #[cfg(all(feature = "lang-rust", feature = "lang-python"))]
    #[test]
    fn release_all_drops_every_handle() {
        let mut mgr = ParserResourceManager::new();
        mgr.acquire(Lang::Rust).unwrap();
        mgr.acquire(Lang::Python).unwrap();
        assert_eq!(mgr.live_count(), 2);
        mgr.release_all();
        assert_eq!(mgr.live_count(), 0);
        assert_eq!(mgr.remembered_shape(Lang::Rust), None);
    }

    #[test]
    fn manager_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ParserResourceManager>();
    }
}
