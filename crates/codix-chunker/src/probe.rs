//! Probe-once cache for tagged strategy shapes.

use std::collections::HashMap;

use crate::languages::Lang;

#[derive(Debug, Clone)]
enum Probe<S> {
    Resolved(S),
    Unavailable(String),
}

/// Remembers, per language, which of a closed set of shapes worked.
#[derive(Debug)]
pub(crate) struct ShapeCache<S> {
    entries: HashMap<Lang, Probe<S>>,
    remember_failure: bool,
}

/// Why a shape-probed operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProbeError {
    /// The key is marked unavailable from an earlier probe. Not retried.
    Unavailable(String),
    /// Every candidate failed in this probe. Last error wins.
    Exhausted(String),
    /// The remembered shape failed this time.
    ShapeFailed(String),
}

impl ProbeError {
    pub(crate) fn into_message(self) -> String {
        match self {
            Self::Unavailable(m) | Self::Exhausted(m) | Self::ShapeFailed(m) => m,
        }
    }
}

impl<S: Copy + std::fmt::Debug> ShapeCache<S> {
    /// `remember_failure` marks a key unavailable after a full probe fails, so later
    /// calls short-circuit without retrying.
    pub(crate) fn new(remember_failure: bool) -> Self {
        Self {
            entries: HashMap::new(),
            remember_failure,
        }
    }

    pub(crate) fn shape(&self, lang: Lang) -> Option<S> {
        match self.entries.get(&lang) {
            Some(Probe::Resolved(s)) => Some(*s),
            _ => None,
        }
    }

    pub(crate) fn is_unavailable(&self, lang: Lang) -> bool {
        matches!(self.entries.get(&lang), Some(Probe::Unavailable(_)))
    }

    /// Run `attempt` with the remembered shape, or probe `candidates` in order and
    /// remember the first that succeeds.
    pub(crate) fn run<T, E: std::fmt::Display>(
        &mut self,
        lang: Lang,
        candidates: &[S],
        mut attempt: impl FnMut(S) -> Result<T, E>,
    ) -> Result<(S, T), ProbeError> {
        match self.entries.get(&lang) {
            Some(Probe::Resolved(shape)) => {
                let shape = *shape;
                return attempt(shape)
                    .map(|v| (shape, v))
                    .map_err(|e| ProbeError::ShapeFailed(e.to_string()));
            }
            Some(Probe::Unavailable(reason)) => {
                return Err(ProbeError::Unavailable(reason.clone()));
            }
            None => {}
        }

        let mut last = String::from("no candidate shapes");
        for &shape in candidates {
            match attempt(shape) {
                Ok(v) => {
                    tracing::debug!(language = %lang, shape = ?shape, "shape resolved");
                    self.entries.insert(lang, Probe::Resolved(shape));
                    return Ok((shape, v));
                }
                Err(e) => {
                    tracing::debug!(language = %lang, shape = ?shape, error = %e, "shape rejected");
                    last = e.to_string();
                }
            }
        }

        if self.remember_failure {
            self.entries.insert(lang, Probe::Unavailable(last.clone()));
        }
        Err(ProbeError::Exhausted(last))
    }

    pub(crate) fn forget(&mut self, lang: Lang) {
        self.entries.remove(&lang);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
