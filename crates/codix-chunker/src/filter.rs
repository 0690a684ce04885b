//! Pre-parse filter deciding whether a file is worth AST parsing.

use std::path::Path;

use glob::Pattern;

use crate::block::{FilterFlags, Limits, normalize_path};
use crate::error::ChunkError;

/// Skip globs applied when no list is configured.
pub const DEFAULT_SKIP_PATTERNS: &[&str] = &[
    "*.min.js",
    "*.bundle.js",
    "*.min.css",
    "package-lock.json",
    "yarn.lock",
    "*.lock",
    "target/",
    "build/",
    "dist/",
    "__pycache__/",
    "node_modules/",
    "*.log",
    "*.tmp",
    "*.temp",
];

const TEST_MARKERS: &[&str] = &["test", "tests", "spec"];
const EXAMPLE_MARKERS: &[&str] = &["example", "sample", "demo"];

#[derive(Debug, Clone)]
enum Rule {
    /// Matches when any directory component equals the name.
    Dir(String),
    Glob(Pattern),
}

/// Compiled skip rules. Checks size first, then globs, then filename heuristics.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    rules: Vec<(String, Rule)>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SKIP_PATTERNS.iter().copied())
    }
}

impl FilterPolicy {
    /// Build from skip patterns. A pattern ending in `/` names a directory; anything else
    /// is a glob matched against the full path and the file name. Invalid globs are
    /// ignored with a warning.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for raw in patterns {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            if let Some(dir) = raw.strip_suffix('/') {
                rules.push((raw.to_owned(), Rule::Dir(dir.to_lowercase())));
                continue;
            }
            match Pattern::new(&raw.to_lowercase()) {
                Ok(p) => rules.push((raw.to_owned(), Rule::Glob(p))),
                Err(e) => tracing::warn!(pattern = raw, error = %e, "ignoring invalid skip pattern"),
            }
        }
        Self { rules }
    }

    /// Keep the file for AST parsing, or say why not.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::FileTooLarge`] or [`ChunkError::FilteredByPattern`].
    pub fn check(
        &self,
        path: &Path,
        content_len: usize,
        limits: &Limits,
        flags: &FilterFlags,
    ) -> Result<(), ChunkError> {
        if content_len > limits.max_file_size_bytes {
            return Err(ChunkError::FileTooLarge {
                size: content_len,
                limit: limits.max_file_size_bytes,
            });
        }

        if let Some(pattern) = self.matching_pattern(path) {
            return Err(ChunkError::FilteredByPattern(pattern.to_owned()));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if flags.skip_test_files && is_test_file_name(&file_name) {
            return Err(ChunkError::FilteredByPattern("test file".into()));
        }
        if flags.skip_examples && is_example_file_name(&file_name) {
            return Err(ChunkError::FilteredByPattern("example file".into()));
        }
        Ok(())
    }

    /// First configured pattern matching `path`, if any.
    #[must_use]
    pub fn matching_pattern(&self, path: &Path) -> Option<&str> {
        let full = normalize_path(path).to_lowercase();
        let file_name = full.rsplit('/').next().unwrap_or(&full);
        let mut dirs = full.split('/');
        dirs.next_back();
        let dirs: Vec<&str> = dirs.collect();

        self.rules.iter().find_map(|(raw, rule)| {
            let hit = match rule {
                Rule::Dir(name) => dirs.iter().any(|d| d == name),
                Rule::Glob(p) => p.matches(&full) || p.matches(file_name),
            };
            hit.then_some(raw.as_str())
        })
    }
}

fn stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(i) if i > 0 => &file_name[..i],
        _ => file_name,
    }
}

/// `test_x`, `x_test`, `x_test_y`, `x.test`, or exactly `test` (also `tests`, `spec`),
/// judged on the lowercase file stem.
#[must_use]
pub fn is_test_file_name(file_name: &str) -> bool {
    let stem = stem(file_name);
    TEST_MARKERS.iter().any(|m| {
        stem == *m
            || stem.starts_with(&format!("{m}_"))
            || stem.ends_with(&format!("_{m}"))
            || stem.contains(&format!("_{m}_"))
            || stem.ends_with(&format!(".{m}"))
    })
}

/// File names that start or end with `example`/`sample`/`demo`, or contain `_example` etc.
#[must_use]
pub fn is_example_file_name(file_name: &str) -> bool {
    let stem = stem(file_name);
    EXAMPLE_MARKERS
        .iter()
        .any(|m| stem.starts_with(m) || stem.ends_with(m) || stem.contains(&format!("_{m}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(path: &str, len: usize) -> Result<(), ChunkError> {
        FilterPolicy::default().check(
            Path::new(path),
            len,
            &Limits::default(),
            &FilterFlags::default(),
        )
    }

    #[test]
    fn keeps_ordinary_source() {
        assert!(check("src/parser.rs", 1000).is_ok());
        assert!(check("src/contest.rs", 1000).is_ok());
    }

    #[test]
    fn size_is_checked_first() {
        let err = check("dist/app.min.js", 600_000).unwrap_err();
        assert!(matches!(err, ChunkError::FileTooLarge { size: 600_000, limit: 524_288 }));
    }

    #[test]
    fn globs_match_file_names_and_directories() {
        assert!(matches!(
            check("web/app.min.js", 10),
            Err(ChunkError::FilteredByPattern(p)) if p == "*.min.js"
        ));
        assert!(matches!(
            check("crate/target/debug/build.rs", 10),
            Err(ChunkError::FilteredByPattern(p)) if p == "target/"
        ));
        assert!(check("Cargo.lock", 10).is_err());
        assert!(check("src/targeting.rs", 10).is_ok());
    }

    #[test]
    fn directory_rule_ignores_file_component() {
        let policy = FilterPolicy::new(["build/"]);
        assert!(policy.matching_pattern(Path::new("build")).is_none());
        assert!(policy.matching_pattern(Path::new("a/build/x.c")).is_some());
    }

    #[test]
    fn test_file_heuristic() {
        for name in [
            "test_parser.py",
            "parser_test.go",
            "parser.test.ts",
            "api_spec_helpers.rb",
            "tests.rs",
        ] {
            assert!(is_test_file_name(name), "{name}");
        }
        for name in ["latest.rs", "testing.rs", "contest.py", "attestation.go"] {
            assert!(!is_test_file_name(name), "{name}");
        }
    }

    #[test]
    fn example_file_heuristic() {
        assert!(is_example_file_name("example_server.rs"));
        assert!(is_example_file_name("basic_demo.py"));
        assert!(is_example_file_name("config_sample.toml"));
        assert!(!is_example_file_name("resampler.rs"));
    }

    #[test]
    fn flags_disable_heuristics() {
        let flags = FilterFlags {
            skip_test_files: false,
            skip_examples: false,
        };
        let policy = FilterPolicy::new(Vec::<String>::new());
        assert!(
            policy
                .check(Path::new("parser_test.go"), 10, &Limits::default(), &flags)
                .is_ok()
        );
        assert!(
            policy
                .check(Path::new("demo.rs"), 10, &Limits::default(), &flags)
                .is_ok()
        );
    }

    #[test]
    fn invalid_glob_is_skipped() {
        let policy = FilterPolicy::new(["[unclosed", "*.log"]);
        assert_eq!(policy.matching_pattern(Path::new("[unclosed")), None);
        assert_eq!(policy.matching_pattern(Path::new("logs/run.log")), Some("*.log"));
    }
}
