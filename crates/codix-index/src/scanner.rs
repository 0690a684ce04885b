//! Directory walking with gitignore support and pre-read size/binary checks.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{IndexError, Result};

/// Bytes inspected for a NUL when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 8192;

/// Walk settings, mirrored from the `[scan]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub max_file_size_bytes: u64,
    pub include_hidden: bool,
    pub respect_gitignore: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 1024 * 1024,
            include_hidden: false,
            respect_gitignore: true,
        }
    }
}

/// Why a walked file was never handed to the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge,
    Binary,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::TooLarge => "too large",
            Self::Binary => "binary",
        })
    }
}

/// A file read from disk, keyed by its root-relative path.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Forward-slash path relative to the scan root.
    pub rel_path: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum Scanned {
    File(ScannedFile),
    Skipped { rel_path: String, reason: SkipReason },
}

#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    options: ScanOptions,
}

impl Scanner {
    /// # Errors
    ///
    /// Returns [`IndexError::NotADirectory`] when `root` is not an existing directory.
    pub fn new(root: &Path, options: ScanOptions) -> Result<Self> {
        if !root.is_dir() {
            return Err(IndexError::NotADirectory(root.display().to_string()));
        }
        Ok(Self {
            root: root.to_owned(),
            options,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every regular file under the root, in file-name order within each directory.
    ///
    /// Walk errors (unreadable directories, broken ignore files) are logged and skipped.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        let respect = self.options.respect_gitignore;
        WalkBuilder::new(&self.root)
            .hidden(!self.options.include_hidden)
            .git_ignore(respect)
            .git_global(respect)
            .git_exclude(respect)
            .ignore(respect)
            .parents(respect)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("walk error: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(ignore::DirEntry::into_path)
            .collect()
    }

    #[must_use]
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Read one walked file unless it is oversized or binary.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be stat'ed or read.
    pub fn read(&self, path: &Path) -> Result<Scanned> {
        let rel_path = self.relative_path(path);
        let size = std::fs::metadata(path)?.len();
        if size > self.options.max_file_size_bytes {
            return Ok(Scanned::Skipped {
                rel_path,
                reason: SkipReason::TooLarge,
            });
        }

        let content = std::fs::read(path)?;
        if is_binary(&content) {
            return Ok(Scanned::Skipped {
                rel_path,
                reason: SkipReason::Binary,
            });
        }
        Ok(Scanned::File(ScannedFile { rel_path, content }))
    }
}

fn is_binary(content: &[u8]) -> bool {
    content[..content.len().min(BINARY_SNIFF_LEN)].contains(&0)
}
