use codix_chunker::filter::DEFAULT_SKIP_PATTERNS;
use codix_chunker::{FallbackConfig, FilterFlags, Limits, Strategy};
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_line_max_chars() -> usize {
    FallbackConfig::default().line_max_chars
}

fn default_token_chunk_size() -> usize {
    FallbackConfig::default().token_chunk_size
}

fn default_token_chunk_overlap() -> usize {
    FallbackConfig::default().token_chunk_overlap
}

fn default_skip_patterns() -> Vec<String> {
    DEFAULT_SKIP_PATTERNS.iter().map(|s| (*s).to_owned()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChunkingConfig {
    #[serde(default)]
    pub strategy: Strategy,
    /// Target characters per line-fallback block.
    #[serde(default = "default_line_max_chars")]
    pub line_max_chars: usize,
    #[serde(default = "default_token_chunk_size")]
    pub token_chunk_size: usize,
    #[serde(default = "default_token_chunk_overlap")]
    pub token_chunk_overlap: usize,
    /// Language ids allowed on the AST path. Empty means every language.
    #[serde(default)]
    pub enabled_languages: Vec<String>,
    #[serde(default = "default_skip_patterns")]
    pub skip_patterns: Vec<String>,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub filter: FilterFlags,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            line_max_chars: default_line_max_chars(),
            token_chunk_size: default_token_chunk_size(),
            token_chunk_overlap: default_token_chunk_overlap(),
            enabled_languages: Vec::new(),
            skip_patterns: default_skip_patterns(),
            limits: Limits::default(),
            filter: FilterFlags::default(),
        }
    }
}

fn default_scan_max_file_size_bytes() -> u64 {
    1024 * 1024
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Files above this size are not read at all.
    #[serde(default = "default_scan_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
    #[serde(default)]
    pub include_hidden: bool,
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_scan_max_file_size_bytes(),
            include_hidden: false,
            respect_gitignore: true,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
