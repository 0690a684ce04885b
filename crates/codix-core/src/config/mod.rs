mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};
use codix_chunker::{ChunkerConfig, FallbackConfig, Lang};

/// Environment variable naming the config file when `--config` is not given.
pub const CONFIG_PATH_ENV: &str = "CODIX_CONFIG";

/// Config file used when neither `--config` nor `CODIX_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if the
    /// resulting values fail [`Config::validate`].
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        let limits = &self.chunking.limits;
        for (name, value) in [
            ("chunking.limits.max_file_size_bytes", limits.max_file_size_bytes),
            ("chunking.limits.max_blocks_per_file", limits.max_blocks_per_file),
            ("chunking.limits.max_functions_per_file", limits.max_functions_per_file),
            ("chunking.limits.max_classes_per_file", limits.max_classes_per_file),
            ("chunking.limits.max_impl_blocks_per_file", limits.max_impl_blocks_per_file),
            ("chunking.line_max_chars", self.chunking.line_max_chars),
            ("chunking.token_chunk_size", self.chunking.token_chunk_size),
        ] {
            if value == 0 {
                bail!("{name} must be greater than zero");
            }
        }
        if self.chunking.token_chunk_overlap >= self.chunking.token_chunk_size {
            bail!(
                "chunking.token_chunk_overlap ({}) must be smaller than chunking.token_chunk_size ({})",
                self.chunking.token_chunk_overlap,
                self.chunking.token_chunk_size
            );
        }
        if self.scan.max_file_size_bytes == 0 {
            bail!("scan.max_file_size_bytes must be greater than zero");
        }
        self.enabled_languages()?;
        Ok(())
    }

    /// Parsed `chunking.enabled_languages`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown language id.
    pub fn enabled_languages(&self) -> anyhow::Result<Vec<Lang>> {
        self.chunking
            .enabled_languages
            .iter()
            .map(|id| {
                id.parse::<Lang>()
                    .map_err(|e| anyhow::anyhow!("chunking.enabled_languages: {e}"))
            })
            .collect()
    }

    /// Engine settings derived from the `[chunking]` section.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown language id.
    pub fn chunker_config(&self) -> anyhow::Result<ChunkerConfig> {
        Ok(ChunkerConfig {
            fallback: FallbackConfig {
                line_max_chars: self.chunking.line_max_chars,
                token_chunk_size: self.chunking.token_chunk_size,
                token_chunk_overlap: self.chunking.token_chunk_overlap,
            },
            skip_patterns: self.chunking.skip_patterns.clone(),
            enabled_languages: self.enabled_languages()?,
        })
    }
}

/// Pick the config path: explicit flag, then `CODIX_CONFIG`, then the default.
#[must_use]
pub fn resolve_config_path(cli_arg: Option<&Path>) -> std::path::PathBuf {
    if let Some(path) = cli_arg {
        return path.to_owned();
    }
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| DEFAULT_CONFIG_PATH.into(), Into::into)
}
