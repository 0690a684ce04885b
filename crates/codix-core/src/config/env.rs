use super::Config;

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parsed value of `key`, or `None` when unset. Unparsable values are logged and ignored.
fn env_value<T: std::str::FromStr>(key: &str) -> Option<T> {
    let v = std::env::var(key).ok()?;
    let parsed = v.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!("ignoring invalid {key} value: {v}");
    }
    parsed
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_chunking();
        self.apply_env_overrides_scan();
    }

    fn apply_env_overrides_chunking(&mut self) {
        if let Ok(v) = std::env::var("CODIX_CHUNKING_STRATEGY") {
            match v.parse() {
                Ok(strategy) => self.chunking.strategy = strategy,
                Err(e) => tracing::warn!("ignoring invalid CODIX_CHUNKING_STRATEGY value: {e}"),
            }
        }
        if let Some(n) = env_value::<usize>("CODIX_MAX_FILE_SIZE_BYTES") {
            self.chunking.limits.max_file_size_bytes = n;
        }
        if let Some(n) = env_value::<usize>("CODIX_MAX_BLOCKS_PER_FILE") {
            self.chunking.limits.max_blocks_per_file = n;
        }
        if let Some(n) = env_value::<usize>("CODIX_MIN_BLOCK_CHARS") {
            self.chunking.limits.min_block_chars = n;
        }
        if let Ok(v) = std::env::var("CODIX_SKIP_TEST_FILES") {
            if let Some(b) = parse_bool(&v) {
                self.chunking.filter.skip_test_files = b;
            } else {
                tracing::warn!("ignoring invalid CODIX_SKIP_TEST_FILES value: {v}");
            }
        }
        if let Ok(v) = std::env::var("CODIX_SKIP_EXAMPLES") {
            if let Some(b) = parse_bool(&v) {
                self.chunking.filter.skip_examples = b;
            } else {
                tracing::warn!("ignoring invalid CODIX_SKIP_EXAMPLES value: {v}");
            }
        }
        if let Some(n) = env_value::<usize>("CODIX_TOKEN_CHUNK_SIZE") {
            self.chunking.token_chunk_size = n;
        }
        if let Some(n) = env_value::<usize>("CODIX_TOKEN_CHUNK_OVERLAP") {
            self.chunking.token_chunk_overlap = n;
        }
    }

    fn apply_env_overrides_scan(&mut self) {
        if let Some(n) = env_value::<u64>("CODIX_SCAN_MAX_FILE_SIZE_BYTES") {
            self.scan.max_file_size_bytes = n;
        }
        if let Ok(v) = std::env::var("CODIX_LOG_LEVEL")
            && !v.trim().is_empty()
        {
            self.logging.level = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn env_value_rejects_unparsable_numbers() {
        unsafe {
            std::env::set_var("CODIX_MAX_BLOCKS_PER_FILE", "many");
            std::env::set_var("CODIX_TOKEN_CHUNK_SIZE", " 256 ");
            std::env::remove_var("CODIX_MIN_BLOCK_CHARS");
        }
        assert_eq!(env_value::<usize>("CODIX_MAX_BLOCKS_PER_FILE"), None);
        assert_eq!(env_value::<usize>("CODIX_TOKEN_CHUNK_SIZE"), Some(256));
        assert_eq!(env_value::<usize>("CODIX_MIN_BLOCK_CHARS"), None);
        unsafe {
            std::env::remove_var("CODIX_MAX_BLOCKS_PER_FILE");
            std::env::remove_var("CODIX_TOKEN_CHUNK_SIZE");
        }
    }
}
