//! Store configuration
use super::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub path: PathBuf,
    /// Delete the store when the last handle is dropped (tests, demos).
    pub temporary: bool,
    pub cache_capacity_bytes: u64,
    /// `None` disables the background flusher; sled then only flushes on drop
    /// or explicit `flush()`.
    pub flush_every_ms: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("movements.db"),
            temporary: false,
            cache_capacity_bytes: 1024 * 1024 * 1024,
            flush_every_ms: Some(500),
        }
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

impl LedgerConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `MOVEMENTS_DB_PATH`, `MOVEMENTS_DB_TEMPORARY`,
    /// `MOVEMENTS_CACHE_BYTES` and `MOVEMENTS_FLUSH_MS` (0 turns flushing off).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = env::var("MOVEMENTS_DB_PATH") {
            config.path = PathBuf::from(path);
        }
        if let Ok(value) = env::var("MOVEMENTS_DB_TEMPORARY") {
            config.temporary = parse("MOVEMENTS_DB_TEMPORARY", value)?;
        }
        if let Ok(value) = env::var("MOVEMENTS_CACHE_BYTES") {
            config.cache_capacity_bytes = parse("MOVEMENTS_CACHE_BYTES", value)?;
        }
        if let Ok(value) = env::var("MOVEMENTS_FLUSH_MS") {
            let ms: u64 = parse("MOVEMENTS_FLUSH_MS", value)?;
            config.flush_every_ms = (ms > 0).then_some(ms);
        }

        Ok(config)
    }

    pub fn to_sled(&self) -> sled::Config {
        sled::Config::new()
            .path(&self.path)
            .temporary(self.temporary)
            .cache_capacity(self.cache_capacity_bytes)
            .flush_every_ms(self.flush_every_ms)
    }

    pub fn open(&self) -> Result<Arc<sled::Db>, ConfigError> {
        let db = self.to_sled().open()?;
        info!(path = %self.path.display(), temporary = self.temporary, "movement store opened");
        Ok(Arc::new(db))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reports_the_offending_key() {
        let err = parse::<u64>("MOVEMENTS_CACHE_BYTES", "lots".into()).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value } => {
                assert_eq!(key, "MOVEMENTS_CACHE_BYTES");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(parse::<bool>("MOVEMENTS_DB_TEMPORARY", " true ".into()).unwrap());
    }

    #[test]
    fn opens_a_store_at_the_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            flush_every_ms: None,
            ..LedgerConfig::with_path(dir.path().join("movements.db"))
        };

        let db = config.open().unwrap();
        db.insert(b"probe", b"1".to_vec()).unwrap();
        assert!(dir.path().join("movements.db").exists());
    }
}
