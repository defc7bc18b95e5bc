//! Engine configuration

use std::path::PathBuf;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the write-ahead log file
    pub wal_path: PathBuf,

    /// Number of locks in the striped array (rounded up to a power of two)
    pub stripe_count: usize,

    /// Reject Set calls whose key is longer than this
    pub max_key_bytes: usize,

    /// Reject Set calls whose value is longer than this
    pub max_value_bytes: usize,

    /// Force-flush the WAL on every append. Disabling this elides the
    /// durability guarantee and is intended for tests only.
    pub fsync_on_append: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wal_path: PathBuf::from("wal.log"),
            stripe_count: 64,
            max_key_bytes: 4 * 1024,
            max_value_bytes: 1024 * 1024,
            fsync_on_append: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Recognized: `STRIAKV_WAL_PATH`, `STRIAKV_STRIPE_COUNT`,
    /// `STRIAKV_MAX_KEY_BYTES`, `STRIAKV_MAX_VALUE_BYTES`,
    /// `STRIAKV_FSYNC`. Unset or unparsable variables fall back to the
    /// defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let wal_path = std::env::var("STRIAKV_WAL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.wal_path);

        let stripe_count = std::env::var("STRIAKV_STRIPE_COUNT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.stripe_count);

        let max_key_bytes = std::env::var("STRIAKV_MAX_KEY_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_key_bytes);

        let max_value_bytes = std::env::var("STRIAKV_MAX_VALUE_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_value_bytes);

        let fsync_on_append = std::env::var("STRIAKV_FSYNC")
            .ok()
            .map(|s| s != "false" && s != "0")
            .unwrap_or(defaults.fsync_on_append);

        Self {
            wal_path,
            stripe_count,
            max_key_bytes,
            max_value_bytes,
            fsync_on_append,
        }
    }
}
