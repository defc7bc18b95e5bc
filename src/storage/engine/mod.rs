//! Storage engine facade
//!
//! Owns the WAL, the in-memory index, and the striped lock array, and
//! orchestrates the four store operations. The write path is strictly
//! "log first, then publish": a Set is acknowledged only after its record
//! has been appended and flushed, and the index never shows a binding the
//! log does not hold.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{Result, StoreError};
use crate::storage::index::MemIndex;
use crate::storage::stripes::StripedLocks;
use crate::storage::wal::{FrameLimits, Record, Wal, WalReplay};

/// Point-in-time statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct StatSnapshot {
    /// Number of distinct keys currently bound
    pub key_count: u64,

    /// Engine construction time, ISO-8601
    pub server_start_time: String,

    /// Total operations that reached the engine
    pub total_requests: u64,

    pub set_count: u64,
    pub get_count: u64,
    pub getprefix_count: u64,
}

/// The storage engine
///
/// All operations are synchronous and safe to call from many threads at
/// once; the engine spawns no background work of its own.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,

    /// Append-only durability log
    wal: Wal,

    /// Ordered runtime view, rebuilt from the WAL on startup
    index: MemIndex,

    /// Serializes same-key writers across "append + publish"
    stripes: StripedLocks,

    /// Captured once at construction, ISO-8601
    start_time: String,

    set_count: AtomicU64,
    get_count: AtomicU64,
    getprefix_count: AtomicU64,
    total_requests: AtomicU64,
}

impl Engine {
    /// Open the engine, recovering state from the WAL
    ///
    /// Creates the log file if it does not exist, then replays it into
    /// the index before returning. The replay phase is single-threaded:
    /// no external request can observe the engine mid-recovery.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the log cannot be opened or read, and `CorruptLog`
    /// if replay finds mid-file corruption.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let limits = FrameLimits {
            max_key_bytes: config.max_key_bytes,
            max_value_bytes: config.max_value_bytes,
        };

        // 1. Open (or create) the log; an empty file is a valid empty log.
        let wal = Wal::open(&config.wal_path, limits, config.fsync_on_append)?;

        // 2. Rebuild the index. Replay order is log order, so the last
        //    Set per key wins.
        let index = MemIndex::new();
        let started = Instant::now();
        let summary = WalReplay::new(&config.wal_path, limits).run(|key, value| {
            index.put(key, value);
        })?;

        tracing::info!(
            records_applied = summary.records_applied,
            truncated_bytes = summary.truncated_bytes,
            keys = index.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "wal replay complete"
        );

        // 3. Only now is the engine open for traffic.
        Ok(Self {
            stripes: StripedLocks::new(config.stripe_count),
            wal,
            index,
            start_time: chrono::Utc::now().to_rfc3339(),
            set_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            getprefix_count: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            config,
        })
    }

    /// Durably bind `key` to `value`
    ///
    /// On success the record has been appended to the WAL and flushed to
    /// stable storage. On `Io` failure the index is left untouched, so no
    /// unacknowledged binding can ever be observed; the caller should
    /// retry (Set is idempotent by value).
    ///
    /// # Errors
    ///
    /// Returns `EmptyKey`, `KeyTooLarge`, `ValueTooLarge` on validation
    /// failure and `Io` if the append or flush fails.
    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.set_count.fetch_add(1, Ordering::Relaxed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        // 1. Validate before taking any lock; rejected requests leave no
        //    trace in the log or the index.
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if key.len() > self.config.max_key_bytes {
            return Err(StoreError::KeyTooLarge {
                len: key.len(),
                limit: self.config.max_key_bytes,
            });
        }
        if value.len() > self.config.max_value_bytes {
            return Err(StoreError::ValueTooLarge {
                len: value.len(),
                limit: self.config.max_value_bytes,
            });
        }

        let record = Record::new(key, value);

        // 2. One stripe lock covers the whole append + publish sequence,
        //    totally ordering Sets on the same key.
        let _stripe = self.stripes.lock(key);

        // 3. Log first. A failure here propagates without touching the
        //    index.
        self.wal.append_and_sync(&record)?;

        // 4. Publish. Readers see either the old binding or the new one,
        //    never a partial value.
        self.index.put(record.key, record.value);
        Ok(())
    }

    /// Current value bound to `key`, if any
    ///
    /// Takes no stripe lock; relies on the index's own shared-access
    /// guarantees.
    ///
    /// # Errors
    ///
    /// Returns `EmptyKey` for a zero-length key.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        Ok(self.index.get(key))
    }

    /// Bindings whose keys start with `prefix`, ascending lexicographic
    ///
    /// An empty prefix matches every key; `max_results <= 0` means no
    /// limit.
    pub fn get_prefix(&self, prefix: &str, max_results: i64) -> Vec<(String, Vec<u8>)> {
        self.getprefix_count.fetch_add(1, Ordering::Relaxed);
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        self.index.prefix_scan(prefix, max_results)
    }

    /// Statistics snapshot
    ///
    /// Counters reset at process start; durability covers data, not
    /// counters. Stat itself is not counted as a request.
    #[must_use]
    pub fn stat(&self) -> StatSnapshot {
        StatSnapshot {
            key_count: self.index.len() as u64,
            server_start_time: self.start_time.clone(),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            set_count: self.set_count.load(Ordering::Relaxed),
            get_count: self.get_count.load(Ordering::Relaxed),
            getprefix_count: self.getprefix_count.load(Ordering::Relaxed),
        }
    }

    /// Flush the log and release the engine
    ///
    /// Dropping the engine closes the file handle either way; `close`
    /// makes the final flush explicit.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the flush fails.
    pub fn close(self) -> Result<()> {
        self.wal.sync()?;
        tracing::info!(keys = self.index.len(), "engine closed");
        Ok(())
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
