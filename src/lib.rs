//! # StriaKV
//!
//! A persistent, concurrent key-value storage engine:
//!
//! - Write-Ahead Log (WAL): every Set is appended and flushed to stable
//!   storage before it is acknowledged
//! - Striped locks: same-key writers serialize, different stripes run in
//!   parallel, readers take no stripe lock at all
//! - Ordered in-memory index: point lookups and lexicographic prefix scans
//! - Crash recovery: the log is replayed into the index before the engine
//!   accepts traffic; a torn tail from a mid-append crash is truncated away
//!
//! The crate is transport-agnostic. [`Engine`] exposes the synchronous
//! Set/Get/GetPrefix/Stat surface; an RPC layer adapts it.
//!
//! ```no_run
//! use striakv::{Engine, EngineConfig};
//!
//! let engine = Engine::open(EngineConfig::default())?;
//! engine.set("user/42", b"profile bytes")?;
//! assert_eq!(engine.get("user/42")?, Some(b"profile bytes".to_vec()));
//! # Ok::<(), striakv::StoreError>(())
//! ```

pub mod config;
pub mod error;
pub mod storage;

// Re-exports
pub use config::EngineConfig;
pub use error::{Result, StoreError};
pub use storage::engine::{Engine, StatSnapshot};

/// Current version of StriaKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
