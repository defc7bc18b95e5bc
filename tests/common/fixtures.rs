//! Test fixtures and engine setup utilities

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use striakv::{Engine, EngineConfig};
use tempfile::TempDir;

/// Conventional WAL path inside a test directory
pub fn wal_path(dir: &TempDir) -> PathBuf {
    dir.path().join("wal.log")
}

/// Default config pointed at `path`
pub fn config_at(path: &Path) -> EngineConfig {
    EngineConfig {
        wal_path: path.to_path_buf(),
        ..Default::default()
    }
}

/// Engine backed by a fresh temp directory
///
/// Returns (engine, _tempdir) - the tempdir must be kept alive for the
/// WAL path to remain valid.
pub fn fresh_engine() -> (Engine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::open(config_at(&wal_path(&dir))).unwrap();
    (engine, dir)
}
