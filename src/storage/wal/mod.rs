//! Write-ahead log: record framing, append path, replay

pub mod format;
pub mod recovery;
pub mod writer;

pub use format::{FrameLimits, Record};
pub use recovery::{ReplaySummary, WalReplay};
pub use writer::Wal;
