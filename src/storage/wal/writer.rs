//! WAL append path
//!
//! Appends framed records to a single append-only file and forces them to
//! stable storage before returning.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, StoreError};
use crate::storage::wal::format::{FrameLimits, Record};

/// Write handle for the append-only log
///
/// Appends are serialized by an internal mutex so frames are never
/// interleaved at the byte level, regardless of how callers are locked.
#[derive(Debug)]
pub struct Wal {
    file: Mutex<File>,
    path: PathBuf,
    limits: FrameLimits,
    fsync_on_append: bool,
}

impl Wal {
    /// Open or create the log file in append mode
    ///
    /// The write cursor sits at end of file; an empty file is a valid
    /// empty log.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be opened or created.
    pub fn open(
        path: impl AsRef<Path>,
        limits: FrameLimits,
        fsync_on_append: bool,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            file: Mutex::new(file),
            path,
            limits,
            fsync_on_append,
        })
    }

    /// Append one record and force it to stable storage
    ///
    /// The whole frame is written in a single call, then flushed with
    /// `sync_all` (full data plus metadata). Returns only after the flush
    /// completes; a failed append must be treated as not durable.
    ///
    /// # Errors
    ///
    /// Returns `KeyTooLarge`/`ValueTooLarge` if the record exceeds the
    /// configured frame limits, `Io` if the write or flush fails.
    pub fn append_and_sync(&self, record: &Record) -> Result<()> {
        if record.key.len() > self.limits.max_key_bytes {
            return Err(StoreError::KeyTooLarge {
                len: record.key.len(),
                limit: self.limits.max_key_bytes,
            });
        }
        if record.value.len() > self.limits.max_value_bytes {
            return Err(StoreError::ValueTooLarge {
                len: record.value.len(),
                limit: self.limits.max_value_bytes,
            });
        }

        let frame = record.encode();

        let mut file = self.file.lock().unwrap_or_else(|p| p.into_inner());
        file.write_all(&frame)?;
        if self.fsync_on_append {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Force any buffered data to stable storage
    ///
    /// # Errors
    ///
    /// Returns `Io` if the flush fails.
    pub fn sync(&self) -> Result<()> {
        let file = self.file.lock().unwrap_or_else(|p| p.into_inner());
        file.sync_all()?;
        Ok(())
    }

    /// Path of the underlying log file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LIMITS: FrameLimits = FrameLimits {
        max_key_bytes: 4096,
        max_value_bytes: 1024 * 1024,
    };

    #[test]
    fn test_append_grows_file_by_frame_len() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let wal = Wal::open(&path, LIMITS, true).unwrap();

        let record = Record::new("alpha", b"one".to_vec());
        wal.append_and_sync(&record).unwrap();
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            record.frame_len() as u64
        );

        wal.append_and_sync(&record).unwrap();
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            2 * record.frame_len() as u64
        );
    }

    #[test]
    fn test_open_positions_at_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");

        let record = Record::new("k", b"v".to_vec());
        {
            let wal = Wal::open(&path, LIMITS, true).unwrap();
            wal.append_and_sync(&record).unwrap();
        }

        // Reopening must append after the existing frame, not overwrite it.
        let wal = Wal::open(&path, LIMITS, true).unwrap();
        wal.append_and_sync(&record).unwrap();
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            2 * record.frame_len() as u64
        );
    }

    #[test]
    fn test_append_without_fsync_still_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let wal = Wal::open(&path, LIMITS, false).unwrap();

        let record = Record::new("k", b"v".to_vec());
        wal.append_and_sync(&record).unwrap();
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            record.frame_len() as u64
        );
    }

    #[test]
    fn test_oversize_record_rejected_without_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let limits = FrameLimits {
            max_key_bytes: 16,
            max_value_bytes: 16,
        };
        let wal = Wal::open(&path, limits, true).unwrap();

        let oversize = Record::new("k", vec![0u8; 32]);
        let err = wal.append_and_sync(&oversize).unwrap_err();
        assert!(matches!(err, StoreError::ValueTooLarge { .. }));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);

        let long_key = Record::new("k".repeat(32), Vec::new());
        let err = wal.append_and_sync(&long_key).unwrap_err();
        assert!(matches!(err, StoreError::KeyTooLarge { .. }));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
