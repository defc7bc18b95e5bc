//! WAL replay and crash recovery
//!
//! Reads the log from offset 0 and feeds each record to a visitor. A
//! record that fails to decode is classified one of two ways:
//!
//! - torn tail: nothing decodable follows the damage. A crash during an
//!   append leaves at most one such partial frame; it is truncated away
//!   and replay returns normally.
//! - mid-file corruption: CRC-valid frames exist after the damage.
//!   Truncating here would silently drop acknowledged writes, so replay
//!   fails and the engine refuses to start.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::storage::wal::format::{FrameError, FrameLimits, Record, RECORD_MAGIC};

/// Outcome of a completed replay
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    /// Records decoded and handed to the visitor
    pub records_applied: u64,

    /// Bytes discarded from the tail; 0 for a clean log
    pub truncated_bytes: u64,
}

/// Replays a log file into a visitor
///
/// Runs single-threaded during engine startup, before any appender exists,
/// so it takes no locks.
pub struct WalReplay {
    path: PathBuf,
    limits: FrameLimits,
}

impl WalReplay {
    #[must_use]
    pub fn new(path: impl AsRef<Path>, limits: FrameLimits) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            limits,
        }
    }

    /// Decode the log from offset 0, invoking `visit(key, value)` per record
    ///
    /// Records are visited in log order, so applying them to a map yields
    /// last-write-wins per key. A torn tail is truncated in place and the
    /// file flushed before returning.
    ///
    /// # Errors
    ///
    /// Returns `Io` on read failures and `CorruptLog` when a damaged
    /// record has well-formed records after it.
    pub fn run<F>(&self, mut visit: F) -> Result<ReplaySummary>
    where
        F: FnMut(String, Vec<u8>),
    {
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        let file_len = file.metadata()?.len();

        let mut offset: u64 = 0;
        let mut applied: u64 = 0;
        let failure = {
            let mut reader = BufReader::new(&mut file);
            loop {
                if offset == file_len {
                    break None;
                }
                match Record::read_from(&mut reader, self.limits) {
                    Ok(record) => {
                        offset += record.frame_len() as u64;
                        applied += 1;
                        visit(record.key, record.value);
                    }
                    Err(FrameError::Io(e)) => return Err(e.into()),
                    Err(_) => break Some(offset),
                }
            }
        };

        let Some(failed_at) = failure else {
            return Ok(ReplaySummary {
                records_applied: applied,
                truncated_bytes: 0,
            });
        };

        if self.valid_frame_after(&mut file, failed_at, file_len)? {
            return Err(StoreError::CorruptLog { offset: failed_at });
        }

        let truncated_bytes = file_len - failed_at;
        tracing::warn!(
            offset = failed_at,
            truncated_bytes,
            "discarding torn record at log tail"
        );
        file.set_len(failed_at)?;
        file.sync_all()?;

        Ok(ReplaySummary {
            records_applied: applied,
            truncated_bytes,
        })
    }

    /// Scan for any CRC-valid frame strictly after the failure offset
    ///
    /// A hit means the damage sits mid-file and truncation would lose
    /// acknowledged records.
    fn valid_frame_after(&self, file: &mut File, failed_at: u64, file_len: u64) -> Result<bool> {
        let remaining = (file_len - failed_at) as usize;
        let mut tail = vec![0u8; remaining];
        file.seek(SeekFrom::Start(failed_at))?;
        file.read_exact(&mut tail)?;

        // Position 0 already failed to decode; resync on the magic bytes.
        for start in 1..tail.len() {
            if !tail[start..].starts_with(&RECORD_MAGIC) {
                continue;
            }
            let mut cursor = Cursor::new(&tail[start..]);
            if Record::read_from(&mut cursor, self.limits).is_ok() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::wal::format::CRC_SIZE;
    use std::io::Write;
    use tempfile::tempdir;

    const LIMITS: FrameLimits = FrameLimits {
        max_key_bytes: 4096,
        max_value_bytes: 1024 * 1024,
    };

    fn write_log(path: &Path, records: &[Record]) {
        let mut bytes = Vec::new();
        for record in records {
            bytes.extend_from_slice(&record.encode());
        }
        std::fs::write(path, bytes).unwrap();
    }

    fn collect(path: &Path) -> Result<(Vec<(String, Vec<u8>)>, ReplaySummary)> {
        let mut seen = Vec::new();
        let summary = WalReplay::new(path, LIMITS).run(|k, v| seen.push((k, v)))?;
        Ok((seen, summary))
    }

    #[test]
    fn test_replay_empty_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        std::fs::write(&path, b"").unwrap();

        let (seen, summary) = collect(&path).unwrap();
        assert!(seen.is_empty());
        assert_eq!(summary.records_applied, 0);
        assert_eq!(summary.truncated_bytes, 0);
    }

    #[test]
    fn test_replay_visits_records_in_log_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let records = vec![
            Record::new("a", b"1".to_vec()),
            Record::new("b", b"2".to_vec()),
            Record::new("a", b"3".to_vec()),
        ];
        write_log(&path, &records);

        let (seen, summary) = collect(&path).unwrap();
        assert_eq!(summary.records_applied, 3);
        assert_eq!(seen[0], ("a".to_string(), b"1".to_vec()));
        assert_eq!(seen[1], ("b".to_string(), b"2".to_vec()));
        assert_eq!(seen[2], ("a".to_string(), b"3".to_vec()));
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");

        let good = Record::new("kept", b"value".to_vec());
        let torn = Record::new("lost", b"value".to_vec());
        write_log(&path, &[good.clone()]);

        // Append only the first 7 bytes of the next frame, as a crash
        // mid-append would.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&torn.encode()[..7]).unwrap();
        drop(file);

        let (seen, summary) = collect(&path).unwrap();
        assert_eq!(summary.records_applied, 1);
        assert_eq!(summary.truncated_bytes, 7);
        assert_eq!(seen, vec![("kept".to_string(), b"value".to_vec())]);

        // File is cut back to the last good frame and replays cleanly.
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            good.frame_len() as u64
        );
        let (seen, summary) = collect(&path).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(summary.truncated_bytes, 0);
    }

    #[test]
    fn test_every_truncation_point_of_last_frame_recovers() {
        let dir = tempdir().unwrap();
        let first = Record::new("first", b"one".to_vec());
        let last = Record::new("last", b"two".to_vec());

        let mut full = first.encode();
        full.extend_from_slice(&last.encode());

        for cut in 1..last.frame_len() {
            let path = dir.path().join(format!("wal_{cut}.log"));
            std::fs::write(&path, &full[..first.frame_len() + cut]).unwrap();

            let (seen, summary) = collect(&path).unwrap();
            assert_eq!(seen.len(), 1, "cut at {cut}");
            assert_eq!(summary.truncated_bytes, cut as u64);
            assert_eq!(
                std::fs::metadata(&path).unwrap().len(),
                first.frame_len() as u64
            );
        }
    }

    #[test]
    fn test_corrupt_final_record_is_truncated_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let first = Record::new("first", b"one".to_vec());
        let last = Record::new("last", b"two".to_vec());

        let mut bytes = first.encode();
        let mut last_frame = last.encode();
        // Flip a value byte: the frame is fully present but fails its CRC.
        let flip_at = last_frame.len() - CRC_SIZE - 1;
        last_frame[flip_at] ^= 0xFF;
        bytes.extend_from_slice(&last_frame);
        std::fs::write(&path, &bytes).unwrap();

        let (seen, summary) = collect(&path).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(summary.truncated_bytes, last.frame_len() as u64);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            first.frame_len() as u64
        );
    }

    #[test]
    fn test_corrupt_middle_record_fails_replay() {
        let dir = tempdir().unwrap();
        let records = vec![
            Record::new("a", b"1111".to_vec()),
            Record::new("b", b"2222".to_vec()),
            Record::new("c", b"3333".to_vec()),
        ];

        let first_len = records[0].frame_len();
        let middle_len = records[1].frame_len();

        let mut clean = Vec::new();
        for record in &records {
            clean.extend_from_slice(&record.encode());
        }

        // Flipping any byte of the middle frame must escalate, never
        // truncate away the valid third record.
        for i in first_len..first_len + middle_len {
            let path = dir.path().join(format!("wal_{i}.log"));
            let mut damaged = clean.clone();
            damaged[i] ^= 0x01;
            std::fs::write(&path, &damaged).unwrap();

            let err = collect(&path).unwrap_err();
            assert!(
                matches!(err, StoreError::CorruptLog { .. }),
                "flip at byte {i} did not fail replay: {err:?}"
            );
            // The file must be left untouched.
            assert_eq!(std::fs::metadata(&path).unwrap().len(), clean.len() as u64);
        }
    }

    #[test]
    fn test_corrupt_length_field_swallowing_tail_fails_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let records = vec![
            Record::new("a", b"1111".to_vec()),
            Record::new("b", b"2222".to_vec()),
        ];
        let mut bytes = Vec::new();
        for record in &records {
            bytes.extend_from_slice(&record.encode());
        }

        // Inflate the first record's declared value length so the frame
        // appears to extend past end of file.
        bytes[8] = 0x01;
        std::fs::write(&path, &bytes).unwrap();

        let err = collect(&path).unwrap_err();
        assert!(matches!(err, StoreError::CorruptLog { offset: 0 }));
    }
}
