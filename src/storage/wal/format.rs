//! WAL record format and serialization
//!
//! One frame per logical Set:
//!
//! ```text
//! [ magic:2 | version:1 | key_len:u32 be | value_len:u32 be | key | value | crc32:u32 be ]
//! ```
//!
//! The CRC covers everything from the magic through the last value byte.

use std::io::{self, Read};

/// Record magic bytes "SK"
pub const RECORD_MAGIC: [u8; 2] = *b"SK";

/// Current record format version
pub const RECORD_VERSION: u8 = 1;

/// Fixed frame prefix: magic + version + key_len + value_len
pub const HEADER_SIZE: usize = 11;

/// Trailing checksum size
pub const CRC_SIZE: usize = 4;

/// CRC32 algorithm for record frames
const CRC_ALGORITHM: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);

/// Size limits enforced by the codec
///
/// Decoding treats a declared length beyond these bounds as corruption;
/// the engine rejects such records before they are ever encoded.
#[derive(Debug, Clone, Copy)]
pub struct FrameLimits {
    pub max_key_bytes: usize,
    pub max_value_bytes: usize,
}

/// A single logical Set as persisted in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Non-empty UTF-8 key
    pub key: String,

    /// Opaque value bytes (may be empty)
    pub value: Vec<u8>,
}

/// Why a frame failed to decode
#[derive(Debug)]
pub enum FrameError {
    /// The stream ended before the declared frame completed
    Truncated,

    /// Magic, version, length, UTF-8, or CRC checks failed on present bytes
    Corrupt,

    /// Underlying read failed
    Io(io::Error),
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Serialized frame size in bytes
    #[must_use]
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len() + CRC_SIZE
    }

    /// Serialize the record into one contiguous frame
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.frame_len());
        buf.extend_from_slice(&RECORD_MAGIC);
        buf.push(RECORD_VERSION);
        buf.extend_from_slice(&(self.key.len() as u32).to_be_bytes());
        buf.extend_from_slice(&(self.value.len() as u32).to_be_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        buf.extend_from_slice(&self.value);

        let crc = CRC_ALGORITHM.checksum(&buf);
        buf.extend_from_slice(&crc.to_be_bytes());
        buf
    }

    /// Deserialize one frame from a reader
    ///
    /// # Errors
    ///
    /// Returns `FrameError::Truncated` when the stream ends inside the
    /// frame, `FrameError::Corrupt` when present bytes fail validation,
    /// and `FrameError::Io` on other read failures.
    pub fn read_from<R: Read>(reader: &mut R, limits: FrameLimits) -> Result<Self, FrameError> {
        let mut header = [0u8; HEADER_SIZE];
        read_frame_bytes(reader, &mut header)?;

        if header[..2] != RECORD_MAGIC {
            return Err(FrameError::Corrupt);
        }
        if header[2] != RECORD_VERSION {
            return Err(FrameError::Corrupt);
        }

        let key_len = u32::from_be_bytes([header[3], header[4], header[5], header[6]]) as usize;
        let value_len = u32::from_be_bytes([header[7], header[8], header[9], header[10]]) as usize;

        if key_len == 0 || key_len > limits.max_key_bytes || value_len > limits.max_value_bytes {
            return Err(FrameError::Corrupt);
        }

        let mut key_bytes = vec![0u8; key_len];
        read_frame_bytes(reader, &mut key_bytes)?;

        let mut value = vec![0u8; value_len];
        read_frame_bytes(reader, &mut value)?;

        let mut crc_bytes = [0u8; CRC_SIZE];
        read_frame_bytes(reader, &mut crc_bytes)?;
        let stored_crc = u32::from_be_bytes(crc_bytes);

        let mut digest = CRC_ALGORITHM.digest();
        digest.update(&header);
        digest.update(&key_bytes);
        digest.update(&value);
        if digest.finalize() != stored_crc {
            return Err(FrameError::Corrupt);
        }

        let key = String::from_utf8(key_bytes).map_err(|_| FrameError::Corrupt)?;
        Ok(Self { key, value })
    }
}

/// `read_exact` with end-of-stream mapped to `Truncated`
fn read_frame_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), FrameError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FrameError::Truncated
        } else {
            FrameError::Io(e)
        }
    })
}
