//! # Record Framing
//!
//! Block records are stored as `crc32(payload) (LE, 4 bytes) || payload`.
//! A mismatch on read is reported as `KVStoreError::Corruption`.

use crate::domain::errors::KVStoreError;

const CRC_LEN: usize = 4;

/// Prepend a CRC32 checksum to `payload`.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(CRC_LEN + payload.len());
    out.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Verify and strip the checksum.
pub fn unframe(record: &[u8]) -> Result<&[u8], KVStoreError> {
    if record.len() < CRC_LEN {
        return Err(KVStoreError::Corruption {
            message: format!("record too short: {} bytes", record.len()),
        });
    }
    let (crc, payload) = record.split_at(CRC_LEN);
    let expected = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Err(KVStoreError::Corruption {
            message: format!("checksum mismatch: stored {expected:08x}, computed {actual:08x}"),
        });
    }
    Ok(payload)
}
