//! TAP file format reader.
//!
//! TAP is the simplest Spectrum tape format: sequential records, each
//! preceded by a 2-byte little-endian length word. A record holds the flag
//! byte, the data bytes and a checksum byte (XOR of flag + data), exactly as
//! the ROM saves them.
//!
//! A typical program consists of two records:
//!   1. Header (flag $00, 17 bytes of metadata)
//!   2. Data (flag $FF, the actual program/data)

use crate::error::TzxError;
use crate::tzx::{TzxBlock, need, read_u16_le};

/// Gap after every TAP record when played back, in milliseconds.
pub const TAP_PAUSE_MS: u16 = 1000;

/// A parsed TAP file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapFile {
    /// Raw records (flag, data, checksum), in order.
    pub records: Vec<Vec<u8>>,
}

impl TapFile {
    /// Parse a TAP file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TzxError::Truncated`] when a length word or record runs
    /// past the end of the data.
    pub fn parse(data: &[u8]) -> Result<Self, TzxError> {
        let mut records = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            need(data, offset, 2, "TAP length")?;
            let len = read_u16_le(data, offset) as usize;
            offset += 2;

            need(data, offset, len, "TAP record")?;
            records.push(data[offset..offset + len].to_vec());
            offset += len;
        }

        Ok(Self { records })
    }

    /// Whether a record's last byte matches the XOR of the bytes before it.
    #[must_use]
    pub fn checksum_ok(record: &[u8]) -> bool {
        match record.split_last() {
            Some((checksum, body)) => body.iter().fold(0, |acc, b| acc ^ b) == *checksum,
            None => false,
        }
    }

    /// The records as standard-speed blocks with a one second gap.
    #[must_use]
    pub fn into_blocks(self) -> Vec<TzxBlock> {
        self.records
            .into_iter()
            .map(|data| TzxBlock::StandardSpeed {
                pause_ms: TAP_PAUSE_MS,
                data,
            })
            .collect()
    }
}
