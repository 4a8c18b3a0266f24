//! TZX container reader.
//!
//! A TZX file starts with a 10-byte header (`"ZXTape!" + 0x1A + major + minor`)
//! followed by a sequence of blocks. Each block starts with an ID byte that
//! determines its structure.

use crate::error::TzxError;

/// A parsed TZX file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TzxFile {
    pub major: u8,
    pub minor: u8,
    pub blocks: Vec<TzxBlock>,
}

/// A single TZX block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TzxBlock {
    /// Block $10: Standard speed data (ROM timing).
    StandardSpeed { pause_ms: u16, data: Vec<u8> },
    /// Block $11: Turbo speed data (custom timing).
    TurboSpeed {
        pilot_pulse: u16,
        sync1: u16,
        sync2: u16,
        zero_pulse: u16,
        one_pulse: u16,
        pilot_count: u16,
        used_bits: u8,
        pause_ms: u16,
        data: Vec<u8>,
    },
    /// Block $12: Pure tone (repeated single pulse).
    PureTone { pulse_len: u16, count: u16 },
    /// Block $13: Pulse sequence (arbitrary pulse lengths).
    PulseSequence { pulses: Vec<u16> },
    /// Block $14: Pure data (no pilot or sync, just data bits).
    PureData {
        zero_pulse: u16,
        one_pulse: u16,
        used_bits: u8,
        pause_ms: u16,
        data: Vec<u8>,
    },
    /// Block $20: Pause, or stop the tape when the duration is zero.
    Pause { duration_ms: u16 },
    /// Block $21: Group start.
    GroupStart { name: String },
    /// Block $22: Group end.
    GroupEnd,
    /// Block $24: Loop start.
    LoopStart { repetitions: u16 },
    /// Block $25: Loop end.
    LoopEnd,
    /// Block $2A: Stop the tape if in 48K mode.
    StopIf48K,
    /// Block $2B: Set signal level.
    SetSignalLevel { level: bool },
    /// Block $30: Text description.
    TextDescription { text: String },
    /// Block $31: Message shown for `display_secs` seconds.
    Message { display_secs: u8, text: String },
    /// Block $32: Archive info.
    ArchiveInfo { entries: Vec<(u8, String)> },
    /// Block $33: Hardware type entries `(type, id, info)`.
    HardwareType { entries: Vec<(u8, u8, u8)> },
    /// Block $35: Custom info.
    CustomInfo { id: String, data: Vec<u8> },
    /// Block $5A: Glue block left behind by concatenating two files.
    Glue,
    /// A documented block this reader skips (direct/CSW recordings,
    /// generalized data, call sequences, select/jump).
    Unsupported { block_id: u8 },
}

impl TzxBlock {
    /// Whether the block produces a signal on the EAR line.
    #[must_use]
    pub fn is_playable(&self) -> bool {
        matches!(
            self,
            Self::StandardSpeed { .. }
                | Self::TurboSpeed { .. }
                | Self::PureTone { .. }
                | Self::PulseSequence { .. }
                | Self::PureData { .. }
                | Self::Pause { .. }
        )
    }

    /// The TZX block ID.
    #[must_use]
    pub fn id(&self) -> u8 {
        match self {
            Self::StandardSpeed { .. } => 0x10,
            Self::TurboSpeed { .. } => 0x11,
            Self::PureTone { .. } => 0x12,
            Self::PulseSequence { .. } => 0x13,
            Self::PureData { .. } => 0x14,
            Self::Pause { .. } => 0x20,
            Self::GroupStart { .. } => 0x21,
            Self::GroupEnd => 0x22,
            Self::LoopStart { .. } => 0x24,
            Self::LoopEnd => 0x25,
            Self::StopIf48K => 0x2A,
            Self::SetSignalLevel { .. } => 0x2B,
            Self::TextDescription { .. } => 0x30,
            Self::Message { .. } => 0x31,
            Self::ArchiveInfo { .. } => 0x32,
            Self::HardwareType { .. } => 0x33,
            Self::CustomInfo { .. } => 0x35,
            Self::Glue => 0x5A,
            Self::Unsupported { block_id } => *block_id,
        }
    }
}

/// TZX header magic: "ZXTape!" + 0x1A.
pub(crate) const MAGIC: &[u8; 8] = b"ZXTape!\x1A";

impl TzxFile {
    /// Parse a TZX file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid, a block is truncated or a
    /// block ID is not part of the TZX format.
    pub fn parse(data: &[u8]) -> Result<Self, TzxError> {
        if data.len() < 10 {
            return Err(TzxError::TooShort { len: data.len() });
        }
        if &data[0..8] != MAGIC {
            return Err(TzxError::BadSignature);
        }

        let major = data[8];
        let minor = data[9];
        let mut blocks = Vec::new();
        let mut pos = 10;

        while pos < data.len() {
            let block_id = data[pos];
            pos += 1;

            let block = match block_id {
                0x10 => parse_standard_speed(data, &mut pos)?,
                0x11 => parse_turbo_speed(data, &mut pos)?,
                0x12 => parse_pure_tone(data, &mut pos)?,
                0x13 => parse_pulse_sequence(data, &mut pos)?,
                0x14 => parse_pure_data(data, &mut pos)?,
                0x20 => parse_pause(data, &mut pos)?,
                0x21 => parse_group_start(data, &mut pos)?,
                0x22 => TzxBlock::GroupEnd,
                0x24 => parse_loop_start(data, &mut pos)?,
                0x25 => TzxBlock::LoopEnd,
                0x2A => parse_stop_if_48k(data, &mut pos)?,
                0x2B => parse_set_signal_level(data, &mut pos)?,
                0x30 => parse_text_description(data, &mut pos)?,
                0x31 => parse_message(data, &mut pos)?,
                0x32 => parse_archive_info(data, &mut pos)?,
                0x33 => parse_hardware_type(data, &mut pos)?,
                0x35 => parse_custom_info(data, &mut pos)?,
                0x5A => {
                    need(data, pos, 9, "Glue")?;
                    pos += 9;
                    TzxBlock::Glue
                }
                0x15 | 0x18 | 0x19 | 0x23 | 0x26 | 0x27 | 0x28 => {
                    skip_unsupported_block(block_id, data, &mut pos)?
                }
                id => {
                    return Err(TzxError::UnknownBlock {
                        id,
                        offset: pos - 1,
                    });
                }
            };

            blocks.push(block);
        }

        log::debug!(
            "TZX {major}.{minor:02}: {} blocks",
            blocks.len()
        );

        Ok(Self {
            major,
            minor,
            blocks,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn need(
    data: &[u8],
    pos: usize,
    n: usize,
    block: &'static str,
) -> Result<(), TzxError> {
    if pos + n > data.len() {
        Err(TzxError::Truncated {
            block,
            offset: pos,
            needed: n,
            remaining: data.len().saturating_sub(pos),
        })
    } else {
        Ok(())
    }
}

pub(crate) fn read_u16_le(data: &[u8], pos: usize) -> u16 {
    u16::from(data[pos]) | (u16::from(data[pos + 1]) << 8)
}

fn read_u24_le(data: &[u8], pos: usize) -> u32 {
    u32::from(data[pos]) | (u32::from(data[pos + 1]) << 8) | (u32::from(data[pos + 2]) << 16)
}

fn read_u32_le(data: &[u8], pos: usize) -> u32 {
    u32::from(data[pos])
        | (u32::from(data[pos + 1]) << 8)
        | (u32::from(data[pos + 2]) << 16)
        | (u32::from(data[pos + 3]) << 24)
}

fn take_bytes(
    data: &[u8],
    pos: &mut usize,
    len: usize,
    block: &'static str,
) -> Result<Vec<u8>, TzxError> {
    need(data, *pos, len, block)?;
    let bytes = data[*pos..*pos + len].to_vec();
    *pos += len;
    Ok(bytes)
}

fn take_text(
    data: &[u8],
    pos: &mut usize,
    len: usize,
    block: &'static str,
) -> Result<String, TzxError> {
    let bytes = take_bytes(data, pos, len, block)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Block parsers
// ---------------------------------------------------------------------------

/// Block $10: `[pause:2][length:2][data]`.
fn parse_standard_speed(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 4, "Standard Speed header")?;
    let pause_ms = read_u16_le(data, *pos);
    let data_len = read_u16_le(data, *pos + 2) as usize;
    *pos += 4;

    let block_data = take_bytes(data, pos, data_len, "Standard Speed data")?;
    Ok(TzxBlock::StandardSpeed {
        pause_ms,
        data: block_data,
    })
}

/// Block $11: Turbo speed data block.
fn parse_turbo_speed(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 18, "Turbo Speed header")?;
    let pilot_pulse = read_u16_le(data, *pos);
    let sync1 = read_u16_le(data, *pos + 2);
    let sync2 = read_u16_le(data, *pos + 4);
    let zero_pulse = read_u16_le(data, *pos + 6);
    let one_pulse = read_u16_le(data, *pos + 8);
    let pilot_count = read_u16_le(data, *pos + 10);
    let used_bits = data[*pos + 12];
    let pause_ms = read_u16_le(data, *pos + 13);
    let data_len = read_u24_le(data, *pos + 15) as usize;
    *pos += 18;

    let block_data = take_bytes(data, pos, data_len, "Turbo Speed data")?;
    Ok(TzxBlock::TurboSpeed {
        pilot_pulse,
        sync1,
        sync2,
        zero_pulse,
        one_pulse,
        pilot_count,
        used_bits,
        pause_ms,
        data: block_data,
    })
}

fn parse_pure_tone(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 4, "Pure Tone")?;
    let pulse_len = read_u16_le(data, *pos);
    let count = read_u16_le(data, *pos + 2);
    *pos += 4;
    Ok(TzxBlock::PureTone { pulse_len, count })
}

fn parse_pulse_sequence(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 1, "Pulse Sequence count")?;
    let count = data[*pos] as usize;
    *pos += 1;

    need(data, *pos, count * 2, "Pulse Sequence data")?;
    let pulses = (0..count).map(|i| read_u16_le(data, *pos + i * 2)).collect();
    *pos += count * 2;

    Ok(TzxBlock::PulseSequence { pulses })
}

fn parse_pure_data(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 10, "Pure Data header")?;
    let zero_pulse = read_u16_le(data, *pos);
    let one_pulse = read_u16_le(data, *pos + 2);
    let used_bits = data[*pos + 4];
    let pause_ms = read_u16_le(data, *pos + 5);
    let data_len = read_u24_le(data, *pos + 7) as usize;
    *pos += 10;

    let block_data = take_bytes(data, pos, data_len, "Pure Data data")?;
    Ok(TzxBlock::PureData {
        zero_pulse,
        one_pulse,
        used_bits,
        pause_ms,
        data: block_data,
    })
}

fn parse_pause(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 2, "Pause")?;
    let duration_ms = read_u16_le(data, *pos);
    *pos += 2;
    Ok(TzxBlock::Pause { duration_ms })
}

fn parse_group_start(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 1, "Group Start length")?;
    let len = data[*pos] as usize;
    *pos += 1;
    let name = take_text(data, pos, len, "Group Start name")?;
    Ok(TzxBlock::GroupStart { name })
}

fn parse_loop_start(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 2, "Loop Start")?;
    let repetitions = read_u16_le(data, *pos);
    *pos += 2;
    Ok(TzxBlock::LoopStart { repetitions })
}

fn parse_stop_if_48k(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    // 4-byte block length, always 0
    need(data, *pos, 4, "Stop If 48K")?;
    *pos += 4;
    Ok(TzxBlock::StopIf48K)
}

fn parse_set_signal_level(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    // 4-byte block length (always 1) + 1-byte level
    need(data, *pos, 5, "Set Signal Level")?;
    let level = data[*pos + 4] != 0;
    *pos += 5;
    Ok(TzxBlock::SetSignalLevel { level })
}

fn parse_text_description(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 1, "Text Description length")?;
    let len = data[*pos] as usize;
    *pos += 1;
    let text = take_text(data, pos, len, "Text Description text")?;
    Ok(TzxBlock::TextDescription { text })
}

fn parse_message(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 2, "Message header")?;
    let display_secs = data[*pos];
    let len = data[*pos + 1] as usize;
    *pos += 2;
    let text = take_text(data, pos, len, "Message text")?;
    Ok(TzxBlock::Message { display_secs, text })
}

fn parse_archive_info(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 2, "Archive Info header")?;
    let block_len = read_u16_le(data, *pos) as usize;
    *pos += 2;

    need(data, *pos, block_len.max(1), "Archive Info data")?;
    let block_end = *pos + block_len;

    let num_entries = data[*pos] as usize;
    *pos += 1;

    let mut entries = Vec::with_capacity(num_entries);
    for _ in 0..num_entries {
        if *pos + 2 > block_end {
            break;
        }
        let entry_id = data[*pos];
        let entry_len = data[*pos + 1] as usize;
        *pos += 2;

        let text_end = (*pos + entry_len).min(block_end);
        let text = String::from_utf8_lossy(&data[*pos..text_end]).into_owned();
        *pos = text_end;

        entries.push((entry_id, text));
    }

    *pos = block_end;
    Ok(TzxBlock::ArchiveInfo { entries })
}

fn parse_hardware_type(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 1, "Hardware Type count")?;
    let count = data[*pos] as usize;
    *pos += 1;

    need(data, *pos, count * 3, "Hardware Type entries")?;
    let entries = data[*pos..*pos + count * 3]
        .chunks_exact(3)
        .map(|e| (e[0], e[1], e[2]))
        .collect();
    *pos += count * 3;

    Ok(TzxBlock::HardwareType { entries })
}

fn parse_custom_info(data: &[u8], pos: &mut usize) -> Result<TzxBlock, TzxError> {
    need(data, *pos, 20, "Custom Info header")?;
    let id = String::from_utf8_lossy(&data[*pos..*pos + 16])
        .trim_end()
        .to_string();
    let len = read_u32_le(data, *pos + 16) as usize;
    *pos += 20;
    let info = take_bytes(data, pos, len, "Custom Info data")?;
    Ok(TzxBlock::CustomInfo { id, data: info })
}

/// Skip a documented block that carries no playable meaning here.
fn skip_unsupported_block(
    block_id: u8,
    data: &[u8],
    pos: &mut usize,
) -> Result<TzxBlock, TzxError> {
    let skip_len = match block_id {
        // $15: Direct recording, 8-byte header ending in a 3-byte length
        0x15 => {
            need(data, *pos, 8, "Direct Recording header")?;
            8 + read_u24_le(data, *pos + 5) as usize
        }
        // $18 CSW recording, $19 generalized data: 4-byte block length
        0x18 | 0x19 => {
            need(data, *pos, 4, "block length")?;
            4 + read_u32_le(data, *pos) as usize
        }
        // $23: Jump to block, one relative offset
        0x23 => 2,
        // $26: Call sequence, count of 2-byte offsets
        0x26 => {
            need(data, *pos, 2, "Call Sequence count")?;
            2 + read_u16_le(data, *pos) as usize * 2
        }
        // $28: Select block, 2-byte length prefix
        0x28 => {
            need(data, *pos, 2, "Select Block length")?;
            2 + read_u16_le(data, *pos) as usize
        }
        // $27: Return from sequence
        _ => 0,
    };

    need(data, *pos, skip_len, "Unsupported block")?;
    *pos += skip_len;
    log::debug!("Skipping TZX block ${block_id:02X}");
    Ok(TzxBlock::Unsupported { block_id })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a minimal TZX file from a header + raw block bytes.
    pub(crate) fn tzx_header() -> Vec<u8> {
        let mut h = MAGIC.to_vec();
        h.push(1); // major
        h.push(20); // minor
        h
    }

    pub(crate) fn standard_block(pause_ms: u16, data: &[u8]) -> Vec<u8> {
        let mut b = vec![0x10];
        b.extend_from_slice(&pause_ms.to_le_bytes());
        b.extend_from_slice(&(data.len() as u16).to_le_bytes());
        b.extend_from_slice(data);
        b
    }

    #[test]
    fn parse_empty_tzx() {
        let tzx = TzxFile::parse(&tzx_header()).expect("valid header");
        assert_eq!(tzx.major, 1);
        assert_eq!(tzx.minor, 20);
        assert!(tzx.blocks.is_empty());
    }

    #[test]
    fn short_file_is_rejected() {
        assert_eq!(
            TzxFile::parse(b"ZXTape!"),
            Err(TzxError::TooShort { len: 7 })
        );
    }

    #[test]
    fn invalid_magic_is_rejected() {
        let mut data = tzx_header();
        data[0] = b'X';
        assert_eq!(TzxFile::parse(&data), Err(TzxError::BadSignature));
    }

    #[test]
    fn standard_speed_block_uses_pause_then_length() {
        let mut data = tzx_header();
        data.extend(standard_block(1000, &[0x00, 0x03, 0xAA]));

        let tzx = TzxFile::parse(&data).expect("valid tzx");
        assert_eq!(
            tzx.blocks,
            vec![TzxBlock::StandardSpeed {
                pause_ms: 1000,
                data: vec![0x00, 0x03, 0xAA],
            }]
        );
    }

    #[test]
    fn truncated_data_reports_block_and_offset() {
        let mut data = tzx_header();
        data.extend(standard_block(1000, &[1, 2, 3, 4]));
        data.truncate(data.len() - 2);

        match TzxFile::parse(&data) {
            Err(TzxError::Truncated {
                block,
                offset,
                needed,
                remaining,
            }) => {
                assert_eq!(block, "Standard Speed data");
                assert_eq!(offset, 15);
                assert_eq!(needed, 4);
                assert_eq!(remaining, 2);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn unknown_block_id_fails_the_whole_file() {
        let mut data = tzx_header();
        data.extend(standard_block(0, &[0xFF]));
        data.push(0x7F);

        assert_eq!(
            TzxFile::parse(&data),
            Err(TzxError::UnknownBlock { id: 0x7F, offset: 16 })
        );
    }

    #[test]
    fn parse_turbo_speed_block() {
        let mut data = tzx_header();
        data.push(0x11);
        data.extend_from_slice(&1000u16.to_le_bytes()); // pilot
        data.extend_from_slice(&500u16.to_le_bytes()); // sync1
        data.extend_from_slice(&600u16.to_le_bytes()); // sync2
        data.extend_from_slice(&400u16.to_le_bytes()); // zero
        data.extend_from_slice(&800u16.to_le_bytes()); // one
        data.extend_from_slice(&2000u16.to_le_bytes()); // pilot count
        data.push(6); // used bits
        data.extend_from_slice(&500u16.to_le_bytes()); // pause
        data.extend_from_slice(&[2, 0, 0]); // length
        data.extend_from_slice(&[0xAB, 0xCD]);

        let tzx = TzxFile::parse(&data).expect("valid tzx");
        match &tzx.blocks[0] {
            TzxBlock::TurboSpeed {
                pilot_pulse,
                pilot_count,
                used_bits,
                pause_ms,
                data,
                ..
            } => {
                assert_eq!(*pilot_pulse, 1000);
                assert_eq!(*pilot_count, 2000);
                assert_eq!(*used_bits, 6);
                assert_eq!(*pause_ms, 500);
                assert_eq!(data, &[0xAB, 0xCD]);
            }
            other => panic!("Expected TurboSpeed, got {other:?}"),
        }
    }

    #[test]
    fn parse_control_and_info_blocks() {
        let mut data = tzx_header();
        data.extend_from_slice(&[0x21, 3, b'A', b'B', b'C']);
        data.push(0x22);
        data.extend_from_slice(&[0x24, 3, 0]);
        data.push(0x25);
        data.extend_from_slice(&[0x2A, 0, 0, 0, 0]);
        data.extend_from_slice(&[0x30, 2, b'H', b'i']);
        data.extend_from_slice(&[0x31, 5, 2, b'O', b'K']);
        data.extend_from_slice(&[0x32, 5, 0, 1, 0x00, 2, b'J', b'W']);
        data.extend_from_slice(&[0x33, 1, 0, 0x01, 3]);
        data.push(0x5A);
        data.extend_from_slice(b"XTape!\x1A\x01\x14");

        let tzx = TzxFile::parse(&data).expect("valid tzx");
        assert_eq!(
            tzx.blocks,
            vec![
                TzxBlock::GroupStart {
                    name: "ABC".to_string()
                },
                TzxBlock::GroupEnd,
                TzxBlock::LoopStart { repetitions: 3 },
                TzxBlock::LoopEnd,
                TzxBlock::StopIf48K,
                TzxBlock::TextDescription {
                    text: "Hi".to_string()
                },
                TzxBlock::Message {
                    display_secs: 5,
                    text: "OK".to_string()
                },
                TzxBlock::ArchiveInfo {
                    entries: vec![(0x00, "JW".to_string())]
                },
                TzxBlock::HardwareType {
                    entries: vec![(0, 0x01, 3)]
                },
                TzxBlock::Glue,
            ]
        );
        assert!(tzx.blocks.iter().all(|b| !b.is_playable()));
    }

    #[test]
    fn parse_pulse_sequence_and_pure_tone() {
        let mut data = tzx_header();
        data.extend_from_slice(&[0x12, 0x78, 0x08, 0x10, 0x00]);
        data.extend_from_slice(&[0x13, 2, 0x9B, 0x02, 0xDF, 0x02]);

        let tzx = TzxFile::parse(&data).expect("valid tzx");
        assert_eq!(
            tzx.blocks,
            vec![
                TzxBlock::PureTone {
                    pulse_len: 2168,
                    count: 16
                },
                TzxBlock::PulseSequence {
                    pulses: vec![667, 735]
                },
            ]
        );
    }

    #[test]
    fn skipped_recording_block_keeps_parsing() {
        let mut data = tzx_header();
        data.extend_from_slice(&[0x19, 3, 0, 0, 0, 0xDE, 0xAD, 0xBE]);
        data.extend_from_slice(&[0x20, 0xE8, 0x03]);

        let tzx = TzxFile::parse(&data).expect("valid tzx");
        assert_eq!(
            tzx.blocks,
            vec![
                TzxBlock::Unsupported { block_id: 0x19 },
                TzxBlock::Pause { duration_ms: 1000 },
            ]
        );
    }
}
