use thiserror::Error;

/// Failure to read a tape image. No partial image is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TzxError {
    #[error("tape image too short for header: {len} bytes")]
    TooShort { len: usize },

    #[error("invalid TZX signature (expected \"ZXTape!\" + 0x1A)")]
    BadSignature,

    #[error("truncated {block} at offset {offset}: need {needed} bytes, {remaining} remain")]
    Truncated {
        block: &'static str,
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("unknown TZX block ${id:02X} at offset {offset}")]
    UnknownBlock { id: u8, offset: usize },
}
