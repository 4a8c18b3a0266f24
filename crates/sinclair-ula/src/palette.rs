//! ZX Spectrum 16-colour palette.
//!
//! 3-bit GRB colours with a BRIGHT modifier. Normal colours use intensity
//! 0xCD, bright ones 0xFF. Black is the same either way.

/// ARGB32 palette indexed by `bright << 3 | colour`.
pub const PALETTE: [u32; 16] = [
    0xFF00_0000, // black
    0xFF00_00CD, // blue
    0xFFCD_0000, // red
    0xFFCD_00CD, // magenta
    0xFF00_CD00, // green
    0xFF00_CDCD, // cyan
    0xFFCD_CD00, // yellow
    0xFFCD_CDCD, // white
    0xFF00_0000,
    0xFF00_00FF,
    0xFFFF_0000,
    0xFFFF_00FF,
    0xFF00_FF00,
    0xFF00_FFFF,
    0xFFFF_FF00,
    0xFFFF_FFFF,
];
