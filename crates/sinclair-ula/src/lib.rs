//! Sinclair ULA for the 48K Spectrum.
//!
//! The ULA owns the frame: it decides when the CPU is interrupted, which
//! memory accesses are slowed down by screen fetches, and what the beam
//! draws at every tact.
//!
//! # Standalone IC
//!
//! Screen memory is read through closures passed by the caller and pixels
//! leave through a [`PixelSink`], so the crate knows nothing about the
//! machine's memory map or the host display.
//!
//! # Timing (48K PAL)
//!
//! - 224 T-states per line, 312 lines, 69,888 T-states per frame, 50 Hz
//! - INT asserted for 32 T-states from frame tact 0
//! - Contention `[6, 5, 4, 3, 2, 1, 0, 0]` from tact 14,335 for the first
//!   128 T-states of each of the 192 display lines
//!
//! # Screen memory layout
//!
//! Bitmap at $4000-$57FF, attributes at $5800-$5AFF.

#![allow(clippy::cast_possible_truncation)]

mod border;
mod display;
mod interrupt;
mod palette;
mod screen;
mod sink;

pub use border::BorderState;
pub use display::{
    BORDER_PIXELS, CONTENTION_START, DisplayParameters, FRAME_TACTS, LINE_TACTS, RASTER_LINES,
    REFRESH_RATE, RenderingTact, SCREEN_HEIGHT, SCREEN_WIDTH,
};
pub use interrupt::{INT_PULSE_TACTS, InterruptDevice, InterruptState};
pub use palette::PALETTE;
pub use screen::ScreenDevice;
pub use sink::{FrameBuffer, PixelSink};
