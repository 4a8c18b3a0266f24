//! ZX Spectrum tape images.
//!
//! A tape is a list of blocks. [`TzxFile`] and [`TapFile`] read the two
//! common containers, [`PulseBlock`] turns one playable block into the EAR
//! level at any tact, and [`TapePlayer`] walks the block list, handling
//! loops and stop markers.
//!
//! Sampling is lazy: nothing runs per T-state. The caller asks for the EAR
//! bit at a tact and the generator catches up from the last sampled tact, so
//! tacts must be non-decreasing.
//!
//! Reference: <https://worldofspectrum.net/TZXformat.html>

mod error;
mod player;
mod pulse;
mod tap;
mod tzx;

pub use error::TzxError;
pub use player::TapePlayer;
pub use pulse::{
    BIT_0_PL, BIT_1_PL, DATA_PILOT_COUNT, HEADER_PILOT_COUNT, PILOT_PL, PlayPhase, PulseBlock,
    SYNC_1_PL, SYNC_2_PL, TACTS_PER_MS,
};
pub use tap::{TAP_PAUSE_MS, TapFile};
pub use tzx::{TzxBlock, TzxFile};
