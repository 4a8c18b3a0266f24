//! Master clock and wall-clock pacing.

use std::thread;
use std::time::{Duration, Instant};

use crate::CancellationToken;

/// Master clock configuration for a system.
///
/// The 48K Spectrum's CPU and ULA both count in 3.5 MHz tacts, so one
/// frequency describes every timing relationship in the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Tact frequency in Hz (`3_500_000` for the 48K).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Tacts in one millisecond.
    #[must_use]
    pub const fn ticks_per_millisecond(&self) -> u64 {
        self.frequency_hz / 1000
    }
}

/// A monotonically increasing host counter.
pub trait WallClock {
    /// Current counter value.
    fn counter(&self) -> u64;

    /// Counter increments per second.
    fn frequency(&self) -> u64;
}

/// [`WallClock`] backed by [`Instant`], counting nanoseconds.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for SystemClock {
    fn counter(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn frequency(&self) -> u64 {
        1_000_000_000
    }
}

/// Below this much remaining time the wait spins instead of sleeping.
const SPIN_WINDOW: Duration = Duration::from_millis(2);

/// Longest single sleep, so cancellation is noticed promptly.
const MAX_SLEEP: Duration = Duration::from_millis(5);

/// Converts between machine ticks and a host counter, and blocks until
/// counter deadlines.
pub struct Clock {
    source: Box<dyn WallClock>,
}

impl Clock {
    #[must_use]
    pub fn new(source: Box<dyn WallClock>) -> Self {
        Self { source }
    }

    #[must_use]
    pub fn native_counter(&self) -> u64 {
        self.source.counter()
    }

    #[must_use]
    pub fn frequency(&self) -> u64 {
        self.source.frequency()
    }

    /// Counter value at which frame number `frame_index` (0-based, counted
    /// from `start`) should be finished, for frames of `frame_ticks` machine
    /// ticks.
    #[must_use]
    pub fn frame_deadline(
        &self,
        start: u64,
        frame_index: u64,
        frame_ticks: u64,
        clock: MasterClock,
    ) -> u64 {
        let ticks = frame_ticks.saturating_mul(frame_index + 1);
        start.saturating_add(self.ticks_to_counter(ticks, clock))
    }

    /// Number of counter increments covering `ticks` machine ticks.
    #[must_use]
    pub fn ticks_to_counter(&self, ticks: u64, clock: MasterClock) -> u64 {
        let scaled =
            u128::from(ticks) * u128::from(self.frequency()) / u128::from(clock.frequency_hz.max(1));
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }

    /// Block until the counter reaches `target`.
    ///
    /// Returns `false` if `cancel` fired before the deadline. A token that is
    /// already cancelled returns immediately without waiting.
    pub fn wait_until(&self, target: u64, cancel: &CancellationToken) -> bool {
        let frequency = self.frequency().max(1);
        loop {
            if cancel.is_cancelled() {
                log::trace!("pacing wait cancelled");
                return false;
            }
            let now = self.native_counter();
            if now >= target {
                return true;
            }
            let remaining_nanos =
                u128::from(target - now) * 1_000_000_000 / u128::from(frequency);
            let remaining = Duration::from_nanos(u64::try_from(remaining_nanos).unwrap_or(u64::MAX));
            if remaining > SPIN_WINDOW {
                thread::sleep((remaining - SPIN_WINDOW).min(MAX_SLEEP));
            } else {
                std::hint::spin_loop();
            }
        }
    }
}
