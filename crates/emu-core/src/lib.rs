//! Core traits and types for tact-accurate emulation.
//!
//! The CPU talks to the rest of the machine through [`Bus`], which is told
//! the current tick on every access and answers with the wait states the
//! access costs. Real-time pacing goes through [`Clock`], and every blocking
//! operation honours a [`CancellationToken`].

mod bus;
mod cancel;
mod clock;
mod cpu;
mod observable;

pub use bus::{Bus, ReadResult, SimpleBus};
pub use cancel::CancellationToken;
pub use clock::{Clock, MasterClock, SystemClock, WallClock};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
