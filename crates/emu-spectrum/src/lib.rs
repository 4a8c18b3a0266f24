//! Tact-accurate ZX Spectrum 48K.
//!
//! [`Spectrum`] ties the Z80, the ULA's screen and interrupt devices, the
//! keyboard and a tape player together on one bus, and runs them with
//! [`Spectrum::execute_cycle`]. Frames are paced against a wall clock, can
//! be cancelled at any step, and resume exactly where they stopped.
//!
//! Pixels leave through any [`PixelSink`](sinclair_ula::PixelSink); the
//! ROM comes from a [`RomProvider`].

mod bus;
#[cfg(feature = "capture")]
pub mod capture;
mod config;
mod debug;
mod keyboard;
mod memory;
mod rom;
mod spectrum;

pub use bus::SpectrumBus;
pub use config::{CPU_FREQUENCY, DEFAULT_ROM_NAME, SpectrumConfig};
pub use debug::{BreakpointSet, DebugInfoProvider, DebugStepMode, is_debug_stop};
pub use keyboard::{KeyboardState, SpectrumKey};
pub use memory::Memory48K;
pub use rom::{RomProvider, StaticRom};
pub use spectrum::{EmulationMode, ExecutionState, MachineState, Spectrum};
