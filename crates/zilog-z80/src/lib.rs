//! Zilog Z80 CPU core.
//!
//! Each call to `step()` runs one micro-step: a prefix byte, the remainder of
//! an instruction, an interrupt acknowledge, or one HALT cycle. Every memory
//! and port access is timed against the tick counter so a bus can charge
//! contention before the access completes.

mod alu;
mod cpu;
mod flags;
mod registers;

pub use cpu::{Prefix, Z80, Z80Snapshot};
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use registers::Registers;
