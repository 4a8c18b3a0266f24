//! CPU core trait.

use crate::Bus;

/// A CPU core.
///
/// The CPU advances in steps. A step is either a whole instruction or a
/// sub-step of one (a prefix byte, say); [`Cpu::is_in_op_execution`] tells
/// the two apart so the caller knows where instruction boundaries fall.
pub trait Cpu {
    /// The type used for register inspection.
    type Registers;

    /// Execute one step against the bus.
    fn step<B: Bus>(&mut self, bus: &mut B);

    /// True while an instruction has started but not finished.
    fn is_in_op_execution(&self) -> bool;

    /// Ticks elapsed since reset.
    fn ticks(&self) -> u64;

    /// Add `ticks` to the tick counter without touching architectural state.
    fn delay(&mut self, ticks: u32);

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Drive the maskable interrupt line.
    fn set_interrupt_line(&mut self, active: bool);

    /// Request a non-maskable interrupt.
    fn nmi(&mut self);

    /// Reset the CPU to its initial state.
    fn reset(&mut self);
}
