//! Frame interrupt generator.

use emu_core::Cpu;

/// Length of the INT pulse in tacts.
pub const INT_PULSE_TACTS: u64 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptState {
    /// Waiting for this frame's interrupt tact.
    Armed,
    /// This frame's interrupt has been raised.
    Signaled,
}

/// Raises the CPU's INT line once per frame.
///
/// The line stays asserted for [`INT_PULSE_TACTS`]; a CPU with interrupts
/// disabled for the whole pulse misses that frame's interrupt, as on the
/// real machine.
#[derive(Debug, Clone)]
pub struct InterruptDevice {
    interrupt_tact: u64,
    state: InterruptState,
    /// Frame tact at which the asserted line drops; `None` while released.
    line_until: Option<u64>,
}

impl InterruptDevice {
    #[must_use]
    pub fn new(interrupt_tact: u32) -> Self {
        Self {
            interrupt_tact: u64::from(interrupt_tact),
            state: InterruptState::Armed,
            line_until: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> InterruptState {
        self.state
    }

    #[must_use]
    pub fn interrupt_tact(&self) -> u64 {
        self.interrupt_tact
    }

    /// Poll at `frame_tact`. Signals at most once between resets.
    pub fn check_for_interrupt<C: Cpu>(&mut self, frame_tact: u64, cpu: &mut C) {
        if self.line_until.is_some_and(|end| frame_tact >= end) {
            self.line_until = None;
            cpu.set_interrupt_line(false);
        }
        if self.state == InterruptState::Armed && frame_tact >= self.interrupt_tact {
            self.state = InterruptState::Signaled;
            let pulse_end = self.interrupt_tact + INT_PULSE_TACTS;
            if frame_tact < pulse_end {
                log::trace!("INT raised at frame tact {frame_tact}");
                self.line_until = Some(pulse_end);
                cpu.set_interrupt_line(true);
            } else {
                log::debug!("INT pulse already over at frame tact {frame_tact}");
            }
        }
    }

    /// Re-arm for the next frame of `frame_tacts` tacts. A pulse still
    /// running keeps its remaining length in the new frame.
    pub fn reset(&mut self, frame_tacts: u64) {
        self.state = InterruptState::Armed;
        self.line_until = self
            .line_until
            .map(|end| end.saturating_sub(frame_tacts));
    }

    /// Whether this device is currently holding the INT line.
    #[must_use]
    pub fn line_active(&self) -> bool {
        self.line_until.is_some()
    }

    /// Frame tact at which the held INT line drops.
    #[must_use]
    pub fn line_until(&self) -> Option<u64> {
        self.line_until
    }

    /// Restore a saved state. The CPU's own INT line is restored separately.
    pub fn restore(&mut self, signaled: bool, line_until: Option<u64>) {
        self.state = if signaled {
            InterruptState::Signaled
        } else {
            InterruptState::Armed
        };
        self.line_until = line_until;
    }
}
