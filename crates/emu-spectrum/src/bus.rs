//! Spectrum bus: memory and I/O routing.
//!
//! The bus connects the Z80 to memory, the keyboard, the border and the tape
//! deck. Only port $FE is decoded; the 48K answers any even port.
//!
//! # Contention
//!
//! Accesses to $4000-$7FFF are delayed by the ULA. The CPU hands the bus the
//! tick at which the access starts; the bus turns it into a frame tact with
//! `frame_start_tick` and looks the wait states up in the shared contention
//! table. Port accesses are not contended.

use std::sync::Arc;

use emu_core::{Bus, ReadResult};
use format_tzx::TapePlayer;
use sinclair_ula::{BorderState, DisplayParameters};

use crate::keyboard::KeyboardState;
use crate::memory::Memory48K;

/// The Spectrum bus, implementing `emu_core::Bus`.
pub struct SpectrumBus {
    pub memory: Memory48K,
    pub keyboard: KeyboardState,
    pub border: BorderState,
    /// Tape deck feeding the EAR input, if a tape is inserted.
    pub tape: Option<TapePlayer>,
    /// CPU tick at which the current frame started.
    pub frame_start_tick: u64,
    /// Last value written to port $FE.
    pub last_fe_write: u8,
    /// EAR output (bit 4 of $FE); read back on bit 6 when no tape is playing.
    ear_out: bool,
    params: Arc<DisplayParameters>,
}

impl SpectrumBus {
    #[must_use]
    pub fn new(params: Arc<DisplayParameters>) -> Self {
        Self {
            memory: Memory48K::new(),
            keyboard: KeyboardState::new(),
            border: BorderState::new(),
            tape: None,
            frame_start_tick: 0,
            last_fe_write: 0,
            ear_out: true,
            params,
        }
    }

    /// Wait states for a memory access to `addr` starting at `tick`.
    fn contention(&self, addr: u16, tick: u64) -> u8 {
        if self.memory.contended_page(addr) {
            self.params
                .contention_value(tick.saturating_sub(self.frame_start_tick))
        } else {
            0
        }
    }

    /// EAR input level at `tick`.
    fn ear_in(&mut self, tick: u64) -> bool {
        match self.tape.as_mut() {
            Some(tape) if tape.is_playing() => tape.get_ear_bit(tick),
            _ => self.ear_out,
        }
    }
}

impl Bus for SpectrumBus {
    fn read(&mut self, addr: u16, tick: u64) -> ReadResult {
        ReadResult::with_wait(self.memory.read(addr), self.contention(addr, tick))
    }

    fn write(&mut self, addr: u16, value: u8, tick: u64) -> u8 {
        let wait = self.contention(addr, tick);
        self.memory.write(addr, value);
        wait
    }

    fn io_read(&mut self, port: u16, tick: u64) -> ReadResult {
        if port & 0x01 != 0 {
            return ReadResult::new(0xFF);
        }
        // Bits 0-4: keyboard, bit 5: always 1, bit 6: EAR input,
        // bit 7: always 1.
        let keyboard = self.keyboard.read((port >> 8) as u8) & 0x1F;
        let ear = if self.ear_in(tick) { 0x40 } else { 0x00 };
        ReadResult::new(keyboard | 0xA0 | ear)
    }

    fn io_write(&mut self, port: u16, value: u8, _tick: u64) -> u8 {
        if port & 0x01 == 0 {
            self.last_fe_write = value;
            // Bits 0-2: border colour, bit 3: MIC, bit 4: EAR/beeper
            self.border.set(value);
            self.ear_out = value & 0x10 != 0;
        }
        0
    }

    fn peek(&self, addr: u16) -> u8 {
        self.memory.peek(addr)
    }
}
