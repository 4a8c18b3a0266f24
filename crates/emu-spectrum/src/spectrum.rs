//! Top-level Spectrum system.
//!
//! # Execution cycle
//!
//! [`Spectrum::execute_cycle`] drives the Z80 one step at a time against the
//! frame clock. After every step the screen device renders the tacts that
//! elapsed, so the picture is built in step with the CPU. Each completed
//! frame is signed ready on the pixel sink and, unless cancelled, the call
//! blocks until the wall clock catches up with the emulated time before
//! rolling into the next frame.
//!
//! A call can end early: on a debugger stop, after a single instruction, on
//! HALT, at a frame boundary, or when the cancellation token fires. The frame
//! in progress is always resumed exactly by the next call.
//!
//! # Frame layout
//!
//! Frame tact 0 is the start of the INT pulse. 69,888 tacts per frame; tacts
//! carried past the end of a frame by the last instruction are counted
//! into the next one.

#![allow(clippy::cast_possible_truncation)]

use std::sync::Arc;

use emu_core::{CancellationToken, Clock, Cpu, MasterClock, Observable, Value};
use format_tzx::{PlayPhase, TapePlayer};
use serde::{Deserialize, Serialize};
use sinclair_ula::{
    BorderState, DisplayParameters, InterruptDevice, InterruptState, PixelSink, ScreenDevice,
};
use zilog_z80::{Registers, Z80, Z80Snapshot};

use crate::bus::SpectrumBus;
use crate::config::SpectrumConfig;
use crate::debug::{self, DebugInfoProvider, DebugStepMode};
use crate::keyboard::SpectrumKey;
use crate::memory::Memory48K;
use crate::rom::RomProvider;

/// When a call to [`Spectrum::execute_cycle`] hands control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmulationMode {
    /// Run until cancelled.
    #[default]
    Continuous,
    /// Run until the debugger stepping policy asks to stop.
    Debugger,
    /// Return after one complete instruction.
    SingleInstruction,
    /// Return once the CPU is halted.
    UntilHalt,
    /// Return when the frame is complete, before pacing.
    UntilFrameEnds,
    /// Return after the frame is complete and paced.
    UntilNextFrame,
    /// Return after rolling into the next frame.
    UntilNextFrameCycle,
}

/// Frame bookkeeping carried between calls to [`Spectrum::execute_cycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// CPU tick at which the current frame started.
    pub frame_start_tick: u64,
    /// Last frame tact rendered, -1 when nothing is rendered yet.
    pub last_rendered_tact: i64,
    pub frame_in_progress: bool,
    /// The current frame is complete and signed ready; the next call rolls
    /// into the following frame first.
    pub frame_ready: bool,
    pub frames_completed: u64,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self {
            frame_start_tick: 0,
            last_rendered_tact: -1,
            frame_in_progress: false,
            frame_ready: false,
            frames_completed: 0,
        }
    }
}

/// Everything needed to resume a machine exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    pub cpu: Z80Snapshot,
    pub execution: ExecutionState,
    /// The full 64K address space, ROM included.
    pub memory: Vec<u8>,
    pub border: u8,
    pub last_fe_write: u8,
    pub interrupt_signaled: bool,
    /// Frame tact at which a held INT line drops.
    pub interrupt_line_until: Option<u64>,
    /// Frames opened by the screen device; sets the FLASH phase.
    pub screen_frames: u64,
}

/// ZX Spectrum 48K.
pub struct Spectrum<S: PixelSink> {
    config: SpectrumConfig,
    cpu: Z80,
    bus: SpectrumBus,
    params: Arc<DisplayParameters>,
    screen: ScreenDevice,
    /// Renders whole frames on demand, independent of the primary cursor.
    shadow_screen: ScreenDevice,
    interrupt: InterruptDevice,
    clock: Clock,
    master_clock: MasterClock,
    sink: S,
    debug: Option<Box<dyn DebugInfoProvider>>,
    state: ExecutionState,
}

impl<S: PixelSink> Spectrum<S> {
    /// Build a machine, loading the configured ROM from `roms`.
    ///
    /// A missing ROM leaves the bottom 16K zeroed.
    pub fn new(
        mut config: SpectrumConfig,
        roms: &dyn RomProvider,
        clock: Clock,
        sink: S,
    ) -> Self {
        let params = Arc::new(DisplayParameters::zx_spectrum_48());
        let last_tact = params.frame_tacts() - 1;
        if config.interrupt_tact > last_tact {
            log::warn!(
                "Interrupt tact {} is past the frame; using {last_tact}",
                config.interrupt_tact
            );
            config.interrupt_tact = last_tact;
        }
        let mut bus = SpectrumBus::new(Arc::clone(&params));
        match roms.load_rom(&config.rom_name) {
            Some(image) => {
                let loaded = bus.memory.load_rom(&image);
                log::info!("Loaded ROM {} ({loaded} bytes)", config.rom_name);
            }
            None => log::warn!("ROM {} not available; memory left empty", config.rom_name),
        }

        Self {
            master_clock: MasterClock::new(config.cpu_frequency),
            interrupt: InterruptDevice::new(config.interrupt_tact),
            screen: ScreenDevice::new(Arc::clone(&params)),
            shadow_screen: ScreenDevice::new(Arc::clone(&params)),
            config,
            cpu: Z80::new(),
            bus,
            params,
            clock,
            sink,
            debug: None,
            state: ExecutionState::default(),
        }
    }

    /// Power-cycle the CPU and the frame. Memory and the tape are kept.
    pub fn reset(&mut self) {
        Cpu::reset(&mut self.cpu);
        self.bus.frame_start_tick = 0;
        self.bus.border = BorderState::new();
        self.bus.keyboard.release_all();
        self.screen.reset();
        self.shadow_screen.reset();
        self.interrupt = InterruptDevice::new(self.config.interrupt_tact);
        self.state = ExecutionState::default();
    }

    #[must_use]
    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    #[must_use]
    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    #[must_use]
    pub fn registers(&self) -> Registers {
        *self.cpu.regs()
    }

    /// CPU tacts since reset.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.cpu.ticks()
    }

    /// Read memory without side effects.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        self.bus.memory.peek(addr)
    }

    #[must_use]
    pub fn memory(&self) -> &Memory48K {
        &self.bus.memory
    }

    /// CPU-style write: ROM stays read-only.
    pub fn write_memory(&mut self, addr: u16, value: u8) {
        self.bus.memory.write(addr, value);
    }

    /// Copy `code` to `addr`, ROM included.
    pub fn load_code(&mut self, addr: u16, code: &[u8]) {
        self.bus.memory.load(addr, code);
    }

    #[must_use]
    pub fn border(&self) -> u8 {
        self.bus.border.colour()
    }

    pub fn press_key(&mut self, key: SpectrumKey) {
        self.bus.keyboard.set_status(key, true);
    }

    pub fn release_key(&mut self, key: SpectrumKey) {
        self.bus.keyboard.set_status(key, false);
    }

    pub fn release_all_keys(&mut self) {
        self.bus.keyboard.release_all();
    }

    /// Insert a tape and start playing it from the current tick.
    pub fn insert_tape(&mut self, mut tape: TapePlayer) {
        tape.init_play(self.cpu.ticks());
        log::info!("Tape inserted: {} blocks", tape.blocks().len());
        self.bus.tape = Some(tape);
    }

    pub fn eject_tape(&mut self) -> Option<TapePlayer> {
        self.bus.tape.take()
    }

    #[must_use]
    pub fn tape(&self) -> Option<&TapePlayer> {
        self.bus.tape.as_ref()
    }

    /// Render a complete frame of the current memory and border into
    /// `target`, leaving the primary frame untouched.
    pub fn refresh_shadow_screen(&mut self, target: &mut dyn PixelSink) {
        let memory = &self.bus.memory;
        self.shadow_screen.start_new_frame(target);
        self.shadow_screen.render_screen(
            0,
            self.params.frame_tacts() - 1,
            self.bus.border.colour(),
            |addr| memory.peek(addr),
            target,
        );
        self.shadow_screen.sign_frame_ready(target);
    }

    #[must_use]
    pub fn execution_state(&self) -> ExecutionState {
        ExecutionState {
            last_rendered_tact: self
                .screen
                .last_rendered_tact()
                .map_or(-1, i64::from),
            ..self.state
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MachineState {
        MachineState {
            cpu: self.cpu.snapshot(),
            execution: self.execution_state(),
            memory: self.bus.memory.as_slice().to_vec(),
            border: self.bus.border.colour(),
            last_fe_write: self.bus.last_fe_write,
            interrupt_signaled: self.interrupt.state() == InterruptState::Signaled,
            interrupt_line_until: self.interrupt.line_until(),
            screen_frames: self.screen.frame_count(),
        }
    }

    /// Resume from a saved state. The pixel sink, debugger and tape are kept.
    pub fn restore(&mut self, saved: &MachineState) {
        self.cpu.restore(&saved.cpu);
        self.bus.memory.load(0, &saved.memory);
        self.bus.border.set(saved.border);
        self.bus.last_fe_write = saved.last_fe_write;
        self.bus.frame_start_tick = saved.execution.frame_start_tick;
        self.interrupt
            .restore(saved.interrupt_signaled, saved.interrupt_line_until);
        self.screen.restore_frame_count(saved.screen_frames);
        self.screen
            .resume_after(u32::try_from(saved.execution.last_rendered_tact).ok());
        self.state = saved.execution;
    }

    pub fn set_debug_info_provider(&mut self, provider: Option<Box<dyn DebugInfoProvider>>) {
        self.debug = provider;
    }

    pub fn debug_info_provider_mut(&mut self) -> Option<&mut (dyn DebugInfoProvider + 'static)> {
        self.debug.as_deref_mut()
    }

    #[must_use]
    pub fn pixel_sink(&self) -> &S {
        &self.sink
    }

    pub fn pixel_sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Tacts elapsed in the current frame.
    #[must_use]
    pub fn frame_tact(&self) -> u64 {
        self.cpu.ticks().saturating_sub(self.state.frame_start_tick)
    }

    /// Run the machine according to `mode`.
    ///
    /// Returns `true` when the run stopped where `mode` asked it to and
    /// `false` when `cancel` ended it first.
    pub fn execute_cycle(
        &mut self,
        cancel: &CancellationToken,
        mode: EmulationMode,
        step_mode: DebugStepMode,
    ) -> bool {
        let pacing_origin = self.clock.native_counter();
        let mut paced_frames = 0u64;
        let frame_tacts = u64::from(self.params.frame_tacts());
        let mut executed: i64 = -1;

        self.enter_frame();

        loop {
            while self.cpu.is_in_op_execution() || self.frame_tact() < frame_tacts {
                if !self.cpu.is_in_op_execution() {
                    executed += 1;
                    if mode == EmulationMode::Debugger && self.is_debug_stop(step_mode, executed) {
                        log::debug!("Debugger stop at {:#06X}", self.cpu.pc());
                        self.screen.sign_frame_ready(&mut self.sink);
                        return true;
                    }
                }

                let frame_tact = self.frame_tact();
                self.interrupt.check_for_interrupt(frame_tact, &mut self.cpu);
                self.cpu.step(&mut self.bus);
                if cancel.is_cancelled() {
                    return false;
                }
                self.render_to(self.frame_tact());

                if !self.cpu.is_in_op_execution() {
                    match mode {
                        EmulationMode::SingleInstruction => return true,
                        EmulationMode::UntilHalt if self.cpu.is_halted() => return true,
                        _ => {}
                    }
                }
            }

            if !self.state.frame_ready {
                self.render_to(frame_tacts - 1);
                self.screen.sign_frame_ready(&mut self.sink);
                self.state.frame_ready = true;
                self.state.frames_completed += 1;
                log::trace!("Frame {} complete", self.state.frames_completed);
            }
            if mode == EmulationMode::UntilFrameEnds {
                return true;
            }

            if !cancel.is_cancelled() {
                let deadline = self.clock.frame_deadline(
                    pacing_origin,
                    paced_frames,
                    frame_tacts,
                    self.master_clock,
                );
                if !self.clock.wait_until(deadline, cancel) {
                    return false;
                }
                paced_frames += 1;
            }
            if mode == EmulationMode::UntilNextFrame {
                return true;
            }

            self.roll_over_frame();
            if mode == EmulationMode::UntilNextFrameCycle {
                return true;
            }
            if cancel.is_cancelled() {
                return false;
            }
        }
    }

    /// Open a frame, or move past one a previous call already completed.
    fn enter_frame(&mut self) {
        if !self.state.frame_in_progress {
            self.state.frame_start_tick = self.cpu.ticks();
            self.bus.frame_start_tick = self.state.frame_start_tick;
            self.screen.start_new_frame(&mut self.sink);
            self.interrupt.reset(u64::from(self.params.frame_tacts()));
            self.state.frame_in_progress = true;
            self.state.frame_ready = false;
        } else if self.state.frame_ready {
            self.roll_over_frame();
        }
    }

    /// Start the next frame, keeping the tacts already run past the boundary.
    fn roll_over_frame(&mut self) {
        let frame_tacts = u64::from(self.params.frame_tacts());
        let remaining = self.frame_tact() % frame_tacts;
        self.state.frame_start_tick = self.cpu.ticks() - remaining;
        self.bus.frame_start_tick = self.state.frame_start_tick;
        self.screen.start_new_frame(&mut self.sink);
        self.interrupt.reset(frame_tacts);
        self.state.frame_ready = false;
        self.render_to(remaining);
        log::trace!(
            "Frame {} starts at tick {} ({remaining} tacts carried)",
            self.state.frames_completed,
            self.state.frame_start_tick
        );
    }

    /// Render every tact not yet drawn up to `frame_tact`.
    fn render_to(&mut self, frame_tact: u64) {
        let last = u64::from(self.params.frame_tacts() - 1);
        let to = frame_tact.min(last) as u32;
        let from = self.screen.last_rendered_tact().map_or(0, |tact| tact + 1);
        let memory = &self.bus.memory;
        self.screen.render_screen(
            from,
            to,
            self.bus.border.colour(),
            |addr| memory.peek(addr),
            &mut self.sink,
        );
    }

    fn is_debug_stop(&mut self, step_mode: DebugStepMode, executed: i64) -> bool {
        let pc = self.cpu.pc();
        let memory = &self.bus.memory;
        let call_length = self.cpu.call_instruction_length(|addr| memory.peek(addr));
        debug::is_debug_stop(self.debug.as_deref_mut(), step_mode, executed, pc, call_length)
    }
}

fn parse_address(text: &str) -> Option<u16> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else if let Some(hex) = text.strip_prefix('$') {
        u16::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

impl<S: PixelSink> Observable for Spectrum<S> {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("ula.") {
            match rest {
                "border" => Some(self.bus.border.colour().into()),
                "frame_tact" => Some(self.frame_tact().into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("memory.") {
            parse_address(rest).map(|addr| Value::U8(self.bus.memory.peek(addr)))
        } else {
            match path {
                "machine.frames" => Some(self.state.frames_completed.into()),
                "tape.phase" => {
                    let phase = self.bus.tape.as_ref().map_or(PlayPhase::None, TapePlayer::phase);
                    Some(Value::String(format!("{phase:?}")))
                }
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<z80_paths>",
            "ula.border",
            "ula.frame_tact",
            "memory.<address>",
            "machine.frames",
            "tape.phase",
        ]
    }
}
