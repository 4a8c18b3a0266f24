//! Z80 CPU state machine and bus timing.

mod execute;

use emu_core::{Bus, Cpu, Observable, Value};
use serde::{Deserialize, Serialize};

use crate::flags::{CF, HF, NF, PF, SF, ZF};
use crate::registers::Registers;

/// Prefix byte fetched by the previous step and still awaiting its opcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prefix {
    #[default]
    None,
    Cb,
    Ed,
    Dd,
    Fd,
}

/// Which register plays the role of HL for the current instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Index {
    Hl,
    Ix,
    Iy,
}

/// Serializable CPU state, enough to resume execution exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Z80Snapshot {
    pub regs: Registers,
    pub ticks: u64,
    pub prefix: Prefix,
    pub int_line: bool,
    pub ei_delay: bool,
}

/// The Z80 CPU.
#[derive(Debug, Clone)]
pub struct Z80 {
    pub(crate) regs: Registers,
    ticks: u64,
    prefix: Prefix,
    int_line: bool,
    nmi_pending: bool,
    /// Set by `EI`; holds off interrupts until after the next instruction.
    ei_delay: bool,
}

impl Z80 {
    #[must_use]
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            ticks: 0,
            prefix: Prefix::None,
            int_line: false,
            nmi_pending: false,
            ei_delay: false,
        };
        cpu.reset();
        cpu
    }

    #[must_use]
    pub fn regs(&self) -> &Registers {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    #[must_use]
    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    #[must_use]
    pub fn interrupt_line(&self) -> bool {
        self.int_line
    }

    #[must_use]
    pub fn snapshot(&self) -> Z80Snapshot {
        Z80Snapshot {
            regs: self.regs,
            ticks: self.ticks,
            prefix: self.prefix,
            int_line: self.int_line,
            ei_delay: self.ei_delay,
        }
    }

    pub fn restore(&mut self, snapshot: &Z80Snapshot) {
        self.regs = snapshot.regs;
        self.ticks = snapshot.ticks;
        self.prefix = snapshot.prefix;
        self.int_line = snapshot.int_line;
        self.ei_delay = snapshot.ei_delay;
        self.nmi_pending = false;
    }

    /// Length in bytes of the call-like instruction at PC, or 0.
    ///
    /// Call-like means control normally comes back to the following
    /// instruction: `CALL`, `CALL cc`, `RST`, `HALT` and the repeating block
    /// instructions. `peek` must read memory without side effects.
    pub fn call_instruction_length(&self, peek: impl Fn(u16) -> u8) -> u16 {
        let pc = self.regs.pc;
        match peek(pc) {
            0xCD => 3,
            op if op & 0xC7 == 0xC4 => 3,
            op if op & 0xC7 == 0xC7 => 1,
            0x76 => 1,
            0xED => match peek(pc.wrapping_add(1)) {
                0xB0..=0xB3 | 0xB8..=0xBB => 2,
                _ => 0,
            },
            _ => 0,
        }
    }

    /// Run one step. See the crate docs for what a step covers.
    pub fn step<B: Bus>(&mut self, bus: &mut B) {
        if self.prefix == Prefix::None {
            if self.nmi_pending {
                self.nmi_pending = false;
                self.accept_nmi(bus);
                return;
            }
            if self.int_line && self.regs.iff1 && !self.ei_delay {
                self.accept_interrupt(bus);
                return;
            }
            self.ei_delay = false;
            if self.regs.halted {
                // HALT keeps fetching the following byte and discarding it.
                let wait = bus.read(self.regs.pc, self.ticks).wait;
                self.delay(u32::from(wait));
                self.ticks += 4;
                self.increment_r();
                return;
            }
        }

        let opcode = self.fetch_opcode(bus);
        match self.prefix {
            Prefix::None => match opcode {
                0xCB => self.prefix = Prefix::Cb,
                0xDD => self.prefix = Prefix::Dd,
                0xED => self.prefix = Prefix::Ed,
                0xFD => self.prefix = Prefix::Fd,
                _ => self.execute_main(bus, opcode, Index::Hl),
            },
            Prefix::Cb => {
                self.prefix = Prefix::None;
                self.execute_cb(bus, opcode);
            }
            Prefix::Ed => {
                self.prefix = Prefix::None;
                self.execute_ed(bus, opcode);
            }
            Prefix::Dd | Prefix::Fd => {
                let index = if self.prefix == Prefix::Dd {
                    Index::Ix
                } else {
                    Index::Iy
                };
                match opcode {
                    // A repeated index prefix replaces the previous one.
                    0xDD => self.prefix = Prefix::Dd,
                    0xFD => self.prefix = Prefix::Fd,
                    0xED => self.prefix = Prefix::Ed,
                    0xCB => {
                        self.prefix = Prefix::None;
                        self.execute_index_cb(bus, index);
                    }
                    _ => {
                        self.prefix = Prefix::None;
                        self.execute_main(bus, opcode, index);
                    }
                }
            }
        }
    }

    fn accept_interrupt<B: Bus>(&mut self, bus: &mut B) {
        self.regs.halted = false;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.increment_r();
        // Acknowledge cycle: M1 stretched by two wait states plus one
        // internal tact before the push.
        self.ticks += 7;
        let pc = self.regs.pc;
        self.push(bus, pc);
        if self.regs.im == 2 {
            let vector = u16::from(self.regs.i) << 8 | 0xFF;
            self.regs.pc = self.read_word(bus, vector);
        } else {
            self.regs.pc = 0x0038;
        }
    }

    fn accept_nmi<B: Bus>(&mut self, bus: &mut B) {
        self.regs.halted = false;
        self.regs.iff1 = false;
        self.increment_r();
        self.ticks += 5;
        let pc = self.regs.pc;
        self.push(bus, pc);
        self.regs.pc = 0x0066;
    }

    fn increment_r(&mut self) {
        self.regs.r = (self.regs.r & 0x80) | (self.regs.r.wrapping_add(1) & 0x7F);
    }

    // Timed bus access. Wait states are applied before the access cost.

    fn fetch_opcode<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let pc = self.regs.pc;
        let result = bus.read(pc, self.ticks);
        self.delay(u32::from(result.wait));
        self.ticks += 4;
        self.regs.pc = pc.wrapping_add(1);
        self.increment_r();
        result.data
    }

    pub(crate) fn read_byte<B: Bus>(&mut self, bus: &mut B, address: u16) -> u8 {
        let result = bus.read(address, self.ticks);
        self.delay(u32::from(result.wait));
        self.ticks += 3;
        result.data
    }

    pub(crate) fn write_byte<B: Bus>(&mut self, bus: &mut B, address: u16, value: u8) {
        let wait = bus.write(address, value, self.ticks);
        self.delay(u32::from(wait));
        self.ticks += 3;
    }

    pub(crate) fn fetch_byte<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let pc = self.regs.pc;
        self.regs.pc = pc.wrapping_add(1);
        self.read_byte(bus, pc)
    }

    pub(crate) fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch_byte(bus);
        let hi = self.fetch_byte(bus);
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn read_word<B: Bus>(&mut self, bus: &mut B, address: u16) -> u16 {
        let lo = self.read_byte(bus, address);
        let hi = self.read_byte(bus, address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn write_word<B: Bus>(&mut self, bus: &mut B, address: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_byte(bus, address, lo);
        self.write_byte(bus, address.wrapping_add(1), hi);
    }

    pub(crate) fn push<B: Bus>(&mut self, bus: &mut B, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_byte(bus, self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_byte(bus, self.regs.sp, lo);
    }

    pub(crate) fn pop<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read_byte(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read_byte(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn port_in<B: Bus>(&mut self, bus: &mut B, port: u16) -> u8 {
        let result = bus.io_read(port, self.ticks);
        self.delay(u32::from(result.wait));
        self.ticks += 4;
        result.data
    }

    pub(crate) fn port_out<B: Bus>(&mut self, bus: &mut B, port: u16, value: u8) {
        let wait = bus.io_write(port, value, self.ticks);
        self.delay(u32::from(wait));
        self.ticks += 4;
    }

    /// Internal cycles with no bus activity.
    pub(crate) fn internal(&mut self, ticks: u64) {
        self.ticks += ticks;
    }

    /// Evaluate condition code `cc` (NZ, Z, NC, C, PO, PE, P, M).
    pub(crate) fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f;
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu for Z80 {
    type Registers = Registers;

    fn step<B: Bus>(&mut self, bus: &mut B) {
        Z80::step(self, bus);
    }

    fn is_in_op_execution(&self) -> bool {
        self.prefix != Prefix::None
    }

    fn ticks(&self) -> u64 {
        self.ticks
    }

    fn delay(&mut self, ticks: u32) {
        self.ticks += u64::from(ticks);
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.regs.halted
    }

    fn set_interrupt_line(&mut self, active: bool) {
        self.int_line = active;
    }

    fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    fn reset(&mut self) {
        self.regs = Registers {
            a: 0xFF,
            f: 0xFF,
            sp: 0xFFFF,
            ..Registers::default()
        };
        self.ticks = 0;
        self.prefix = Prefix::None;
        self.int_line = false;
        self.nmi_pending = false;
        self.ei_delay = false;
    }
}

const QUERY_PATHS: &[&str] = &[
    "pc", "sp", "a", "f", "b", "c", "d", "e", "h", "l", "af", "bc", "de", "hl", "ix", "iy", "i",
    "r", "im", "iff1", "iff2", "halted", "ticks", "flags.s", "flags.z", "flags.h", "flags.pv",
    "flags.n", "flags.c",
];

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        let flag = |mask: u8| Value::Bool(r.f & mask != 0);
        let value = match path {
            "pc" => r.pc.into(),
            "sp" => r.sp.into(),
            "a" => r.a.into(),
            "f" => r.f.into(),
            "b" => r.b.into(),
            "c" => r.c.into(),
            "d" => r.d.into(),
            "e" => r.e.into(),
            "h" => r.h.into(),
            "l" => r.l.into(),
            "af" => r.af().into(),
            "bc" => r.bc().into(),
            "de" => r.de().into(),
            "hl" => r.hl().into(),
            "ix" => r.ix.into(),
            "iy" => r.iy.into(),
            "i" => r.i.into(),
            "r" => r.r.into(),
            "im" => r.im.into(),
            "iff1" => r.iff1.into(),
            "iff2" => r.iff2.into(),
            "halted" => r.halted.into(),
            "ticks" => self.ticks.into(),
            "flags.s" => flag(SF),
            "flags.z" => flag(ZF),
            "flags.h" => flag(HF),
            "flags.pv" => flag(PF),
            "flags.n" => flag(NF),
            "flags.c" => flag(CF),
            _ => return None,
        };
        Some(value)
    }

    fn query_paths(&self) -> &'static [&'static str] {
        QUERY_PATHS
    }
}
