//! Whole-program timing tests.
//!
//! Each program is loaded at 0x0000 and run either until the CPU halts or
//! until PC leaves the loaded code. The tick totals are sums of the
//! documented T-state counts.

use emu_core::{Bus, Cpu, ReadResult, SimpleBus};
use zilog_z80::{PF, Registers, Z80};

enum RunMode {
    UntilHalt,
    UntilEnd,
}

fn run(code: &[u8], mode: RunMode) -> (Registers, u64) {
    let mut bus = SimpleBus::new();
    bus.load(0, code);
    let mut cpu = Z80::new();
    let end = code.len() as u16;
    for _ in 0..10_000 {
        cpu.step(&mut bus);
        if cpu.is_in_op_execution() {
            continue;
        }
        match mode {
            RunMode::UntilHalt if cpu.is_halted() => break,
            RunMode::UntilEnd if cpu.pc() >= end => break,
            _ => {}
        }
    }
    (cpu.registers(), cpu.ticks())
}

#[test]
fn ret_po_returns_when_parity_odd() {
    let (regs, ticks) = run(
        &[
            0x3E, 0x2A, // LD A,2AH
            0xCD, 0x06, 0x00, // CALL 0006H
            0x76, // HALT
            0x87, // ADD A
            0xE0, // RET PO
            0x3E, 0x24, // LD A,24H
            0xC9, // RET
        ],
        RunMode::UntilHalt,
    );
    assert_eq!(regs.a, 0x54);
    assert_eq!(regs.pc, 0x0006);
    assert_eq!(ticks, 43);
}

#[test]
fn ret_pe_returns_on_overflow() {
    let (regs, ticks) = run(
        &[0x3E, 0x88, 0xCD, 0x06, 0x00, 0x76, 0x87, 0xE8, 0x3E, 0x24, 0xC9],
        RunMode::UntilHalt,
    );
    assert_eq!(regs.a, 0x10);
    assert_ne!(regs.f & PF, 0);
    assert_eq!(regs.pc, 0x0006);
    assert_eq!(ticks, 43);
}

#[test]
fn ret_po_falls_through_when_not_taken() {
    // LD A,88H; CALL 0006H; HALT; ADD A; RET PO (not taken); LD A,24H; RET
    let (regs, ticks) = run(
        &[0x3E, 0x88, 0xCD, 0x06, 0x00, 0x76, 0x87, 0xE0, 0x3E, 0x24, 0xC9],
        RunMode::UntilHalt,
    );
    assert_eq!(regs.a, 0x24);
    assert_eq!(ticks, 7 + 17 + 4 + 5 + 7 + 10 + 4);
}

#[test]
fn jp_po_jumps_over_halt() {
    let (regs, ticks) = run(
        &[0x3E, 0x2A, 0x87, 0xE2, 0x07, 0x00, 0x76, 0x3E, 0xAA, 0x76],
        RunMode::UntilHalt,
    );
    assert_eq!(regs.a, 0xAA);
    assert_eq!(regs.pc, 0x000A);
    assert_eq!(ticks, 32);
}

#[test]
fn call_po_calls_subroutine() {
    let (regs, ticks) = run(
        &[0x3E, 0x2A, 0x87, 0xE4, 0x07, 0x00, 0x76, 0x3E, 0x24, 0xC9],
        RunMode::UntilHalt,
    );
    assert_eq!(regs.a, 0x24);
    assert_eq!(regs.pc, 0x0007);
    assert_eq!(ticks, 49);
}

#[test]
fn push_and_pop_through_stack() {
    let (regs, ticks) = run(&[0x01, 0x52, 0x23, 0xC5, 0xE1], RunMode::UntilEnd);
    assert_eq!(regs.hl(), 0x2352);
    assert_eq!(regs.pc, 0x0005);
    assert_eq!(ticks, 31);

    let (regs, ticks) = run(&[0x21, 0x52, 0x23, 0xE5, 0xC1], RunMode::UntilEnd);
    assert_eq!(regs.bc(), 0x2352);
    assert_eq!(ticks, 31);
}

/// Bus that charges a fixed wait on every access to 0x4000-0x7FFF.
struct ContendedBus {
    inner: SimpleBus,
    penalty: u8,
}

impl Bus for ContendedBus {
    fn read(&mut self, address: u16, tick: u64) -> ReadResult {
        let mut result = self.inner.read(address, tick);
        if (0x4000..0x8000).contains(&address) {
            result.wait = self.penalty;
        }
        result
    }

    fn write(&mut self, address: u16, value: u8, tick: u64) -> u8 {
        self.inner.write(address, value, tick);
        if (0x4000..0x8000).contains(&address) {
            self.penalty
        } else {
            0
        }
    }

    fn io_read(&mut self, port: u16, tick: u64) -> ReadResult {
        self.inner.io_read(port, tick)
    }

    fn io_write(&mut self, port: u16, value: u8, tick: u64) -> u8 {
        self.inner.io_write(port, value, tick)
    }

    fn peek(&self, address: u16) -> u8 {
        self.inner.peek(address)
    }
}

#[test]
fn wait_states_add_to_base_timing() {
    // LD A,(0x5000) performs four reads; only the operand read is contended.
    let mut inner = SimpleBus::new();
    inner.load(0, &[0x3A, 0x00, 0x50]);
    let mut bus = ContendedBus { inner, penalty: 6 };
    let mut cpu = Z80::new();
    cpu.step(&mut bus);
    assert_eq!(cpu.ticks(), 13 + 6);
}

#[test]
fn delay_only_moves_the_tick_counter() {
    let mut cpu = Z80::new();
    let before = cpu.registers();
    cpu.delay(5);
    assert_eq!(cpu.ticks(), 5);
    assert_eq!(cpu.registers(), before);
}
