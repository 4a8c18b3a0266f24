//! Instruction decode and execute.
//!
//! Opcodes are split into the usual `x/y/z/p/q` fields:
//! `x = op >> 6`, `y = (op >> 3) & 7`, `z = op & 7`, `p = y >> 1`, `q = y & 1`.
//! Timings below are the documented T-state counts; the opcode fetch (4) is
//! already charged by the caller.

use emu_core::Bus;

use super::{Index, Z80};
use crate::alu::{self, AluResult};
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p};

const INTERRUPT_MODES: [u8; 8] = [0, 0, 1, 2, 0, 0, 1, 2];

impl Z80 {
    fn index_reg(&self, index: Index) -> u16 {
        match index {
            Index::Hl => self.regs.hl(),
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    fn set_index_reg(&mut self, index: Index, value: u16) {
        match index {
            Index::Hl => self.regs.set_hl(value),
            Index::Ix => self.regs.ix = value,
            Index::Iy => self.regs.iy = value,
        }
    }

    /// 8-bit register `r` (B, C, D, E, H, L, -, A). H and L become the
    /// halves of IX/IY under an index prefix.
    fn reg8(&self, r: u8, index: Index) -> u8 {
        match r & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => (self.index_reg(index) >> 8) as u8,
            5 => self.index_reg(index) as u8,
            _ => self.regs.a,
        }
    }

    fn set_reg8(&mut self, r: u8, index: Index, value: u8) {
        match r & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => {
                let low = self.index_reg(index) & 0x00FF;
                self.set_index_reg(index, u16::from(value) << 8 | low);
            }
            5 => {
                let high = self.index_reg(index) & 0xFF00;
                self.set_index_reg(index, high | u16::from(value));
            }
            _ => self.regs.a = value,
        }
    }

    /// Register pair `p` from the BC, DE, HL, SP table.
    fn rp(&self, p: u8, index: Index) -> u16 {
        match p & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.index_reg(index),
            _ => self.regs.sp,
        }
    }

    fn set_rp(&mut self, p: u8, index: Index, value: u16) {
        match p & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.set_index_reg(index, value),
            _ => self.regs.sp = value,
        }
    }

    /// Register pair `p` from the BC, DE, HL, AF table used by PUSH/POP.
    fn rp2(&self, p: u8, index: Index) -> u16 {
        if p & 3 == 3 {
            self.regs.af()
        } else {
            self.rp(p, index)
        }
    }

    fn set_rp2(&mut self, p: u8, index: Index, value: u16) {
        if p & 3 == 3 {
            self.regs.set_af(value);
        } else {
            self.set_rp(p, index, value);
        }
    }

    /// Address of the `(HL)` operand, or `(IX+d)` with the displacement
    /// fetched and the five address-calculation tacts charged.
    fn operand_address<B: Bus>(&mut self, bus: &mut B, index: Index) -> u16 {
        match index {
            Index::Hl => self.regs.hl(),
            _ => {
                let d = self.fetch_byte(bus) as i8;
                self.internal(5);
                self.index_reg(index).wrapping_add_signed(i16::from(d))
            }
        }
    }

    fn apply_a(&mut self, result: AluResult) {
        self.regs.a = result.value;
        self.regs.f = result.flags;
    }

    fn jump_relative(&mut self, d: u8) {
        self.internal(5);
        self.regs.pc = self.regs.pc.wrapping_add_signed(i16::from(d as i8));
    }

    pub(super) fn execute_main<B: Bus>(&mut self, bus: &mut B, opcode: u8, index: Index) {
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        match x {
            0 => self.execute_block0(bus, y, z, index),
            1 if opcode == 0x76 => self.regs.halted = true,
            1 => {
                if z == 6 {
                    // LD r,(HL): r is never an index half.
                    let address = self.operand_address(bus, index);
                    let value = self.read_byte(bus, address);
                    self.set_reg8(y, Index::Hl, value);
                } else if y == 6 {
                    let address = self.operand_address(bus, index);
                    let value = self.reg8(z, Index::Hl);
                    self.write_byte(bus, address, value);
                } else {
                    let value = self.reg8(z, index);
                    self.set_reg8(y, index, value);
                }
            }
            2 => {
                let operand = if z == 6 {
                    let address = self.operand_address(bus, index);
                    self.read_byte(bus, address)
                } else {
                    self.reg8(z, index)
                };
                let result = alu::alu_op(y, self.regs.a, operand, self.regs.f);
                self.apply_a(result);
            }
            _ => self.execute_block3(bus, y, z, index),
        }
    }

    fn execute_block0<B: Bus>(&mut self, bus: &mut B, y: u8, z: u8, index: Index) {
        let p = y >> 1;
        let q = y & 1;
        match z {
            0 => match y {
                0 => {}
                1 => self.regs.exchange_af(),
                2 => {
                    // DJNZ
                    self.internal(1);
                    let d = self.fetch_byte(bus);
                    self.regs.b = self.regs.b.wrapping_sub(1);
                    if self.regs.b != 0 {
                        self.jump_relative(d);
                    }
                }
                3 => {
                    let d = self.fetch_byte(bus);
                    self.jump_relative(d);
                }
                _ => {
                    let d = self.fetch_byte(bus);
                    if self.condition(y - 4) {
                        self.jump_relative(d);
                    }
                }
            },
            1 => {
                if q == 0 {
                    let value = self.fetch_word(bus);
                    self.set_rp(p, index, value);
                } else {
                    self.internal(7);
                    let (value, flags) =
                        alu::add16(self.index_reg(index), self.rp(p, index), self.regs.f);
                    self.set_index_reg(index, value);
                    self.regs.f = flags;
                }
            }
            2 => match (q, p) {
                (0, 0) => self.write_byte(bus, self.regs.bc(), self.regs.a),
                (0, 1) => self.write_byte(bus, self.regs.de(), self.regs.a),
                (0, 2) => {
                    let address = self.fetch_word(bus);
                    let value = self.index_reg(index);
                    self.write_word(bus, address, value);
                }
                (0, _) => {
                    let address = self.fetch_word(bus);
                    self.write_byte(bus, address, self.regs.a);
                }
                (_, 0) => self.regs.a = self.read_byte(bus, self.regs.bc()),
                (_, 1) => self.regs.a = self.read_byte(bus, self.regs.de()),
                (_, 2) => {
                    let address = self.fetch_word(bus);
                    let value = self.read_word(bus, address);
                    self.set_index_reg(index, value);
                }
                _ => {
                    let address = self.fetch_word(bus);
                    self.regs.a = self.read_byte(bus, address);
                }
            },
            3 => {
                self.internal(2);
                let value = self.rp(p, index);
                let value = if q == 0 {
                    value.wrapping_add(1)
                } else {
                    value.wrapping_sub(1)
                };
                self.set_rp(p, index, value);
            }
            4 | 5 => {
                let step = |value: u8, flags: u8| {
                    if z == 4 {
                        alu::inc8(value, flags)
                    } else {
                        alu::dec8(value, flags)
                    }
                };
                if y == 6 {
                    let address = self.operand_address(bus, index);
                    let value = self.read_byte(bus, address);
                    self.internal(1);
                    let result = step(value, self.regs.f);
                    self.write_byte(bus, address, result.value);
                    self.regs.f = result.flags;
                } else {
                    let result = step(self.reg8(y, index), self.regs.f);
                    self.set_reg8(y, index, result.value);
                    self.regs.f = result.flags;
                }
            }
            6 => {
                if y == 6 {
                    let address = match index {
                        Index::Hl => self.regs.hl(),
                        _ => {
                            let d = self.fetch_byte(bus) as i8;
                            self.index_reg(index).wrapping_add_signed(i16::from(d))
                        }
                    };
                    let value = self.fetch_byte(bus);
                    if index != Index::Hl {
                        self.internal(2);
                    }
                    self.write_byte(bus, address, value);
                } else {
                    let value = self.fetch_byte(bus);
                    self.set_reg8(y, index, value);
                }
            }
            _ => self.execute_accumulator_op(y),
        }
    }

    /// RLCA, RRCA, RLA, RRA, DAA, CPL, SCF, CCF.
    fn execute_accumulator_op(&mut self, y: u8) {
        let a = self.regs.a;
        let f = self.regs.f;
        match y {
            0..=3 => self.apply_a(alu::rotate_a(y, a, f)),
            4 => self.apply_a(alu::daa(a, f)),
            5 => {
                let value = !a;
                self.regs.a = value;
                self.regs.f = (f & (SF | ZF | PF | CF)) | HF | NF | (value & (YF | XF));
            }
            6 => self.regs.f = (f & (SF | ZF | PF)) | CF | (a & (YF | XF)),
            _ => {
                let half = if f & CF != 0 { HF } else { 0 };
                self.regs.f = ((f & (SF | ZF | PF | CF)) ^ CF) | half | (a & (YF | XF));
            }
        }
    }

    fn execute_block3<B: Bus>(&mut self, bus: &mut B, y: u8, z: u8, index: Index) {
        let p = y >> 1;
        let q = y & 1;
        match z {
            0 => {
                self.internal(1);
                if self.condition(y) {
                    self.regs.pc = self.pop(bus);
                }
            }
            1 => match (q, p) {
                (0, _) => {
                    let value = self.pop(bus);
                    self.set_rp2(p, index, value);
                }
                (_, 0) => self.regs.pc = self.pop(bus),
                (_, 1) => self.regs.exchange_main(),
                (_, 2) => self.regs.pc = self.index_reg(index),
                _ => {
                    self.internal(2);
                    self.regs.sp = self.index_reg(index);
                }
            },
            2 => {
                let address = self.fetch_word(bus);
                if self.condition(y) {
                    self.regs.pc = address;
                }
            }
            3 => match y {
                0 => self.regs.pc = self.fetch_word(bus),
                2 => {
                    let n = self.fetch_byte(bus);
                    let port = u16::from(self.regs.a) << 8 | u16::from(n);
                    self.port_out(bus, port, self.regs.a);
                }
                3 => {
                    let n = self.fetch_byte(bus);
                    let port = u16::from(self.regs.a) << 8 | u16::from(n);
                    self.regs.a = self.port_in(bus, port);
                }
                4 => {
                    let sp = self.regs.sp;
                    let value = self.read_word(bus, sp);
                    self.internal(1);
                    let [lo, hi] = self.index_reg(index).to_le_bytes();
                    self.write_byte(bus, sp.wrapping_add(1), hi);
                    self.write_byte(bus, sp, lo);
                    self.internal(2);
                    self.set_index_reg(index, value);
                }
                5 => {
                    let de = self.regs.de();
                    self.regs.set_de(self.regs.hl());
                    self.regs.set_hl(de);
                }
                6 => {
                    self.regs.iff1 = false;
                    self.regs.iff2 = false;
                }
                7 => {
                    self.regs.iff1 = true;
                    self.regs.iff2 = true;
                    self.ei_delay = true;
                }
                // 0xCB is consumed as a prefix before dispatch.
                _ => {}
            },
            4 => {
                let address = self.fetch_word(bus);
                if self.condition(y) {
                    self.internal(1);
                    let pc = self.regs.pc;
                    self.push(bus, pc);
                    self.regs.pc = address;
                }
            }
            5 => {
                if q == 0 {
                    self.internal(1);
                    let value = self.rp2(p, index);
                    self.push(bus, value);
                } else if p == 0 {
                    let address = self.fetch_word(bus);
                    self.internal(1);
                    let pc = self.regs.pc;
                    self.push(bus, pc);
                    self.regs.pc = address;
                }
                // p = 1..3 are the DD/ED/FD prefixes, consumed before dispatch.
            }
            6 => {
                let n = self.fetch_byte(bus);
                let result = alu::alu_op(y, self.regs.a, n, self.regs.f);
                self.apply_a(result);
            }
            _ => {
                self.internal(1);
                let pc = self.regs.pc;
                self.push(bus, pc);
                self.regs.pc = u16::from(y) * 8;
            }
        }
    }

    pub(super) fn execute_cb<B: Bus>(&mut self, bus: &mut B, opcode: u8) {
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        if z == 6 {
            let address = self.regs.hl();
            let value = self.read_byte(bus, address);
            self.internal(1);
            if x == 1 {
                self.regs.f = alu::bit(y, value, (address >> 8) as u8, self.regs.f);
            } else {
                let result = self.bit_operation(x, y, value);
                self.write_byte(bus, address, result);
            }
        } else {
            let value = self.reg8(z, Index::Hl);
            if x == 1 {
                self.regs.f = alu::bit(y, value, value, self.regs.f);
            } else {
                let result = self.bit_operation(x, y, value);
                self.set_reg8(z, Index::Hl, result);
            }
        }
    }

    /// Rotate/shift (x = 0), RES (x = 2) or SET (x = 3).
    fn bit_operation(&mut self, x: u8, y: u8, value: u8) -> u8 {
        match x {
            0 => {
                let result = alu::rotate(y, value, self.regs.f);
                self.regs.f = result.flags;
                result.value
            }
            2 => value & !(1 << y),
            _ => value | (1 << y),
        }
    }

    /// `DD CB d op` / `FD CB d op`. The displacement and final opcode are
    /// plain reads, not M1 cycles.
    pub(super) fn execute_index_cb<B: Bus>(&mut self, bus: &mut B, index: Index) {
        let d = self.fetch_byte(bus) as i8;
        let opcode = self.fetch_byte(bus);
        self.internal(2);
        let address = self.index_reg(index).wrapping_add_signed(i16::from(d));
        let value = self.read_byte(bus, address);
        self.internal(1);
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        if x == 1 {
            self.regs.f = alu::bit(y, value, (address >> 8) as u8, self.regs.f);
            return;
        }
        let result = self.bit_operation(x, y, value);
        self.write_byte(bus, address, result);
        if z != 6 {
            // Undocumented: the result is also copied into a register.
            self.set_reg8(z, Index::Hl, result);
        }
    }

    pub(super) fn execute_ed<B: Bus>(&mut self, bus: &mut B, opcode: u8) {
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        match x {
            1 => self.execute_ed_block1(bus, y, z),
            2 if z <= 3 && y >= 4 => self.execute_block_instruction(bus, y, z),
            // Everything else behaves as an 8-tact NOP.
            _ => {}
        }
    }

    fn execute_ed_block1<B: Bus>(&mut self, bus: &mut B, y: u8, z: u8) {
        let p = y >> 1;
        let q = y & 1;
        match z {
            0 => {
                let value = self.port_in(bus, self.regs.bc());
                self.regs.f = sz53p(value) | (self.regs.f & CF);
                if y != 6 {
                    self.set_reg8(y, Index::Hl, value);
                }
            }
            1 => {
                let value = if y == 6 { 0 } else { self.reg8(y, Index::Hl) };
                self.port_out(bus, self.regs.bc(), value);
            }
            2 => {
                self.internal(7);
                let hl = self.regs.hl();
                let operand = self.rp(p, Index::Hl);
                let (value, flags) = if q == 0 {
                    alu::sbc16(hl, operand, self.regs.f)
                } else {
                    alu::adc16(hl, operand, self.regs.f)
                };
                self.regs.set_hl(value);
                self.regs.f = flags;
            }
            3 => {
                let address = self.fetch_word(bus);
                if q == 0 {
                    let value = self.rp(p, Index::Hl);
                    self.write_word(bus, address, value);
                } else {
                    let value = self.read_word(bus, address);
                    self.set_rp(p, Index::Hl, value);
                }
            }
            4 => self.apply_a(alu::sub8(0, self.regs.a, false)),
            5 => {
                // RETN and RETI both restore IFF1 from IFF2.
                self.regs.pc = self.pop(bus);
                self.regs.iff1 = self.regs.iff2;
            }
            6 => self.regs.im = INTERRUPT_MODES[y as usize],
            _ => self.execute_ed_misc(bus, y),
        }
    }

    fn execute_ed_misc<B: Bus>(&mut self, bus: &mut B, y: u8) {
        match y {
            0 => {
                self.internal(1);
                self.regs.i = self.regs.a;
            }
            1 => {
                self.internal(1);
                self.regs.r = self.regs.a;
            }
            2 | 3 => {
                self.internal(1);
                let value = if y == 2 { self.regs.i } else { self.regs.r };
                self.regs.a = value;
                let iff2 = if self.regs.iff2 { PF } else { 0 };
                self.regs.f = sz53(value) | iff2 | (self.regs.f & CF);
            }
            4 | 5 => {
                let address = self.regs.hl();
                let value = self.read_byte(bus, address);
                self.internal(4);
                let a = self.regs.a;
                let (memory, accumulator) = if y == 4 {
                    // RRD
                    ((a << 4) | (value >> 4), (a & 0xF0) | (value & 0x0F))
                } else {
                    // RLD
                    ((value << 4) | (a & 0x0F), (a & 0xF0) | (value >> 4))
                };
                self.write_byte(bus, address, memory);
                self.regs.a = accumulator;
                self.regs.f = sz53p(accumulator) | (self.regs.f & CF);
            }
            _ => {}
        }
    }

    /// LDI/LDD/CPI/CPD/INI/IND/OUTI/OUTD and their repeating forms.
    fn execute_block_instruction<B: Bus>(&mut self, bus: &mut B, y: u8, z: u8) {
        let decrement = y & 1 != 0;
        let repeat = y >= 6;
        let step = |value: u16| {
            if decrement {
                value.wrapping_sub(1)
            } else {
                value.wrapping_add(1)
            }
        };
        let hl = self.regs.hl();
        let again = match z {
            0 => {
                let value = self.read_byte(bus, hl);
                self.write_byte(bus, self.regs.de(), value);
                self.internal(2);
                self.regs.set_hl(step(hl));
                self.regs.set_de(step(self.regs.de()));
                let bc = self.regs.bc().wrapping_sub(1);
                self.regs.set_bc(bc);
                let n = value.wrapping_add(self.regs.a);
                let mut f = (self.regs.f & (SF | ZF | CF)) | (n & XF) | ((n << 4) & YF);
                if bc != 0 {
                    f |= PF;
                }
                self.regs.f = f;
                bc != 0
            }
            1 => {
                let value = self.read_byte(bus, hl);
                self.internal(5);
                self.regs.set_hl(step(hl));
                let bc = self.regs.bc().wrapping_sub(1);
                self.regs.set_bc(bc);
                let compare = alu::sub8(self.regs.a, value, false);
                let half = compare.flags & HF != 0;
                let n = compare.value.wrapping_sub(u8::from(half));
                let mut f = (compare.flags & (SF | ZF | HF))
                    | NF
                    | (self.regs.f & CF)
                    | (n & XF)
                    | ((n << 4) & YF);
                if bc != 0 {
                    f |= PF;
                }
                self.regs.f = f;
                bc != 0 && compare.value != 0
            }
            2 => {
                self.internal(1);
                let value = self.port_in(bus, self.regs.bc());
                self.write_byte(bus, hl, value);
                self.regs.set_hl(step(hl));
                self.regs.b = self.regs.b.wrapping_sub(1);
                let c = if decrement {
                    self.regs.c.wrapping_sub(1)
                } else {
                    self.regs.c.wrapping_add(1)
                };
                self.regs.f = self.block_io_flags(value, c);
                self.regs.b != 0
            }
            _ => {
                self.internal(1);
                let value = self.read_byte(bus, hl);
                self.regs.b = self.regs.b.wrapping_sub(1);
                self.port_out(bus, self.regs.bc(), value);
                self.regs.set_hl(step(hl));
                self.regs.f = self.block_io_flags(value, self.regs.l);
                self.regs.b != 0
            }
        };
        if repeat && again {
            self.internal(5);
            self.regs.pc = self.regs.pc.wrapping_sub(2);
        }
    }

    /// Flags after INI/IND/OUTI/OUTD, with B already decremented.
    fn block_io_flags(&self, value: u8, addend: u8) -> u8 {
        let b = self.regs.b;
        let k = u16::from(value) + u16::from(addend);
        let mut f = sz53(b);
        if value & 0x80 != 0 {
            f |= NF;
        }
        if k > 0xFF {
            f |= HF | CF;
        }
        if ((k as u8 & 7) ^ b).count_ones().is_multiple_of(2) {
            f |= PF;
        }
        f
    }
}
