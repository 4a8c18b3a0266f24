//! Z80 register file.

use serde::{Deserialize, Serialize};

/// Complete architectural register state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    /// Shadow AF, BC, DE, HL (swapped in by `EX AF,AF'` and `EXX`).
    pub af_alt: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,

    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,

    pub iff1: bool,
    pub iff2: bool,
    /// Interrupt mode, 0 to 2.
    pub im: u8,
    pub halted: bool,
}

impl Registers {
    #[must_use]
    pub const fn af(&self) -> u16 {
        (self.a as u16) << 8 | self.f as u16
    }

    #[must_use]
    pub const fn bc(&self) -> u16 {
        (self.b as u16) << 8 | self.c as u16
    }

    #[must_use]
    pub const fn de(&self) -> u16 {
        (self.d as u16) << 8 | self.e as u16
    }

    #[must_use]
    pub const fn hl(&self) -> u16 {
        (self.h as u16) << 8 | self.l as u16
    }

    pub fn set_af(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.f = value as u8;
    }

    pub fn set_bc(&mut self, value: u16) {
        self.b = (value >> 8) as u8;
        self.c = value as u8;
    }

    pub fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }

    pub fn set_hl(&mut self, value: u16) {
        self.h = (value >> 8) as u8;
        self.l = value as u8;
    }

    /// `EX AF,AF'`.
    pub fn exchange_af(&mut self) {
        let af = self.af();
        self.set_af(self.af_alt);
        self.af_alt = af;
    }

    /// `EXX`.
    pub fn exchange_main(&mut self) {
        let (bc, de, hl) = (self.bc(), self.de(), self.hl());
        self.set_bc(self.bc_alt);
        self.set_de(self.de_alt);
        self.set_hl(self.hl_alt);
        self.bc_alt = bc;
        self.de_alt = de;
        self.hl_alt = hl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_split_high_and_low() {
        let mut regs = Registers::default();
        regs.set_hl(0x1234);
        assert_eq!((regs.h, regs.l), (0x12, 0x34));
        assert_eq!(regs.hl(), 0x1234);
    }

    #[test]
    fn exx_swaps_three_pairs_only() {
        let mut regs = Registers::default();
        regs.set_af(0xAAFF);
        regs.set_bc(0x0102);
        regs.bc_alt = 0x0B0C;
        regs.exchange_main();
        assert_eq!(regs.bc(), 0x0B0C);
        assert_eq!(regs.bc_alt, 0x0102);
        assert_eq!(regs.af(), 0xAAFF);
    }
}
