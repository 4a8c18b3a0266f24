//! ALU operations.
//!
//! Pure functions over operand values and the incoming flag byte. Each
//! returns the result together with the complete new F register.

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF, sz53, sz53p};

/// Result of an 8-bit ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

const fn result(value: u8, flags: u8) -> AluResult {
    AluResult { value, flags }
}

pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let wide = u16::from(a) + u16::from(b) + u16::from(c);
    let value = wide as u8;
    let mut flags = sz53(value);
    if (a & 0x0F) + (b & 0x0F) + c > 0x0F {
        flags |= HF;
    }
    if (a ^ b) & 0x80 == 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    if wide > 0xFF {
        flags |= CF;
    }
    result(value, flags)
}

pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let value = a.wrapping_sub(b).wrapping_sub(c);
    let mut flags = sz53(value) | NF;
    if (a & 0x0F) < (b & 0x0F) + c {
        flags |= HF;
    }
    if (a ^ b) & 0x80 != 0 && (a ^ value) & 0x80 != 0 {
        flags |= PF;
    }
    if u16::from(a) < u16::from(b) + u16::from(c) {
        flags |= CF;
    }
    result(value, flags)
}

pub fn and8(a: u8, b: u8) -> AluResult {
    let value = a & b;
    result(value, sz53p(value) | HF)
}

pub fn xor8(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    result(value, sz53p(value))
}

pub fn or8(a: u8, b: u8) -> AluResult {
    let value = a | b;
    result(value, sz53p(value))
}

/// Compare: flags of `a - b`, undocumented bits from the operand.
pub fn cp8(a: u8, b: u8) -> AluResult {
    let sub = sub8(a, b, false);
    result(a, (sub.flags & !(YF | XF)) | (b & (YF | XF)))
}

/// Dispatch on the 3-bit ALU field of `ADD/ADC/SUB/SBC/AND/XOR/OR/CP`.
pub fn alu_op(op: u8, a: u8, b: u8, flags: u8) -> AluResult {
    let carry = flags & CF != 0;
    match op & 7 {
        0 => add8(a, b, false),
        1 => add8(a, b, carry),
        2 => sub8(a, b, false),
        3 => sub8(a, b, carry),
        4 => and8(a, b),
        5 => xor8(a, b),
        6 => or8(a, b),
        _ => cp8(a, b),
    }
}

pub fn inc8(v: u8, flags: u8) -> AluResult {
    let value = v.wrapping_add(1);
    let mut f = sz53(value) | (flags & CF);
    if v & 0x0F == 0x0F {
        f |= HF;
    }
    if v == 0x7F {
        f |= PF;
    }
    result(value, f)
}

pub fn dec8(v: u8, flags: u8) -> AluResult {
    let value = v.wrapping_sub(1);
    let mut f = sz53(value) | NF | (flags & CF);
    if v & 0x0F == 0 {
        f |= HF;
    }
    if v == 0x80 {
        f |= PF;
    }
    result(value, f)
}

/// CB-prefixed rotate/shift selected by the 3-bit `op` field:
/// RLC, RRC, RL, RR, SLA, SRA, SLL, SRL.
pub fn rotate(op: u8, v: u8, flags: u8) -> AluResult {
    let carry_in = flags & CF;
    let (value, carry) = match op & 7 {
        0 => (v.rotate_left(1), v >> 7),
        1 => (v.rotate_right(1), v & 1),
        2 => ((v << 1) | carry_in, v >> 7),
        3 => ((v >> 1) | (carry_in << 7), v & 1),
        4 => (v << 1, v >> 7),
        5 => ((v >> 1) | (v & 0x80), v & 1),
        6 => ((v << 1) | 1, v >> 7),
        _ => (v >> 1, v & 1),
    };
    result(value, sz53p(value) | carry)
}

/// Accumulator rotates RLCA, RRCA, RLA, RRA: only H, N, C and the
/// undocumented bits change.
pub fn rotate_a(op: u8, a: u8, flags: u8) -> AluResult {
    let rotated = rotate(op, a, flags);
    let kept = flags & (SF | ZF | PF);
    result(
        rotated.value,
        kept | (rotated.value & (YF | XF)) | (rotated.flags & CF),
    )
}

/// `BIT n,v`. `xy_source` supplies the undocumented bits: the operand for
/// register forms, the high byte of the address for memory forms.
pub fn bit(n: u8, v: u8, xy_source: u8, flags: u8) -> u8 {
    let tested = v & (1 << n);
    let mut f = HF | (flags & CF) | (xy_source & (YF | XF));
    if tested == 0 {
        f |= ZF | PF;
    }
    if n == 7 && tested != 0 {
        f |= SF;
    }
    f
}

pub fn daa(a: u8, flags: u8) -> AluResult {
    let subtract = flags & NF != 0;
    let mut correction = 0;
    let mut carry = flags & CF != 0;
    if flags & HF != 0 || a & 0x0F > 9 {
        correction |= 0x06;
    }
    if carry || a > 0x99 {
        correction |= 0x60;
        carry = true;
    }
    let value = if subtract {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };
    let half = if subtract {
        flags & HF != 0 && a & 0x0F < 6
    } else {
        a & 0x0F > 9
    };
    let mut f = sz53p(value) | (flags & NF);
    if half {
        f |= HF;
    }
    if carry {
        f |= CF;
    }
    result(value, f)
}

/// `ADD HL,rr`: S, Z and P/V are preserved.
pub fn add16(a: u16, b: u16, flags: u8) -> (u16, u8) {
    let wide = u32::from(a) + u32::from(b);
    let value = wide as u16;
    let mut f = (flags & (SF | ZF | PF)) | ((value >> 8) as u8 & (YF | XF));
    if (a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF {
        f |= HF;
    }
    if wide > 0xFFFF {
        f |= CF;
    }
    (value, f)
}

pub fn adc16(a: u16, b: u16, flags: u8) -> (u16, u8) {
    let c = u32::from(flags & CF);
    let wide = u32::from(a) + u32::from(b) + c;
    let value = wide as u16;
    let mut f = (value >> 8) as u8 & (SF | YF | XF);
    if value == 0 {
        f |= ZF;
    }
    if (u32::from(a) & 0x0FFF) + (u32::from(b) & 0x0FFF) + c > 0x0FFF {
        f |= HF;
    }
    if (a ^ b) & 0x8000 == 0 && (a ^ value) & 0x8000 != 0 {
        f |= PF;
    }
    if wide > 0xFFFF {
        f |= CF;
    }
    (value, f)
}

pub fn sbc16(a: u16, b: u16, flags: u8) -> (u16, u8) {
    let c = u32::from(flags & CF);
    let value = u32::from(a).wrapping_sub(u32::from(b)).wrapping_sub(c) as u16;
    let mut f = ((value >> 8) as u8 & (SF | YF | XF)) | NF;
    if value == 0 {
        f |= ZF;
    }
    if u32::from(a & 0x0FFF) < u32::from(b & 0x0FFF) + c {
        f |= HF;
    }
    if (a ^ b) & 0x8000 != 0 && (a ^ value) & 0x8000 != 0 {
        f |= PF;
    }
    if u32::from(a) < u32::from(b) + c {
        f |= CF;
    }
    (value, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_doubles_without_overflow() {
        let r = add8(0x2A, 0x2A, false);
        assert_eq!(r.value, 0x54);
        assert_eq!(r.flags & (PF | CF | ZF), 0);
    }

    #[test]
    fn add_sets_overflow_crossing_sign() {
        let r = add8(0x7F, 0x01, false);
        assert_eq!(r.value, 0x80);
        assert_ne!(r.flags & PF, 0);
        assert_ne!(r.flags & HF, 0);
        assert_ne!(r.flags & SF, 0);
    }

    #[test]
    fn sub_borrows() {
        let r = sub8(0x00, 0x01, false);
        assert_eq!(r.value, 0xFF);
        assert_eq!(r.flags & (CF | NF | HF), CF | NF | HF);
    }

    #[test]
    fn compare_keeps_accumulator_and_takes_xy_from_operand() {
        let r = cp8(0x10, 0x28);
        assert_eq!(r.value, 0x10);
        assert_eq!(r.flags & (YF | XF), 0x28);
        assert_ne!(r.flags & CF, 0);
    }

    #[test]
    fn inc_and_dec_preserve_carry() {
        assert_eq!(inc8(0xFF, CF).flags & (ZF | CF | HF), ZF | CF | HF);
        assert_eq!(dec8(0x80, 0).flags & PF, PF);
    }

    #[test]
    fn rotates_move_bits_through_carry() {
        assert_eq!(rotate(0, 0x81, 0).value, 0x03);
        assert_eq!(rotate(2, 0x80, 0), AluResult { value: 0, flags: ZF | PF | CF });
        assert_eq!(rotate(3, 0x01, CF).value, 0x80);
        assert_eq!(rotate(5, 0x81, 0).value, 0xC0);
        assert_eq!(rotate(6, 0x00, 0).value, 0x01);
    }

    #[test]
    fn rotate_a_keeps_sign_zero_parity() {
        let r = rotate_a(0, 0x80, ZF | PF);
        assert_eq!(r.value, 0x01);
        assert_eq!(r.flags, ZF | PF | CF);
    }

    #[test]
    fn daa_adjusts_bcd_addition() {
        let sum = add8(0x15, 0x27, false);
        assert_eq!(daa(sum.value, sum.flags).value, 0x42);
    }

    #[test]
    fn sixteen_bit_carry_chain() {
        assert_eq!(add16(0xFFFF, 0x0001, 0).0, 0);
        let (value, flags) = sbc16(0x1000, 0x0001, CF);
        assert_eq!(value, 0x0FFE);
        assert_ne!(flags & HF, 0);
        let (value, flags) = adc16(0x7FFF, 0x0000, CF);
        assert_eq!(value, 0x8000);
        assert_ne!(flags & PF, 0);
    }

    #[test]
    fn bit_test_sets_zero_for_clear_bit() {
        assert_eq!(bit(0, 0xFE, 0, 0) & (ZF | PF | HF), ZF | PF | HF);
        assert_eq!(bit(7, 0x80, 0, 0) & (SF | ZF), SF);
    }
}
