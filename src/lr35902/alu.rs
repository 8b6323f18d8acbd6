//! Flag arithmetic for the SM83 ALU.
//!
//! Every operation is a pure function of its operands and the incoming
//! flags and returns the result together with the complete new flag set.
//! Flags an instruction leaves untouched are copied from `flags`.

use crate::lr35902::registers::Flags;

/// `a + b + carry_in`.
pub fn add8(a: u8, b: u8, carry_in: bool) -> (u8, Flags) {
    let carry_in = carry_in as u16;
    let full = a as u16 + b as u16 + carry_in;
    let half = (a & 0x0f) as u16 + (b & 0x0f) as u16 + carry_in;
    let result = (full & 0xff) as u8;

    let mut flags = Flags::empty();
    flags.set(Flags::ZERO, result == 0);
    flags.set(Flags::HALF_CARRY, half > 0x0f);
    flags.set(Flags::CARRY, full > 0xff);
    (result, flags)
}

/// `a - b - carry_in`. Borrows are detected on a signed intermediate.
pub fn sub8(a: u8, b: u8, carry_in: bool) -> (u8, Flags) {
    let carry_in = carry_in as i16;
    let full = a as i16 - b as i16 - carry_in;
    let half = (a & 0x0f) as i16 - (b & 0x0f) as i16 - carry_in;
    let result = (full & 0xff) as u8;

    let mut flags = Flags::SUBTRACT;
    flags.set(Flags::ZERO, result == 0);
    flags.set(Flags::HALF_CARRY, half < 0);
    flags.set(Flags::CARRY, full < 0);
    (result, flags)
}

pub fn and8(a: u8, b: u8) -> (u8, Flags) {
    let result = a & b;
    let mut flags = Flags::HALF_CARRY;
    flags.set(Flags::ZERO, result == 0);
    (result, flags)
}

pub fn or8(a: u8, b: u8) -> (u8, Flags) {
    let result = a | b;
    (result, zero_only(result))
}

pub fn xor8(a: u8, b: u8) -> (u8, Flags) {
    let result = a ^ b;
    (result, zero_only(result))
}

/// Carry is preserved.
pub fn inc8(value: u8, flags: Flags) -> (u8, Flags) {
    let result = value.wrapping_add(1);
    let mut out = flags & Flags::CARRY;
    out.set(Flags::ZERO, result == 0);
    out.set(Flags::HALF_CARRY, value & 0x0f == 0x0f);
    (result, out)
}

/// Carry is preserved.
pub fn dec8(value: u8, flags: Flags) -> (u8, Flags) {
    let result = value.wrapping_sub(1);
    let mut out = (flags & Flags::CARRY) | Flags::SUBTRACT;
    out.set(Flags::ZERO, result == 0);
    out.set(Flags::HALF_CARRY, value & 0x0f == 0);
    (result, out)
}

/// `ADD HL,rr`: half-carry out of bit 11, carry out of bit 15, zero preserved.
pub fn add16(a: u16, b: u16, flags: Flags) -> (u16, Flags) {
    let full = a as u32 + b as u32;
    let mut out = flags & Flags::ZERO;
    out.set(Flags::HALF_CARRY, (a & 0x0fff) + (b & 0x0fff) > 0x0fff);
    out.set(Flags::CARRY, full > 0xffff);
    ((full & 0xffff) as u16, out)
}

/// `ADD SP,e` and `LD HL,SP+e`: the offset is sign-extended and added with
/// the `add16` rule. Zero and subtract are always cleared.
pub fn add16_signed(base: u16, offset: i8) -> (u16, Flags) {
    add16(base, offset as i16 as u16, Flags::empty())
}

pub fn daa(a: u8, flags: Flags) -> (u8, Flags) {
    let mut result = a;
    let mut out = flags & (Flags::SUBTRACT | Flags::CARRY);

    if flags.contains(Flags::SUBTRACT) {
        if flags.contains(Flags::CARRY) {
            result = result.wrapping_sub(0x60);
        }
        if flags.contains(Flags::HALF_CARRY) {
            result = result.wrapping_sub(0x06);
        }
    } else {
        if flags.contains(Flags::CARRY) || result > 0x99 {
            result = result.wrapping_add(0x60);
            out.insert(Flags::CARRY);
        }
        if flags.contains(Flags::HALF_CARRY) || result & 0x0f > 0x09 {
            result = result.wrapping_add(0x06);
        }
    }

    out.set(Flags::ZERO, result == 0);
    (result, out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    /// Rotate left, bit 7 into bit 0 and carry.
    Rlc,
    /// Rotate right, bit 0 into bit 7 and carry.
    Rrc,
    /// Rotate left through carry.
    Rl,
    /// Rotate right through carry.
    Rr,
    Sla,
    Sra,
    Srl,
    Swap,
}

/// Prefixed shifts/rotates. The accumulator forms (`RLCA` and friends) use
/// the same arithmetic but always clear zero; see [`shift_accumulator`].
pub fn shift(kind: Shift, value: u8, flags: Flags) -> (u8, Flags) {
    let carry_in = flags.contains(Flags::CARRY) as u8;
    let (result, carry_out) = match kind {
        Shift::Rlc => (value.rotate_left(1), value & 0x80 != 0),
        Shift::Rrc => (value.rotate_right(1), value & 0x01 != 0),
        Shift::Rl => ((value << 1) | carry_in, value & 0x80 != 0),
        Shift::Rr => ((value >> 1) | (carry_in << 7), value & 0x01 != 0),
        Shift::Sla => (value << 1, value & 0x80 != 0),
        Shift::Sra => ((value >> 1) | (value & 0x80), value & 0x01 != 0),
        Shift::Srl => (value >> 1, value & 0x01 != 0),
        Shift::Swap => (value.rotate_left(4), false),
    };

    let mut out = Flags::empty();
    out.set(Flags::ZERO, result == 0);
    out.set(Flags::CARRY, carry_out);
    (result, out)
}

pub fn shift_accumulator(kind: Shift, a: u8, flags: Flags) -> (u8, Flags) {
    let (result, out) = shift(kind, a, flags);
    (result, out - Flags::ZERO)
}

/// `BIT n,r`: zero is the inverse of the tested bit, carry is preserved.
pub fn test_bit(bit: u8, value: u8, flags: Flags) -> Flags {
    let mut out = (flags & Flags::CARRY) | Flags::HALF_CARRY;
    out.set(Flags::ZERO, value & (1 << bit) == 0);
    out
}

#[inline]
fn zero_only(result: u8) -> Flags {
    if result == 0 {
        Flags::ZERO
    } else {
        Flags::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bcd(value: u8) -> u8 {
        ((value / 10) << 4) | (value % 10)
    }

    #[test]
    fn add8_matches_reference_for_all_operands() {
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                let (result, flags) = add8(a, b, false);
                let sum = a as u16 + b as u16;
                assert_eq!(result, (sum % 256) as u8);
                assert_eq!(flags.contains(Flags::CARRY), sum > 255);
                assert_eq!(flags.contains(Flags::HALF_CARRY), (a & 0xf) + (b & 0xf) > 0xf);
                assert_eq!(flags.contains(Flags::ZERO), result == 0);
                assert!(!flags.contains(Flags::SUBTRACT));
            }
        }
    }

    #[test]
    fn add8_with_carry_in() {
        assert_eq!(add8(0x0f, 0x00, true), (0x10, Flags::HALF_CARRY));
        assert_eq!(add8(0xff, 0x00, true), (0x00, Flags::ZERO | Flags::HALF_CARRY | Flags::CARRY));
        assert_eq!(add8(0x70, 0x0e, true), (0x7f, Flags::empty()));
    }

    #[test]
    fn sub8_matches_reference_for_all_operands() {
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                for carry in [false, true] {
                    let (result, flags) = sub8(a, b, carry);
                    let c = carry as i16;
                    assert_eq!(result, a.wrapping_sub(b).wrapping_sub(c as u8));
                    assert_eq!(flags.contains(Flags::CARRY), (a as i16) - (b as i16) - c < 0);
                    assert_eq!(flags.contains(Flags::HALF_CARRY), ((a & 0xf) as i16) - ((b & 0xf) as i16) - c < 0);
                    assert!(flags.contains(Flags::SUBTRACT));
                }
            }
        }
    }

    #[test]
    fn daa_after_addition_produces_packed_bcd() {
        for x in 0..100u8 {
            for y in 0..100u8 {
                let (sum, flags) = add8(bcd(x), bcd(y), false);
                let (adjusted, flags) = daa(sum, flags);
                assert_eq!(adjusted, bcd((x + y) % 100), "{} + {}", x, y);
                assert_eq!(flags.contains(Flags::CARRY), x + y >= 100, "{} + {}", x, y);
                assert_eq!(flags.contains(Flags::ZERO), adjusted == 0);
                assert!(!flags.contains(Flags::HALF_CARRY));
            }
        }
    }

    #[test]
    fn daa_after_subtraction_produces_packed_bcd() {
        for x in 0..100u8 {
            for y in 0..100u8 {
                let (difference, flags) = sub8(bcd(x), bcd(y), false);
                let (adjusted, flags) = daa(difference, flags);
                let expected = (x as i16 - y as i16).rem_euclid(100) as u8;
                assert_eq!(adjusted, bcd(expected), "{} - {}", x, y);
                assert_eq!(flags.contains(Flags::CARRY), x < y, "{} - {}", x, y);
                assert!(flags.contains(Flags::SUBTRACT));
                assert!(!flags.contains(Flags::HALF_CARRY));
            }
        }
    }

    #[test]
    fn daa_keeps_incoming_carry_on_subtraction() {
        let (result, flags) = daa(0x00, Flags::SUBTRACT | Flags::CARRY | Flags::HALF_CARRY);
        assert_eq!(result, 0x9a);
        assert_eq!(flags, Flags::SUBTRACT | Flags::CARRY);
    }

    #[test]
    fn add16_uses_bit_11_for_half_carry() {
        let (result, flags) = add16(0x0fff, 0x0001, Flags::ZERO);
        assert_eq!(result, 0x1000);
        assert_eq!(flags, Flags::ZERO | Flags::HALF_CARRY);

        let (result, flags) = add16(0x000f, 0x0001, Flags::empty());
        assert_eq!(result, 0x0010);
        assert_eq!(flags, Flags::empty());

        let (result, flags) = add16(0xffff, 0x0001, Flags::empty());
        assert_eq!(result, 0x0000);
        assert_eq!(flags, Flags::HALF_CARRY | Flags::CARRY);
    }

    #[test]
    fn add16_signed_follows_the_16_bit_rule() {
        assert_eq!(add16_signed(0xfff8, 8), (0x0000, Flags::HALF_CARRY | Flags::CARRY));
        assert_eq!(add16_signed(0x0000, -1), (0xffff, Flags::empty()));
        assert_eq!(add16_signed(0x00ff, -1), (0x00fe, Flags::HALF_CARRY | Flags::CARRY));
        assert_eq!(add16_signed(0x00f0, 0x10), (0x0100, Flags::empty()));
        assert_eq!(add16_signed(0x0ff0, 0x10), (0x1000, Flags::HALF_CARRY));

        for base in [0x0000u16, 0x00ff, 0x0fff, 0x8000, 0xfffe] {
            for offset in [i8::MIN, -1, 0, 1, i8::MAX] {
                let (result, flags) = add16(base, offset as i16 as u16, Flags::ZERO);
                assert_eq!(add16_signed(base, offset), (result, flags - Flags::ZERO), "{:04x} {}", base, offset);
            }
        }
    }

    #[test]
    fn rotate_through_carry_shifts_in_previous_carry() {
        assert_eq!(shift(Shift::Rl, 0x80, Flags::empty()), (0x00, Flags::ZERO | Flags::CARRY));
        assert_eq!(shift(Shift::Rl, 0x00, Flags::CARRY), (0x01, Flags::empty()));
        assert_eq!(shift(Shift::Rr, 0x01, Flags::empty()), (0x00, Flags::ZERO | Flags::CARRY));
        assert_eq!(shift(Shift::Rr, 0x00, Flags::CARRY), (0x80, Flags::empty()));
    }

    #[test]
    fn rotate_with_carry_wraps_the_shifted_bit() {
        assert_eq!(shift(Shift::Rlc, 0x85, Flags::empty()), (0x0b, Flags::CARRY));
        assert_eq!(shift(Shift::Rrc, 0x01, Flags::empty()), (0x80, Flags::CARRY));
        assert_eq!(shift_accumulator(Shift::Rlc, 0x00, Flags::ZERO), (0x00, Flags::empty()));
    }

    #[test]
    fn shifts() {
        assert_eq!(shift(Shift::Sra, 0x81, Flags::empty()), (0xc0, Flags::CARRY));
        assert_eq!(shift(Shift::Srl, 0x81, Flags::empty()), (0x40, Flags::CARRY));
        assert_eq!(shift(Shift::Sla, 0x81, Flags::empty()), (0x02, Flags::CARRY));
        assert_eq!(shift(Shift::Swap, 0xf1, Flags::CARRY), (0x1f, Flags::empty()));
    }

    #[test]
    fn bit_sets_zero_to_inverse_of_tested_bit() {
        assert_eq!(test_bit(7, 0x7f, Flags::CARRY), Flags::ZERO | Flags::HALF_CARRY | Flags::CARRY);
        assert_eq!(test_bit(0, 0x01, Flags::SUBTRACT), Flags::HALF_CARRY);
    }

    #[test]
    fn inc_dec_preserve_carry() {
        assert_eq!(inc8(0x0f, Flags::CARRY), (0x10, Flags::HALF_CARRY | Flags::CARRY));
        assert_eq!(inc8(0xff, Flags::empty()), (0x00, Flags::ZERO | Flags::HALF_CARRY));
        assert_eq!(dec8(0x10, Flags::CARRY), (0x0f, Flags::SUBTRACT | Flags::HALF_CARRY | Flags::CARRY));
        assert_eq!(dec8(0x01, Flags::empty()), (0x00, Flags::ZERO | Flags::SUBTRACT));
    }
}
