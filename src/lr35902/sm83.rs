use crate::error::AyyError;
use crate::lr35902::registers::{Register, RegisterPair};
use crate::memory::mmu::Mmu;
use bitflags::bitflags;
use log::error;

/// Builds the template for one opcode byte. Immediate operands are left as
/// zero and filled in by [`Sm83::decode`].
type FDecode = fn(u8, Opcode) -> Result<Instruction, AyyError>;

const PREFIX_OPCODE: u8 = 0xcb;
const ILLEGAL_OPCODES: [u8; 11] = [0xd3, 0xdb, 0xdd, 0xe3, 0xe4, 0xeb, 0xec, 0xed, 0xf4, 0xfc, 0xfd];

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    pub struct AddressingMode: u8 {
        const DIRECT    = 0b0001;
        const INDIRECT  = 0b0010;
        const INCREMENT = 0b0100;
        const DECREMENT = 0b1000;
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Condition {
    None,
    NZ,
    Z,
    NC,
    C,
}

/// An instruction operand.
///
/// Indirect forms address memory: `Reg8`/`Imm8` through the $FF00 page,
/// `Reg16`/`Imm16` directly. Memory accesses through an indirect operand
/// are always one byte wide.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Operand {
    Reg8(Register, AddressingMode),
    Reg16(RegisterPair, AddressingMode),
    Imm8(u8, AddressingMode),
    Imm16(u16, AddressingMode),
    Conditional(Condition),
    DisplacedReg16(RegisterPair, i8, AddressingMode),
    Offset(i8),
    Bit(u8),
    /// Fixed call target of `RST`.
    Restart(u8),
}

#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Opcode {
    Nop,
    Ld,
    Ldh,
    Inc,
    Dec,
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit,
    Res,
    Set,
    Jp,
    Jr,
    Call,
    Ret,
    Reti,
    Rst,
    Push,
    Pop,
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Halt,
    Stop,
    Di,
    Ei,
    Ccf,
    Scf,
    Cpl,
    Daa,
    Rla,
    Rra,
    Rlca,
    Rrca,
    Illegal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub lhs: Option<Operand>,
    pub rhs: Option<Operand>,
    pub length: usize,
    /// Cycles when taken, and when not taken for conditional branches.
    pub cycles: (usize, Option<usize>),
}

impl Instruction {
    fn new(opcode: Opcode, lhs: Option<Operand>, rhs: Option<Operand>, length: usize, cycles: (usize, Option<usize>)) -> Result<Instruction, AyyError> {
        Ok(Instruction {
            opcode,
            lhs,
            rhs,
            length,
            cycles,
        })
    }

    #[inline]
    pub fn cycles_for(&self, taken: bool) -> usize {
        match self.cycles {
            (_, Some(not_taken)) if !taken => not_taken,
            (cycles, _) => cycles,
        }
    }
}

macro_rules! define_decoder {
    ( $pattern:expr, $opcode:expr, $function:expr ) => {{
        ($pattern, $opcode, $function)
    }};
}

/// SM83 instruction decoder.
///
/// Both opcode tables are resolved from bit patterns once, at construction,
/// so decoding is a table lookup plus immediate fetch.
#[derive(Clone)]
pub struct Sm83 {
    table: Vec<Option<Instruction>>,
    table_prefixed: Vec<Option<Instruction>>,
}

impl Sm83 {
    pub fn new() -> Sm83 {
        let mut decoder_lut = Vec::new();
        let mut decoder_lut_prefixed = Vec::new();

        Sm83::propagate_decoders(&mut decoder_lut);
        Sm83::propagate_decoders_prefixed(&mut decoder_lut_prefixed);

        let table = (0..=0xffu8)
            .map(|byte| match byte {
                PREFIX_OPCODE => None,
                byte if ILLEGAL_OPCODES.contains(&byte) => Some(Instruction {
                    opcode: Opcode::Illegal,
                    lhs: None,
                    rhs: None,
                    length: 1,
                    cycles: (4, None),
                }),
                byte => Sm83::resolve(&decoder_lut, byte),
            })
            .collect();
        let table_prefixed = (0..=0xffu8).map(|byte| Sm83::resolve(&decoder_lut_prefixed, byte)).collect();

        Sm83 { table, table_prefixed }
    }

    /// First matching pattern wins; `x` matches either bit. A decoder that
    /// rejects its byte leaves the slot empty and is logged here, at table
    /// construction.
    fn resolve(lut: &[(&'static str, Opcode, FDecode)], byte: u8) -> Option<Instruction> {
        let bits = format!("{:08b}", byte);
        let (pattern, opcode, decoder_fn) = lut
            .iter()
            .find(|(pattern, _, _)| pattern.chars().zip(bits.chars()).all(|(p, b)| p == 'x' || p == b))?;

        match decoder_fn(byte, *opcode) {
            Ok(instruction) => Some(instruction),
            Err(e) => {
                error!("Decoder for pattern {} ({:?}) rejected ${:02x}: {}", pattern, opcode, byte, e);
                None
            }
        }
    }

    /// Decodes the instruction at `pc`, including a `$CB` prefix and any
    /// immediate bytes.
    pub fn decode(&self, mmu: &Mmu, pc: u16) -> Result<Instruction, AyyError> {
        let opcode_byte = mmu.read(pc);
        let template = if opcode_byte == PREFIX_OPCODE {
            let prefixed = mmu.read(pc.wrapping_add(1));
            self.table_prefixed[prefixed as usize].as_ref()
        } else {
            self.table[opcode_byte as usize].as_ref()
        };

        let mut instruction = match template {
            Some(instruction) => instruction.clone(),
            None => {
                return Err(AyyError::DecoderFailure {
                    opcode: opcode_byte,
                    address: pc,
                })
            }
        };

        let immediate = pc.wrapping_add(1);
        instruction.lhs = instruction.lhs.map(|operand| Sm83::fetch_immediate(mmu, immediate, operand));
        instruction.rhs = instruction.rhs.map(|operand| Sm83::fetch_immediate(mmu, immediate, operand));

        Ok(instruction)
    }

    fn fetch_immediate(mmu: &Mmu, addr: u16, operand: Operand) -> Operand {
        match operand {
            Operand::Imm8(_, mode) => Operand::Imm8(mmu.read(addr), mode),
            Operand::Imm16(_, mode) => Operand::Imm16(mmu.read16(addr), mode),
            Operand::Offset(_) => Operand::Offset(mmu.read(addr) as i8),
            Operand::DisplacedReg16(pair, _, mode) => Operand::DisplacedReg16(pair, mmu.read(addr) as i8, mode),
            operand => operand,
        }
    }

    fn lookup_register(data: u8) -> Result<Register, AyyError> {
        match data {
            0b000 => Ok(Register::B),
            0b001 => Ok(Register::C),
            0b010 => Ok(Register::D),
            0b011 => Ok(Register::E),
            0b100 => Ok(Register::H),
            0b101 => Ok(Register::L),
            0b111 => Ok(Register::A),
            _ => Err(AyyError::UnknownRegisterBits { data }),
        }
    }

    fn lookup_register_16(data: u8) -> Result<RegisterPair, AyyError> {
        match data {
            0b00 => Ok(RegisterPair::BC),
            0b01 => Ok(RegisterPair::DE),
            0b10 => Ok(RegisterPair::HL),
            0b11 => Ok(RegisterPair::SP),
            _ => Err(AyyError::UnknownRegisterBits { data }),
        }
    }

    /// `PUSH`/`POP` encode AF where everything else encodes SP.
    fn lookup_register_16_stack(data: u8) -> Result<RegisterPair, AyyError> {
        match Sm83::lookup_register_16(data)? {
            RegisterPair::SP => Ok(RegisterPair::AF),
            pair => Ok(pair),
        }
    }

    fn lookup_condition(data: u8) -> Result<Condition, AyyError> {
        match data {
            0b00 => Ok(Condition::NZ),
            0b01 => Ok(Condition::Z),
            0b10 => Ok(Condition::NC),
            0b11 => Ok(Condition::C),
            _ => Err(AyyError::UnknownConditionBits { data }),
        }
    }

    fn lookup_alu(data: u8) -> Opcode {
        match data & 0b111 {
            0b000 => Opcode::Add,
            0b001 => Opcode::Adc,
            0b010 => Opcode::Sub,
            0b011 => Opcode::Sbc,
            0b100 => Opcode::And,
            0b101 => Opcode::Xor,
            0b110 => Opcode::Or,
            _ => Opcode::Cp,
        }
    }

    fn lookup_shift(data: u8) -> Opcode {
        match data & 0b111 {
            0b000 => Opcode::Rlc,
            0b001 => Opcode::Rrc,
            0b010 => Opcode::Rl,
            0b011 => Opcode::Rr,
            0b100 => Opcode::Sla,
            0b101 => Opcode::Sra,
            0b110 => Opcode::Swap,
            _ => Opcode::Srl,
        }
    }

    /// `r8` or `(HL)` from a 3-bit field, with the cycle cost of each form.
    fn decode_8bit_operand(value: u8, base_cycles: usize, hl_cycles: usize) -> Result<(Operand, usize), AyyError> {
        if value == 0b110 {
            Ok((Operand::Reg16(RegisterPair::HL, AddressingMode::INDIRECT), hl_cycles))
        } else {
            Ok((Operand::Reg8(Sm83::lookup_register(value)?, AddressingMode::DIRECT), base_cycles))
        }
    }

    #[inline]
    fn reg8(register: Register) -> Option<Operand> {
        Some(Operand::Reg8(register, AddressingMode::DIRECT))
    }

    #[inline]
    fn reg16(pair: RegisterPair) -> Option<Operand> {
        Some(Operand::Reg16(pair, AddressingMode::DIRECT))
    }

    #[inline]
    fn imm8() -> Option<Operand> {
        Some(Operand::Imm8(0, AddressingMode::DIRECT))
    }

    #[inline]
    fn imm16() -> Option<Operand> {
        Some(Operand::Imm16(0, AddressingMode::DIRECT))
    }

    fn propagate_decoders(lut: &mut Vec<(&'static str, Opcode, FDecode)>) {
        // nop
        lut.push(define_decoder!("00000000", Opcode::Nop, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));

        // ld (imm16), SP
        lut.push(define_decoder!("00001000", Opcode::Ld, |_, opcode| {
            Instruction::new(
                opcode,
                Some(Operand::Imm16(0, AddressingMode::INDIRECT)),
                Sm83::reg16(RegisterPair::SP),
                3,
                (20, None),
            )
        }));

        // stop imm8
        lut.push(define_decoder!("00010000", Opcode::Stop, |_, opcode| {
            Instruction::new(opcode, Sm83::imm8(), None, 2, (4, None))
        }));

        // jr imm8
        lut.push(define_decoder!("00011000", Opcode::Jr, |_, opcode| {
            Instruction::new(opcode, Some(Operand::Conditional(Condition::None)), Some(Operand::Offset(0)), 2, (12, None))
        }));

        // jr cond, imm8
        lut.push(define_decoder!("001xx000", Opcode::Jr, |byte, opcode| {
            let condition = Sm83::lookup_condition((byte & 0b0001_1000) >> 3)?;
            Instruction::new(opcode, Some(Operand::Conditional(condition)), Some(Operand::Offset(0)), 2, (12, Some(8)))
        }));

        // ld r16, imm16
        lut.push(define_decoder!("00xx0001", Opcode::Ld, |byte, opcode| {
            let destination = Sm83::lookup_register_16((byte & 0b0011_0000) >> 4)?;
            Instruction::new(opcode, Sm83::reg16(destination), Sm83::imm16(), 3, (12, None))
        }));

        // ld (BC), A / ld (DE), A / ld (HL+), A / ld (HL-), A
        lut.push(define_decoder!("00xx0010", Opcode::Ld, |byte, opcode| {
            let destination = Sm83::decode_indirect_pair((byte & 0b0011_0000) >> 4);
            Instruction::new(opcode, Some(destination), Sm83::reg8(Register::A), 1, (8, None))
        }));

        // inc r16
        lut.push(define_decoder!("00xx0011", Opcode::Inc, |byte, opcode| {
            let destination = Sm83::lookup_register_16((byte & 0b0011_0000) >> 4)?;
            Instruction::new(opcode, Sm83::reg16(destination), None, 1, (8, None))
        }));

        // inc r8 / inc (HL)
        lut.push(define_decoder!("00xxx100", Opcode::Inc, |byte, opcode| {
            let (lhs, cycles) = Sm83::decode_8bit_operand((byte & 0b0011_1000) >> 3, 4, 12)?;
            Instruction::new(opcode, Some(lhs), None, 1, (cycles, None))
        }));

        // dec r8 / dec (HL)
        lut.push(define_decoder!("00xxx101", Opcode::Dec, |byte, opcode| {
            let (lhs, cycles) = Sm83::decode_8bit_operand((byte & 0b0011_1000) >> 3, 4, 12)?;
            Instruction::new(opcode, Some(lhs), None, 1, (cycles, None))
        }));

        // ld r8, imm8 / ld (HL), imm8
        lut.push(define_decoder!("00xxx110", Opcode::Ld, |byte, opcode| {
            let (lhs, cycles) = Sm83::decode_8bit_operand((byte & 0b0011_1000) >> 3, 8, 12)?;
            Instruction::new(opcode, Some(lhs), Sm83::imm8(), 2, (cycles, None))
        }));

        // accumulator rotates
        lut.push(define_decoder!("00000111", Opcode::Rlca, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));
        lut.push(define_decoder!("00001111", Opcode::Rrca, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));
        lut.push(define_decoder!("00010111", Opcode::Rla, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));
        lut.push(define_decoder!("00011111", Opcode::Rra, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));

        // add HL, r16
        lut.push(define_decoder!("00xx1001", Opcode::Add, |byte, opcode| {
            let source = Sm83::lookup_register_16((byte & 0b0011_0000) >> 4)?;
            Instruction::new(opcode, Sm83::reg16(RegisterPair::HL), Sm83::reg16(source), 1, (8, None))
        }));

        // ld A, (BC) / ld A, (DE) / ld A, (HL+) / ld A, (HL-)
        lut.push(define_decoder!("00xx1010", Opcode::Ld, |byte, opcode| {
            let source = Sm83::decode_indirect_pair((byte & 0b0011_0000) >> 4);
            Instruction::new(opcode, Sm83::reg8(Register::A), Some(source), 1, (8, None))
        }));

        // dec r16
        lut.push(define_decoder!("00xx1011", Opcode::Dec, |byte, opcode| {
            let destination = Sm83::lookup_register_16((byte & 0b0011_0000) >> 4)?;
            Instruction::new(opcode, Sm83::reg16(destination), None, 1, (8, None))
        }));

        // daa / cpl / scf / ccf
        lut.push(define_decoder!("00100111", Opcode::Daa, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));
        lut.push(define_decoder!("00101111", Opcode::Cpl, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));
        lut.push(define_decoder!("00110111", Opcode::Scf, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));
        lut.push(define_decoder!("00111111", Opcode::Ccf, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));

        // halt sits where ld (HL), (HL) would be
        lut.push(define_decoder!("01110110", Opcode::Halt, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));

        // ld r8, r8 / ld r8, (HL) / ld (HL), r8
        lut.push(define_decoder!("01xxxxxx", Opcode::Ld, |byte, opcode| {
            let (lhs, cycles1) = Sm83::decode_8bit_operand((byte & 0b0011_1000) >> 3, 4, 8)?;
            let (rhs, cycles2) = Sm83::decode_8bit_operand(byte & 0b0000_0111, 4, 8)?;
            Instruction::new(opcode, Some(lhs), Some(rhs), 1, (std::cmp::max(cycles1, cycles2), None))
        }));

        // add/adc/sub/sbc/and/xor/or/cp A, r8 / (HL)
        lut.push(define_decoder!("10xxxxxx", Opcode::Add, |byte, _| {
            let (rhs, cycles) = Sm83::decode_8bit_operand(byte & 0b0000_0111, 4, 8)?;
            Instruction::new(Sm83::lookup_alu(byte >> 3), Sm83::reg8(Register::A), Some(rhs), 1, (cycles, None))
        }));

        // ret cond
        lut.push(define_decoder!("110xx000", Opcode::Ret, |byte, opcode| {
            let condition = Sm83::lookup_condition((byte & 0b0001_1000) >> 3)?;
            Instruction::new(opcode, Some(Operand::Conditional(condition)), None, 1, (20, Some(8)))
        }));

        // ret / reti
        lut.push(define_decoder!("11001001", Opcode::Ret, |_, opcode| {
            Instruction::new(opcode, Some(Operand::Conditional(Condition::None)), None, 1, (16, None))
        }));
        lut.push(define_decoder!("11011001", Opcode::Reti, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (16, None))
        }));

        // pop r16
        lut.push(define_decoder!("11xx0001", Opcode::Pop, |byte, opcode| {
            let destination = Sm83::lookup_register_16_stack((byte & 0b0011_0000) >> 4)?;
            Instruction::new(opcode, Sm83::reg16(destination), None, 1, (12, None))
        }));

        // jp cond, imm16
        lut.push(define_decoder!("110xx010", Opcode::Jp, |byte, opcode| {
            let condition = Sm83::lookup_condition((byte & 0b0001_1000) >> 3)?;
            Instruction::new(opcode, Some(Operand::Conditional(condition)), Sm83::imm16(), 3, (16, Some(12)))
        }));

        // jp imm16
        lut.push(define_decoder!("11000011", Opcode::Jp, |_, opcode| {
            Instruction::new(opcode, Some(Operand::Conditional(Condition::None)), Sm83::imm16(), 3, (16, None))
        }));

        // jp HL
        lut.push(define_decoder!("11101001", Opcode::Jp, |_, opcode| {
            Instruction::new(opcode, Some(Operand::Conditional(Condition::None)), Sm83::reg16(RegisterPair::HL), 1, (4, None))
        }));

        // call cond, imm16
        lut.push(define_decoder!("110xx100", Opcode::Call, |byte, opcode| {
            let condition = Sm83::lookup_condition((byte & 0b0001_1000) >> 3)?;
            Instruction::new(opcode, Some(Operand::Conditional(condition)), Sm83::imm16(), 3, (24, Some(12)))
        }));

        // call imm16
        lut.push(define_decoder!("11001101", Opcode::Call, |_, opcode| {
            Instruction::new(opcode, Some(Operand::Conditional(Condition::None)), Sm83::imm16(), 3, (24, None))
        }));

        // push r16
        lut.push(define_decoder!("11xx0101", Opcode::Push, |byte, opcode| {
            let source = Sm83::lookup_register_16_stack((byte & 0b0011_0000) >> 4)?;
            Instruction::new(opcode, Sm83::reg16(source), None, 1, (16, None))
        }));

        // add/adc/sub/sbc/and/xor/or/cp A, imm8
        lut.push(define_decoder!("11xxx110", Opcode::Add, |byte, _| {
            Instruction::new(Sm83::lookup_alu(byte >> 3), Sm83::reg8(Register::A), Sm83::imm8(), 2, (8, None))
        }));

        // rst n
        lut.push(define_decoder!("11xxx111", Opcode::Rst, |byte, opcode| {
            Instruction::new(opcode, Some(Operand::Restart(byte & 0b0011_1000)), None, 1, (16, None))
        }));

        // ldh (imm8), A
        lut.push(define_decoder!("11100000", Opcode::Ldh, |_, opcode| {
            Instruction::new(
                opcode,
                Some(Operand::Imm8(0, AddressingMode::INDIRECT)),
                Sm83::reg8(Register::A),
                2,
                (12, None),
            )
        }));

        // ldh A, (imm8)
        lut.push(define_decoder!("11110000", Opcode::Ldh, |_, opcode| {
            Instruction::new(
                opcode,
                Sm83::reg8(Register::A),
                Some(Operand::Imm8(0, AddressingMode::INDIRECT)),
                2,
                (12, None),
            )
        }));

        // ld (C), A
        lut.push(define_decoder!("11100010", Opcode::Ld, |_, opcode| {
            Instruction::new(
                opcode,
                Some(Operand::Reg8(Register::C, AddressingMode::INDIRECT)),
                Sm83::reg8(Register::A),
                1,
                (8, None),
            )
        }));

        // ld A, (C)
        lut.push(define_decoder!("11110010", Opcode::Ld, |_, opcode| {
            Instruction::new(
                opcode,
                Sm83::reg8(Register::A),
                Some(Operand::Reg8(Register::C, AddressingMode::INDIRECT)),
                1,
                (8, None),
            )
        }));

        // add SP, imm8
        lut.push(define_decoder!("11101000", Opcode::Add, |_, opcode| {
            Instruction::new(opcode, Sm83::reg16(RegisterPair::SP), Some(Operand::Offset(0)), 2, (16, None))
        }));

        // ld (imm16), A
        lut.push(define_decoder!("11101010", Opcode::Ld, |_, opcode| {
            Instruction::new(
                opcode,
                Some(Operand::Imm16(0, AddressingMode::INDIRECT)),
                Sm83::reg8(Register::A),
                3,
                (16, None),
            )
        }));

        // ld A, (imm16)
        lut.push(define_decoder!("11111010", Opcode::Ld, |_, opcode| {
            Instruction::new(
                opcode,
                Sm83::reg8(Register::A),
                Some(Operand::Imm16(0, AddressingMode::INDIRECT)),
                3,
                (16, None),
            )
        }));

        // di / ei
        lut.push(define_decoder!("11110011", Opcode::Di, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));
        lut.push(define_decoder!("11111011", Opcode::Ei, |_, opcode| {
            Instruction::new(opcode, None, None, 1, (4, None))
        }));

        // ld HL, SP+/-imm8
        lut.push(define_decoder!("11111000", Opcode::Ld, |_, opcode| {
            Instruction::new(
                opcode,
                Sm83::reg16(RegisterPair::HL),
                Some(Operand::DisplacedReg16(RegisterPair::SP, 0, AddressingMode::DIRECT)),
                2,
                (12, None),
            )
        }));

        // ld SP, HL
        lut.push(define_decoder!("11111001", Opcode::Ld, |_, opcode| {
            Instruction::new(opcode, Sm83::reg16(RegisterPair::SP), Sm83::reg16(RegisterPair::HL), 1, (8, None))
        }));
    }

    /// `(BC)`, `(DE)`, `(HL+)` and `(HL-)` from the 2-bit field of the
    /// accumulator load/store group.
    fn decode_indirect_pair(data: u8) -> Operand {
        match data & 0b11 {
            0b00 => Operand::Reg16(RegisterPair::BC, AddressingMode::INDIRECT),
            0b01 => Operand::Reg16(RegisterPair::DE, AddressingMode::INDIRECT),
            0b10 => Operand::Reg16(RegisterPair::HL, AddressingMode::INDIRECT | AddressingMode::INCREMENT),
            _ => Operand::Reg16(RegisterPair::HL, AddressingMode::INDIRECT | AddressingMode::DECREMENT),
        }
    }

    fn propagate_decoders_prefixed(lut: &mut Vec<(&'static str, Opcode, FDecode)>) {
        // rlc/rrc/rl/rr/sla/sra/swap/srl r8 / (HL)
        lut.push(define_decoder!("00xxxxxx", Opcode::Rlc, |byte, _| {
            let (lhs, cycles) = Sm83::decode_8bit_operand(byte & 0b0000_0111, 8, 16)?;
            Instruction::new(Sm83::lookup_shift(byte >> 3), Some(lhs), None, 2, (cycles, None))
        }));

        // bit n, r8 / bit n, (HL)
        lut.push(define_decoder!("01xxxxxx", Opcode::Bit, |byte, opcode| {
            let (rhs, cycles) = Sm83::decode_8bit_operand(byte & 0b0000_0111, 8, 12)?;
            Instruction::new(opcode, Some(Operand::Bit((byte & 0b0011_1000) >> 3)), Some(rhs), 2, (cycles, None))
        }));

        // res n, r8 / res n, (HL)
        lut.push(define_decoder!("10xxxxxx", Opcode::Res, |byte, opcode| {
            let (rhs, cycles) = Sm83::decode_8bit_operand(byte & 0b0000_0111, 8, 16)?;
            Instruction::new(opcode, Some(Operand::Bit((byte & 0b0011_1000) >> 3)), Some(rhs), 2, (cycles, None))
        }));

        // set n, r8 / set n, (HL)
        lut.push(define_decoder!("11xxxxxx", Opcode::Set, |byte, opcode| {
            let (rhs, cycles) = Sm83::decode_8bit_operand(byte & 0b0000_0111, 8, 16)?;
            Instruction::new(opcode, Some(Operand::Bit((byte & 0b0011_1000) >> 3)), Some(rhs), 2, (cycles, None))
        }));
    }
}

impl Default for Sm83 {
    fn default() -> Sm83 {
        Sm83::new()
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut output = format!("{:?}", self.opcode).to_lowercase();

        let mut ignore_destination = false;
        if let Some(destination) = &self.lhs {
            match destination {
                Operand::Conditional(Condition::None) => ignore_destination = true,
                _ => output.push_str(&format!(" {}", destination)),
            };
        }

        if let Some(source) = &self.rhs {
            if !ignore_destination {
                output.push_str(&format!(", {}", source));
            } else {
                output.push_str(&format!(" {}", source));
            }
        }

        write!(f, "{}", output)
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let output = match self {
            Register::A => "a",
            Register::F => "f",
            Register::B => "b",
            Register::C => "c",
            Register::D => "d",
            Register::E => "e",
            Register::H => "h",
            Register::L => "l",
        };

        write!(f, "{}", output)
    }
}

impl std::fmt::Display for RegisterPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let output = match self {
            RegisterPair::AF => "af",
            RegisterPair::BC => "bc",
            RegisterPair::DE => "de",
            RegisterPair::HL => "hl",
            RegisterPair::SP => "sp",
            RegisterPair::PC => "pc",
        };

        write!(f, "{}", output)
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Operand::Reg8(reg, mode) if mode.contains(AddressingMode::INDIRECT) => write!(f, "({})", reg),
            Operand::Reg8(reg, _) => write!(f, "{}", reg),
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::INCREMENT) => write!(f, "({}+)", reg),
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::DECREMENT) => write!(f, "({}-)", reg),
            Operand::Reg16(reg, mode) if mode.contains(AddressingMode::INDIRECT) => write!(f, "({})", reg),
            Operand::Reg16(reg, _) => write!(f, "{}", reg),
            Operand::Imm8(value, mode) if mode.contains(AddressingMode::INDIRECT) => write!(f, "(${:02x})", value),
            Operand::Imm8(value, _) => write!(f, "${:02x}", value),
            Operand::Imm16(value, mode) if mode.contains(AddressingMode::INDIRECT) => write!(f, "(${:04x})", value),
            Operand::Imm16(value, _) => write!(f, "${:04x}", value),
            Operand::Conditional(cond) => write!(f, "{}", cond),
            Operand::Offset(value) if *value >= 0 => write!(f, "+{}", value),
            Operand::Offset(value) => write!(f, "{}", value),
            Operand::Bit(value) => write!(f, "{}", value),
            Operand::Restart(target) => write!(f, "${:02x}", target),
            Operand::DisplacedReg16(reg, value, _) if *value >= 0 => write!(f, "{}+{}", reg, value),
            Operand::DisplacedReg16(reg, value, _) => write!(f, "{}{}", reg, value),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let output = match self {
            Condition::None => "",
            Condition::NZ => "nz",
            Condition::Z => "z",
            Condition::NC => "nc",
            Condition::C => "c",
        };

        write!(f, "{}", output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::cartridge::tests::build_rom;
    use crate::memory::mapper::from_rom;

    fn mmu_with_program(program: &[u8]) -> Mmu {
        let (_, cartridge) = from_rom(build_rom(0x00, 0x00, 0x00)).unwrap();
        let mut mmu = Mmu::new(cartridge);
        for (i, byte) in program.iter().enumerate() {
            mmu.write(0xc000 + i as u16, *byte);
        }
        mmu
    }

    #[test]
    fn failing_decoder_leaves_slot_empty() {
        fn reject(byte: u8, _: Opcode) -> Result<Instruction, AyyError> {
            Err(AyyError::UnknownRegisterBits { data: byte & 0b111 })
        }
        fn accept(_: u8, opcode: Opcode) -> Result<Instruction, AyyError> {
            Instruction::new(opcode, None, None, 1, (4, None))
        }

        let lut: [(&'static str, Opcode, FDecode); 2] = [
            ("0000011x", Opcode::Ld, reject as FDecode),
            ("xxxxxxxx", Opcode::Nop, accept as FDecode),
        ];
        assert_eq!(Sm83::resolve(&lut, 0x06), None);
        assert_eq!(Sm83::resolve(&lut, 0x07), None);
        assert_eq!(Sm83::resolve(&lut, 0x05).map(|instruction| instruction.opcode), Some(Opcode::Nop));
    }

    #[test]
    fn every_opcode_has_a_table_entry() {
        let sm83 = Sm83::new();
        for byte in 0..=0xffu8 {
            assert_eq!(sm83.table[byte as usize].is_some(), byte != PREFIX_OPCODE, "${:02x}", byte);
            assert!(sm83.table_prefixed[byte as usize].is_some(), "$cb ${:02x}", byte);
        }
    }

    #[test]
    fn decodes_immediates() {
        let sm83 = Sm83::new();
        let mmu = mmu_with_program(&[0x01, 0x34, 0x12, 0x3e, 0x05, 0x18, 0xfe, 0xf8, 0x80]);

        let instruction = sm83.decode(&mmu, 0xc000).unwrap();
        assert_eq!(instruction.rhs, Some(Operand::Imm16(0x1234, AddressingMode::DIRECT)));
        assert_eq!(instruction.to_string(), "ld bc, $1234");

        let instruction = sm83.decode(&mmu, 0xc003).unwrap();
        assert_eq!(instruction.to_string(), "ld a, $05");
        assert_eq!(instruction.length, 2);

        let instruction = sm83.decode(&mmu, 0xc005).unwrap();
        assert_eq!(instruction.rhs, Some(Operand::Offset(-2)));
        assert_eq!(instruction.to_string(), "jr -2");

        let instruction = sm83.decode(&mmu, 0xc007).unwrap();
        assert_eq!(instruction.to_string(), "ld hl, sp-128");
    }

    #[test]
    fn decodes_prefixed_table() {
        let sm83 = Sm83::new();
        let mmu = mmu_with_program(&[0xcb, 0x7e, 0xcb, 0x37, 0xcb, 0xc6]);

        let instruction = sm83.decode(&mmu, 0xc000).unwrap();
        assert_eq!(instruction.opcode, Opcode::Bit);
        assert_eq!(instruction.cycles, (12, None));
        assert_eq!(instruction.to_string(), "bit 7, (hl)");

        let instruction = sm83.decode(&mmu, 0xc002).unwrap();
        assert_eq!(instruction.to_string(), "swap a");
        assert_eq!(instruction.cycles, (8, None));

        let instruction = sm83.decode(&mmu, 0xc004).unwrap();
        assert_eq!(instruction.to_string(), "set 0, (hl)");
        assert_eq!(instruction.cycles, (16, None));
    }

    #[test]
    fn timing_grid_samples() {
        let sm83 = Sm83::new();
        let expected: [(u8, (usize, Option<usize>)); 14] = [
            (0x00, (4, None)),
            (0x08, (20, None)),
            (0x20, (12, Some(8))),
            (0x34, (12, None)),
            (0x36, (12, None)),
            (0x46, (8, None)),
            (0x86, (8, None)),
            (0xc0, (20, Some(8))),
            (0xc2, (16, Some(12))),
            (0xc4, (24, Some(12))),
            (0xc5, (16, None)),
            (0xe8, (16, None)),
            (0xe9, (4, None)),
            (0xff, (16, None)),
        ];
        for (byte, cycles) in expected {
            let instruction = sm83.table[byte as usize].as_ref().unwrap();
            assert_eq!(instruction.cycles, cycles, "${:02x}", byte);
        }
    }

    #[test]
    fn stack_ops_use_af() {
        let sm83 = Sm83::new();
        let pop = sm83.table[0xf1].as_ref().unwrap();
        assert_eq!(pop.lhs, Some(Operand::Reg16(RegisterPair::AF, AddressingMode::DIRECT)));
        let add = sm83.table[0x39].as_ref().unwrap();
        assert_eq!(add.rhs, Some(Operand::Reg16(RegisterPair::SP, AddressingMode::DIRECT)));
    }

    #[test]
    fn illegal_opcodes_are_one_byte() {
        let sm83 = Sm83::new();
        for byte in ILLEGAL_OPCODES {
            let instruction = sm83.table[byte as usize].as_ref().unwrap();
            assert_eq!(instruction.opcode, Opcode::Illegal);
            assert_eq!(instruction.length, 1);
        }
    }
}
