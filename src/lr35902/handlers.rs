use crate::error::AyyError;
use crate::lr35902::alu::{self, Shift};
use crate::lr35902::cpu::{Cpu, State};
use crate::lr35902::registers::{Flags, RegisterPair};
use crate::lr35902::sm83::{AddressingMode, Condition, Instruction, Opcode, Operand};
use crate::memory::mmu::Mmu;
use crate::memory::Address;
use log::{debug, warn};

/// Instruction semantics. Every handler runs after PC has been advanced
/// past the instruction and returns the cycles it took.
pub struct Handlers {}

#[allow(unused_variables)]
impl Handlers {
    pub fn nop(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        Ok(instruction.cycles.0)
    }

    pub fn stop(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        warn!("STOP at ${:04x} treated as a no-op", cpu.registers.pc.wrapping_sub(2));
        Ok(instruction.cycles.0)
    }

    pub fn illegal(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let pc = cpu.registers.pc.wrapping_sub(1);
        warn!("Illegal opcode ${:02x} at ${:04x} treated as a no-op", mmu.read(pc), pc);
        Ok(instruction.cycles.0)
    }

    pub fn halt(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        debug!("Entering HALT at ${:04x}", cpu.registers.pc.wrapping_sub(1));
        cpu.state = State::Halted;
        Ok(instruction.cycles.0)
    }

    pub fn disable_interrupts(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let ime = &mut mmu.interrupts_mut().ime;
        ime.enabled = false;
        ime.enable_pending = false;
        Ok(instruction.cycles.0)
    }

    pub fn enable_interrupts(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        mmu.interrupts_mut().ime.enable_pending = true;
        Ok(instruction.cycles.0)
    }

    pub fn load(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let (lhs, rhs) = Handlers::binary_operands("load", instruction)?;

        match (lhs, rhs) {
            // ld (imm16), SP stores both bytes
            (Operand::Imm16(addr, mode), Operand::Reg16(pair, _)) if mode.contains(AddressingMode::INDIRECT) => {
                let value = cpu.registers.read16(*pair);
                mmu.write16(*addr, value);
            }
            // ld HL, SP+e
            (Operand::Reg16(destination, _), Operand::DisplacedReg16(base, offset, _)) => {
                let (result, flags) = alu::add16_signed(cpu.registers.read16(*base), *offset);
                cpu.registers.write16(*destination, result);
                cpu.registers.f = flags;
            }
            _ => {
                let value = Handlers::read_operand(cpu, mmu, rhs)?;
                Handlers::write_operand(cpu, mmu, lhs, value)?;
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn add(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let (lhs, rhs) = Handlers::binary_operands("add", instruction)?;

        match (lhs, rhs) {
            (Operand::Reg16(RegisterPair::SP, _), Operand::Offset(offset)) => {
                let (result, flags) = alu::add16_signed(cpu.registers.sp, *offset);
                cpu.registers.sp = result;
                cpu.registers.f = flags;
            }
            (Operand::Reg16(destination, _), Operand::Reg16(source, _)) => {
                let (result, flags) = alu::add16(cpu.registers.read16(*destination), cpu.registers.read16(*source), cpu.registers.f);
                cpu.registers.write16(*destination, result);
                cpu.registers.f = flags;
            }
            _ => {
                let value = Handlers::read_operand(cpu, mmu, rhs)? as u8;
                let (result, flags) = alu::add8(cpu.registers.a, value, false);
                cpu.registers.a = result;
                cpu.registers.f = flags;
            }
        }

        Ok(instruction.cycles.0)
    }

    /// ADC, SUB, SBC, AND, XOR, OR and CP on the accumulator.
    pub fn arithmetic(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let (_, rhs) = Handlers::binary_operands("arithmetic", instruction)?;
        let value = Handlers::read_operand(cpu, mmu, rhs)? as u8;
        let a = cpu.registers.a;
        let carry = cpu.registers.flag(Flags::CARRY);

        let (result, flags) = match instruction.opcode {
            Opcode::Adc => alu::add8(a, value, carry),
            Opcode::Sub | Opcode::Cp => alu::sub8(a, value, false),
            Opcode::Sbc => alu::sub8(a, value, carry),
            Opcode::And => alu::and8(a, value),
            Opcode::Xor => alu::xor8(a, value),
            Opcode::Or => alu::or8(a, value),
            _ => return Err(Handlers::invalid("arithmetic", instruction.lhs.clone())),
        };

        // CP only keeps the flags
        if instruction.opcode != Opcode::Cp {
            cpu.registers.a = result;
        }
        cpu.registers.f = flags;

        Ok(instruction.cycles.0)
    }

    pub fn increment(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let operand = Handlers::unary_operand("increment", instruction)?;

        match operand {
            Operand::Reg16(pair, mode) if mode.contains(AddressingMode::DIRECT) => {
                let value = cpu.registers.read16(*pair);
                cpu.registers.write16(*pair, value.wrapping_add(1));
            }
            _ => {
                let value = Handlers::read_operand(cpu, mmu, operand)? as u8;
                let (result, flags) = alu::inc8(value, cpu.registers.f);
                Handlers::write_operand(cpu, mmu, operand, result as u16)?;
                cpu.registers.f = flags;
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn decrement(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let operand = Handlers::unary_operand("decrement", instruction)?;

        match operand {
            Operand::Reg16(pair, mode) if mode.contains(AddressingMode::DIRECT) => {
                let value = cpu.registers.read16(*pair);
                cpu.registers.write16(*pair, value.wrapping_sub(1));
            }
            _ => {
                let value = Handlers::read_operand(cpu, mmu, operand)? as u8;
                let (result, flags) = alu::dec8(value, cpu.registers.f);
                Handlers::write_operand(cpu, mmu, operand, result as u16)?;
                cpu.registers.f = flags;
            }
        }

        Ok(instruction.cycles.0)
    }

    pub fn decimal_adjust(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let (result, flags) = alu::daa(cpu.registers.a, cpu.registers.f);
        cpu.registers.a = result;
        cpu.registers.f = flags;
        Ok(instruction.cycles.0)
    }

    pub fn complement(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        cpu.registers.a = !cpu.registers.a;
        cpu.registers.set_flag(Flags::SUBTRACT, true);
        cpu.registers.set_flag(Flags::HALF_CARRY, true);
        Ok(instruction.cycles.0)
    }

    pub fn set_carry(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        cpu.registers.set_flag(Flags::SUBTRACT, false);
        cpu.registers.set_flag(Flags::HALF_CARRY, false);
        cpu.registers.set_flag(Flags::CARRY, true);
        Ok(instruction.cycles.0)
    }

    pub fn complement_carry(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let carry = cpu.registers.flag(Flags::CARRY);
        cpu.registers.set_flag(Flags::SUBTRACT, false);
        cpu.registers.set_flag(Flags::HALF_CARRY, false);
        cpu.registers.set_flag(Flags::CARRY, !carry);
        Ok(instruction.cycles.0)
    }

    /// RLCA, RRCA, RLA and RRA. Zero is always cleared.
    pub fn rotate_accumulator(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let kind = match instruction.opcode {
            Opcode::Rlca => Shift::Rlc,
            Opcode::Rrca => Shift::Rrc,
            Opcode::Rla => Shift::Rl,
            Opcode::Rra => Shift::Rr,
            _ => return Err(Handlers::invalid("rotate_accumulator", None)),
        };

        let (result, flags) = alu::shift_accumulator(kind, cpu.registers.a, cpu.registers.f);
        cpu.registers.a = result;
        cpu.registers.f = flags;
        Ok(instruction.cycles.0)
    }

    pub fn shift(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let operand = Handlers::unary_operand("shift", instruction)?;
        let kind = match instruction.opcode {
            Opcode::Rlc => Shift::Rlc,
            Opcode::Rrc => Shift::Rrc,
            Opcode::Rl => Shift::Rl,
            Opcode::Rr => Shift::Rr,
            Opcode::Sla => Shift::Sla,
            Opcode::Sra => Shift::Sra,
            Opcode::Swap => Shift::Swap,
            Opcode::Srl => Shift::Srl,
            _ => return Err(Handlers::invalid("shift", Some(operand.clone()))),
        };

        let value = Handlers::read_operand(cpu, mmu, operand)? as u8;
        let (result, flags) = alu::shift(kind, value, cpu.registers.f);
        Handlers::write_operand(cpu, mmu, operand, result as u16)?;
        cpu.registers.f = flags;

        Ok(instruction.cycles.0)
    }

    pub fn test_bit(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let (bit, target) = Handlers::bit_operands("test_bit", instruction)?;
        let value = Handlers::read_operand(cpu, mmu, target)? as u8;
        cpu.registers.f = alu::test_bit(bit, value, cpu.registers.f);
        Ok(instruction.cycles.0)
    }

    /// RES and SET. Flags are untouched.
    pub fn modify_bit(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let (bit, target) = Handlers::bit_operands("modify_bit", instruction)?;
        let value = Handlers::read_operand(cpu, mmu, target)? as u8;
        let result = if instruction.opcode == Opcode::Set {
            value | (1 << bit)
        } else {
            value & !(1 << bit)
        };
        Handlers::write_operand(cpu, mmu, target, result as u16)?;
        Ok(instruction.cycles.0)
    }

    /// JP, JR and CALL, conditional or not.
    pub fn jump(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let (lhs, rhs) = Handlers::binary_operands("jump", instruction)?;
        let condition = match lhs {
            Operand::Conditional(condition) => condition,
            _ => return Err(Handlers::invalid("jump", Some(lhs.clone()))),
        };

        if !Handlers::check_condition(cpu, condition) {
            return Ok(instruction.cycles_for(false));
        }

        let pc = Address::new(cpu.registers.pc);
        let target = match (instruction.opcode, rhs) {
            (Opcode::Jr, Operand::Offset(offset)) => pc.offset(*offset),
            (_, Operand::Imm16(addr, _)) => Address::new(*addr),
            (_, Operand::Reg16(pair, _)) => Address::new(cpu.registers.read16(*pair)),
            _ => return Err(Handlers::invalid("jump", Some(rhs.clone()))),
        };

        if instruction.opcode == Opcode::Call {
            cpu.push_stack(mmu, pc.value());
        }
        cpu.registers.pc = target.value();

        Ok(instruction.cycles_for(true))
    }

    pub fn ret(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let condition = match Handlers::unary_operand("ret", instruction)? {
            Operand::Conditional(condition) => condition,
            operand => return Err(Handlers::invalid("ret", Some(operand.clone()))),
        };

        if !Handlers::check_condition(cpu, condition) {
            return Ok(instruction.cycles_for(false));
        }

        cpu.registers.pc = cpu.pop_stack(mmu);
        Ok(instruction.cycles_for(true))
    }

    /// RET followed by the same delayed enable as EI.
    pub fn reti(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        cpu.registers.pc = cpu.pop_stack(mmu);
        mmu.interrupts_mut().ime.enable_pending = true;
        Ok(instruction.cycles.0)
    }

    pub fn restart(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        let target = match Handlers::unary_operand("restart", instruction)? {
            Operand::Restart(target) => *target,
            operand => return Err(Handlers::invalid("restart", Some(operand.clone()))),
        };

        let pc = cpu.registers.pc;
        cpu.push_stack(mmu, pc);
        cpu.registers.pc = target as u16;
        Ok(instruction.cycles.0)
    }

    pub fn push(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        match Handlers::unary_operand("push", instruction)? {
            Operand::Reg16(pair, _) => {
                let value = cpu.registers.read16(*pair);
                cpu.push_stack(mmu, value);
            }
            operand => return Err(Handlers::invalid("push", Some(operand.clone()))),
        }

        Ok(instruction.cycles.0)
    }

    /// `POP AF` drops the low nibble of F.
    pub fn pop(cpu: &mut Cpu, mmu: &mut Mmu, instruction: &Instruction) -> Result<usize, AyyError> {
        match Handlers::unary_operand("pop", instruction)? {
            Operand::Reg16(pair, _) => {
                let value = cpu.pop_stack(mmu);
                cpu.registers.write16(*pair, value);
            }
            operand => return Err(Handlers::invalid("pop", Some(operand.clone()))),
        }

        Ok(instruction.cycles.0)
    }

    fn read_operand(cpu: &mut Cpu, mmu: &Mmu, operand: &Operand) -> Result<u16, AyyError> {
        let value = match operand {
            Operand::Reg8(reg, mode) if mode.contains(AddressingMode::INDIRECT) => {
                // ld A, (C)
                mmu.read(Address::high_page(cpu.registers.read(*reg)).value()) as u16
            }
            Operand::Reg8(reg, _) => cpu.registers.read(*reg) as u16,
            Operand::Reg16(pair, mode) if mode.contains(AddressingMode::INDIRECT) => {
                let addr = Handlers::indirect_address(cpu, *pair, *mode);
                mmu.read(addr) as u16
            }
            Operand::Reg16(pair, _) => cpu.registers.read16(*pair),
            Operand::Imm8(imm, mode) if mode.contains(AddressingMode::INDIRECT) => {
                // ldh A, (imm8)
                mmu.read(Address::high_page(*imm).value()) as u16
            }
            Operand::Imm8(imm, _) => *imm as u16,
            Operand::Imm16(imm, mode) if mode.contains(AddressingMode::INDIRECT) => mmu.read(*imm) as u16,
            Operand::Imm16(imm, _) => *imm,
            _ => return Err(Handlers::invalid("read_operand", Some(operand.clone()))),
        };

        Ok(value)
    }

    fn write_operand(cpu: &mut Cpu, mmu: &mut Mmu, operand: &Operand, value: u16) -> Result<(), AyyError> {
        match operand {
            Operand::Reg8(reg, mode) if mode.contains(AddressingMode::INDIRECT) => {
                // ld (C), A
                mmu.write(Address::high_page(cpu.registers.read(*reg)).value(), value as u8);
            }
            Operand::Reg8(reg, _) => cpu.registers.write(*reg, value as u8),
            Operand::Reg16(pair, mode) if mode.contains(AddressingMode::INDIRECT) => {
                let addr = Handlers::indirect_address(cpu, *pair, *mode);
                mmu.write(addr, value as u8);
            }
            Operand::Reg16(pair, _) => cpu.registers.write16(*pair, value),
            Operand::Imm8(imm, mode) if mode.contains(AddressingMode::INDIRECT) => {
                // ldh (imm8), A
                mmu.write(Address::high_page(*imm).value(), value as u8);
            }
            Operand::Imm16(imm, mode) if mode.contains(AddressingMode::INDIRECT) => mmu.write(*imm, value as u8),
            _ => return Err(Handlers::invalid("write_operand", Some(operand.clone()))),
        }

        Ok(())
    }

    /// Address held in `pair`, applying the post-increment or
    /// post-decrement of `(HL+)` / `(HL-)`.
    fn indirect_address(cpu: &mut Cpu, pair: RegisterPair, mode: AddressingMode) -> u16 {
        let addr = Address::new(cpu.registers.read16(pair));
        if mode.contains(AddressingMode::INCREMENT) {
            cpu.registers.write16(pair, addr.wrapping_add(1).value());
        } else if mode.contains(AddressingMode::DECREMENT) {
            cpu.registers.write16(pair, addr.wrapping_sub(1).value());
        }
        addr.value()
    }

    fn check_condition(cpu: &Cpu, condition: &Condition) -> bool {
        match condition {
            Condition::Z => cpu.registers.flag(Flags::ZERO),
            Condition::NZ => !cpu.registers.flag(Flags::ZERO),
            Condition::C => cpu.registers.flag(Flags::CARRY),
            Condition::NC => !cpu.registers.flag(Flags::CARRY),
            Condition::None => true,
        }
    }

    fn unary_operand<'a>(handler: &'static str, instruction: &'a Instruction) -> Result<&'a Operand, AyyError> {
        instruction
            .lhs
            .as_ref()
            .ok_or_else(|| Handlers::invalid(handler, None))
    }

    fn binary_operands<'a>(handler: &'static str, instruction: &'a Instruction) -> Result<(&'a Operand, &'a Operand), AyyError> {
        match (&instruction.lhs, &instruction.rhs) {
            (Some(lhs), Some(rhs)) => Ok((lhs, rhs)),
            (lhs, _) => Err(Handlers::invalid(handler, lhs.clone())),
        }
    }

    fn bit_operands<'a>(handler: &'static str, instruction: &'a Instruction) -> Result<(u8, &'a Operand), AyyError> {
        match Handlers::binary_operands(handler, instruction)? {
            (Operand::Bit(bit), target) => Ok((*bit, target)),
            (lhs, _) => Err(Handlers::invalid(handler, Some(lhs.clone()))),
        }
    }

    fn invalid(handler: &'static str, operand: Option<Operand>) -> AyyError {
        AyyError::InvalidOperand { handler, operand }
    }
}
