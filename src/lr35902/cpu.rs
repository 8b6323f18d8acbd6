use crate::error::AyyError;
use crate::lr35902::handlers::Handlers;
use crate::lr35902::registers::{Flags, Registers};
use crate::lr35902::sm83::{Opcode, Sm83};
use crate::lr35902::{HALT_IDLE_CYCLES, INTERRUPT_DISPATCH_CYCLES};
use crate::memory::mmu::Mmu;
use crate::memory::Address;
use log::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Running,
    Halted,
}

#[derive(Clone)]
pub struct Cpu {
    pub(crate) sm83: Sm83,
    pub(crate) registers: Registers,
    pub(crate) state: State,
    pub(crate) cycles: usize,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            sm83: Sm83::new(),
            registers: Registers::default(),
            state: State::Running,
            cycles: 0,
        }
    }

    /// CPU as the boot ROM leaves it, ready to run the cartridge at $0100.
    pub fn post_boot() -> Cpu {
        Cpu {
            registers: Registers::post_boot(),
            ..Cpu::new()
        }
    }

    /// Services one interrupt or runs one instruction and returns the
    /// cycles it took.
    pub fn step(&mut self, mmu: &mut Mmu) -> Result<usize, AyyError> {
        let cycles = self.execute(mmu)?;
        self.cycles += cycles;
        Ok(cycles)
    }

    fn execute(&mut self, mmu: &mut Mmu) -> Result<usize, AyyError> {
        if self.maybe_dispatch(mmu) {
            return Ok(INTERRUPT_DISPATCH_CYCLES);
        }

        if self.state == State::Halted {
            return Ok(HALT_IDLE_CYCLES);
        }

        // EI lands here, after the dispatch check of the step following it
        let ime = &mut mmu.interrupts_mut().ime;
        if ime.enable_pending {
            ime.enable_pending = false;
            ime.enabled = true;
        }

        let pc = self.registers.pc;
        let instruction = self.sm83.decode(mmu, pc)?;
        trace!("[${:04x}] {}", pc, instruction);

        self.registers.pc = Address::new(pc).wrapping_add(instruction.length as u16).value();

        match instruction.opcode {
            Opcode::Nop => Handlers::nop(self, mmu, &instruction),
            Opcode::Stop => Handlers::stop(self, mmu, &instruction),
            Opcode::Illegal => Handlers::illegal(self, mmu, &instruction),
            Opcode::Halt => Handlers::halt(self, mmu, &instruction),
            Opcode::Di => Handlers::disable_interrupts(self, mmu, &instruction),
            Opcode::Ei => Handlers::enable_interrupts(self, mmu, &instruction),
            Opcode::Ld | Opcode::Ldh => Handlers::load(self, mmu, &instruction),
            Opcode::Add => Handlers::add(self, mmu, &instruction),
            Opcode::Adc | Opcode::Sub | Opcode::Sbc | Opcode::And | Opcode::Xor | Opcode::Or | Opcode::Cp => {
                Handlers::arithmetic(self, mmu, &instruction)
            }
            Opcode::Inc => Handlers::increment(self, mmu, &instruction),
            Opcode::Dec => Handlers::decrement(self, mmu, &instruction),
            Opcode::Daa => Handlers::decimal_adjust(self, mmu, &instruction),
            Opcode::Cpl => Handlers::complement(self, mmu, &instruction),
            Opcode::Scf => Handlers::set_carry(self, mmu, &instruction),
            Opcode::Ccf => Handlers::complement_carry(self, mmu, &instruction),
            Opcode::Rlca | Opcode::Rrca | Opcode::Rla | Opcode::Rra => Handlers::rotate_accumulator(self, mmu, &instruction),
            Opcode::Rlc | Opcode::Rrc | Opcode::Rl | Opcode::Rr | Opcode::Sla | Opcode::Sra | Opcode::Swap | Opcode::Srl => {
                Handlers::shift(self, mmu, &instruction)
            }
            Opcode::Bit => Handlers::test_bit(self, mmu, &instruction),
            Opcode::Res | Opcode::Set => Handlers::modify_bit(self, mmu, &instruction),
            Opcode::Jp | Opcode::Jr | Opcode::Call => Handlers::jump(self, mmu, &instruction),
            Opcode::Ret => Handlers::ret(self, mmu, &instruction),
            Opcode::Reti => Handlers::reti(self, mmu, &instruction),
            Opcode::Rst => Handlers::restart(self, mmu, &instruction),
            Opcode::Push => Handlers::push(self, mmu, &instruction),
            Opcode::Pop => Handlers::pop(self, mmu, &instruction),
        }
    }

    /// Pushes `value` high byte first; SP ends two below where it started.
    pub fn push_stack(&mut self, mmu: &mut Mmu, value: u16) {
        let [high, low] = value.to_be_bytes();
        let sp = Address::new(self.registers.sp).wrapping_sub(1);
        mmu.write(sp.value(), high);
        let sp = sp.wrapping_sub(1);
        mmu.write(sp.value(), low);
        self.registers.sp = sp.value();
    }

    pub fn pop_stack(&mut self, mmu: &mut Mmu) -> u16 {
        let sp = Address::new(self.registers.sp);
        let low = mmu.read(sp.value());
        let high = mmu.read(sp.wrapping_add(1).value());
        self.registers.sp = sp.wrapping_add(2).value();
        u16::from_be_bytes([high, low])
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Cycles consumed since construction.
    pub fn cycles(&self) -> usize {
        self.cycles
    }
}

impl Default for Cpu {
    fn default() -> Cpu {
        Cpu::new()
    }
}

impl std::fmt::Display for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let flag = |bit: Flags, name: char| if self.registers.flag(bit) { name } else { '-' };
        write!(
            f,
            "A: ${:02x}  F: {}{}{}{}  B: ${:02x}  C: ${:02x}  D: ${:02x}  E: ${:02x}  H: ${:02x}  L: ${:02x}  SP: ${:04x}  PC: ${:04x}  ({:?}, {} cycles)",
            self.registers.a,
            flag(Flags::ZERO, 'Z'),
            flag(Flags::SUBTRACT, 'N'),
            flag(Flags::HALF_CARRY, 'H'),
            flag(Flags::CARRY, 'C'),
            self.registers.b,
            self.registers.c,
            self.registers.d,
            self.registers.e,
            self.registers.h,
            self.registers.l,
            self.registers.sp,
            self.registers.pc,
            self.state,
            self.cycles
        )
    }
}
