use crate::lr35902::cpu::{Cpu, State};
use crate::lr35902::registers::RegisterPair;
use crate::memory::mmu::Mmu;
use crate::memory::registers::InterruptFlags;
use log::debug;

/// Master enable. `EI` only raises `enable_pending`; it is promoted to
/// `enabled` at the start of the following step, after that step's
/// dispatch check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ime {
    pub enabled: bool,
    pub enable_pending: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vector {
    VBlank,
    Stat,
    Timer,
    Serial,
    Joypad,
}

impl Vector {
    const PRIORITY: [Vector; 5] = [Vector::VBlank, Vector::Stat, Vector::Timer, Vector::Serial, Vector::Joypad];

    /// Highest-priority source set in `flags`, if any.
    pub fn from_flags(flags: InterruptFlags) -> Option<Vector> {
        Vector::PRIORITY.into_iter().find(|vector| flags.contains(vector.to_flag()))
    }

    pub fn to_flag(self) -> InterruptFlags {
        match self {
            Vector::VBlank => InterruptFlags::VBLANK,
            Vector::Stat => InterruptFlags::LCD_STAT,
            Vector::Timer => InterruptFlags::TIMER,
            Vector::Serial => InterruptFlags::SERIAL,
            Vector::Joypad => InterruptFlags::JOYPAD,
        }
    }

    pub fn to_address(self) -> u16 {
        match self {
            Vector::VBlank => 0x0040,
            Vector::Stat => 0x0048,
            Vector::Timer => 0x0050,
            Vector::Serial => 0x0058,
            Vector::Joypad => 0x0060,
        }
    }
}

impl std::fmt::Display for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Vector::VBlank => write!(f, "VBLANK"),
            Vector::Stat => write!(f, "STAT"),
            Vector::Timer => write!(f, "TIMER"),
            Vector::Serial => write!(f, "SERIAL"),
            Vector::Joypad => write!(f, "JOYPAD"),
        }
    }
}

/// IE, IF and IME. IE keeps all eight bits as written; IF only has five and
/// the upper three read back as ones.
#[derive(Clone, Debug)]
pub struct Interrupts {
    enable: u8,
    flags: InterruptFlags,
    pub ime: Ime,
}

impl Interrupts {
    pub fn new() -> Interrupts {
        Interrupts {
            enable: 0,
            flags: InterruptFlags::empty(),
            ime: Ime::default(),
        }
    }

    #[inline]
    pub fn read_enable(&self) -> u8 {
        self.enable
    }

    #[inline]
    pub fn write_enable(&mut self, data: u8) {
        self.enable = data;
    }

    #[inline]
    pub fn read_flags(&self) -> u8 {
        self.flags.bits() | 0xe0
    }

    #[inline]
    pub fn write_flags(&mut self, data: u8) {
        self.flags = InterruptFlags::from(data);
    }

    pub fn request(&mut self, source: InterruptFlags) {
        self.flags.insert(source);
    }

    pub fn acknowledge(&mut self, vector: Vector) {
        self.flags.remove(vector.to_flag());
    }

    /// Sources that are both requested and enabled, regardless of IME.
    #[inline]
    pub fn pending(&self) -> InterruptFlags {
        self.flags & InterruptFlags::from(self.enable)
    }
}

impl Cpu {
    /// Services the highest-priority pending interrupt if IME allows it.
    /// A pending interrupt always ends HALT, even with IME clear.
    /// Returns whether a dispatch happened.
    pub fn maybe_dispatch(&mut self, mmu: &mut Mmu) -> bool {
        let pending = mmu.interrupts().pending();
        if pending.is_empty() {
            return false;
        }

        if self.state == State::Halted {
            debug!("Leaving HALT, pending interrupts: {:?}", pending);
            self.state = State::Running;
        }

        if !mmu.interrupts().ime.enabled {
            return false;
        }

        let vector = match Vector::from_flags(pending) {
            Some(vector) => vector,
            None => return false,
        };

        let interrupts = mmu.interrupts_mut();
        interrupts.acknowledge(vector);
        interrupts.ime.enabled = false;
        interrupts.ime.enable_pending = false;

        let pc = self.registers.read16(RegisterPair::PC);
        self.push_stack(mmu, pc);
        self.registers.write16(RegisterPair::PC, vector.to_address());

        debug!("Dispatching {} interrupt from ${:04x} to ${:04x}", vector, pc, vector.to_address());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_follows_bit_order() {
        let flags = InterruptFlags::TIMER | InterruptFlags::VBLANK | InterruptFlags::JOYPAD;
        assert_eq!(Vector::from_flags(flags), Some(Vector::VBlank));
        assert_eq!(Vector::from_flags(InterruptFlags::JOYPAD | InterruptFlags::SERIAL), Some(Vector::Serial));
        assert_eq!(Vector::from_flags(InterruptFlags::empty()), None);
    }

    #[test]
    fn flag_register_masks() {
        let mut interrupts = Interrupts::new();
        interrupts.write_flags(0xff);
        assert_eq!(interrupts.read_flags(), 0xff);
        interrupts.write_flags(0x04);
        assert_eq!(interrupts.read_flags(), 0xe4);

        interrupts.write_enable(0xe1);
        assert_eq!(interrupts.read_enable(), 0xe1);
        assert_eq!(interrupts.pending(), InterruptFlags::empty());

        interrupts.request(InterruptFlags::VBLANK);
        assert_eq!(interrupts.pending(), InterruptFlags::VBLANK);
        interrupts.acknowledge(Vector::VBlank);
        assert_eq!(interrupts.read_flags(), 0xe4);
    }
}
