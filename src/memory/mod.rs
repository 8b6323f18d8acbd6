pub mod cartridge;
pub mod mapper;
pub mod mmu;
pub mod registers;

pub const ROM_BANK_0_START: u16 = 0x0000;
pub const ROM_BANK_0_END: u16 = 0x3fff;
pub const ROM_BANK_N_START: u16 = 0x4000;
pub const ROM_BANK_N_END: u16 = 0x7fff;
pub const VRAM_START: u16 = 0x8000;
pub const VRAM_END: u16 = 0x9fff;
pub const EXTERNAL_RAM_START: u16 = 0xa000;
pub const EXTERNAL_RAM_END: u16 = 0xbfff;
pub const WRAM_BANK_0_START: u16 = 0xc000;
pub const WRAM_BANK_0_END: u16 = 0xcfff;
pub const WRAM_BANK_1_START: u16 = 0xd000;
pub const WRAM_BANK_1_END: u16 = 0xdfff;
pub const ECHO_RAM_START: u16 = 0xe000;
pub const ECHO_RAM_END: u16 = 0xfdff;
pub const OAM_START: u16 = 0xfe00;
pub const OAM_END: u16 = 0xfe9f;
pub const UNUSABLE_START: u16 = 0xfea0;
pub const UNUSABLE_END: u16 = 0xfeff;
pub const IO_START: u16 = 0xff00;
pub const IO_END: u16 = 0xff7f;
pub const HRAM_START: u16 = 0xff80;
pub const HRAM_END: u16 = 0xfffe;
pub const INTERRUPT_ENABLE_REGISTER: u16 = 0xffff;

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;
pub const VRAM_SIZE: usize = 0x2000;
pub const WRAM_SIZE: usize = 0x2000;
pub const OAM_SIZE: usize = 0xa0;
pub const IO_SIZE: usize = 0x80;
pub const HRAM_SIZE: usize = 0x7f;

/// Value read back from $FEA0-$FEFF.
pub const UNUSABLE_SENTINEL: u8 = 0xff;

pub const JOYPAD_REGISTER: u16 = 0xff00;
pub const SERIAL_DATA_REGISTER: u16 = 0xff01;
pub const SERIAL_CONTROL_REGISTER: u16 = 0xff02;
pub const DIV_REGISTER: u16 = 0xff04;
pub const TIMA_REGISTER: u16 = 0xff05;
pub const TMA_REGISTER: u16 = 0xff06;
pub const TAC_REGISTER: u16 = 0xff07;
pub const INTERRUPT_FLAGS_REGISTER: u16 = 0xff0f;
pub const AUDIO_MASTER_CONTROL_REGISTER: u16 = 0xff26;
pub const LCD_CONTROL_REGISTER: u16 = 0xff40;
pub const LCD_STATUS_REGISTER: u16 = 0xff41;
pub const SCANLINE_Y_REGISTER: u16 = 0xff44;
pub const OAM_DMA_REGISTER: u16 = 0xff46;
pub const BG_PALETTE_REGISTER: u16 = 0xff47;
pub const BOOTROM_MAPPER_REGISTER: u16 = 0xff50;

/// A location on the 16-bit bus.
///
/// Effective-address arithmetic (stack, relative jumps, the $FF00 page) goes
/// through the named operations below so that every wrap is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u16);

impl Address {
    #[inline]
    pub const fn new(value: u16) -> Address {
        Address(value)
    }

    /// `$FF00 + offset`, as used by `LDH` and `LD (C),A`.
    #[inline]
    pub const fn high_page(offset: u8) -> Address {
        Address(0xff00 | offset as u16)
    }

    #[inline]
    pub const fn value(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn wrapping_add(self, rhs: u16) -> Address {
        Address(self.0.wrapping_add(rhs))
    }

    #[inline]
    pub const fn wrapping_sub(self, rhs: u16) -> Address {
        Address(self.0.wrapping_sub(rhs))
    }

    #[inline]
    pub const fn offset(self, displacement: i8) -> Address {
        Address(self.0.wrapping_add_signed(displacement as i16))
    }
}

impl From<u16> for Address {
    fn from(value: u16) -> Address {
        Address(value)
    }
}

impl From<Address> for u16 {
    fn from(address: Address) -> u16 {
        address.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "${:04x}", self.0)
    }
}
