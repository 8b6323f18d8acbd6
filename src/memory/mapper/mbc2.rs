use crate::memory::cartridge::MBC2_RAM_SIZE;
use crate::memory::mapper::{rom_offset, Mapper};
use crate::memory::{EXTERNAL_RAM_START, ROM_BANK_SIZE};
use log::debug;

const CONTROL_RANGE: std::ops::RangeInclusive<u16> = 0x0000..=0x3fff;
const ROM_SLOT_0_RANGE: std::ops::RangeInclusive<u16> = 0x0000..=0x3fff;
/// Address bit 8 picks the register: clear for RAM enable, set for ROM bank.
const REGISTER_SELECT_BIT: u16 = 0x0100;

/// MBC2: 4-bit ROM bank register and 512 half-bytes of built-in RAM,
/// mirrored across $A000-$BFFF.
#[derive(Clone)]
pub struct Mbc2 {
    rom: Vec<u8>,
    rom_banks: usize,
    ram: Vec<u8>,
    rom_bank: u8,
    ram_enabled: bool,
}

impl Mbc2 {
    pub fn new(rom: Vec<u8>) -> Mbc2 {
        let rom_banks = (rom.len() / ROM_BANK_SIZE).max(1);

        Mbc2 {
            rom,
            rom_banks,
            ram: vec![0; MBC2_RAM_SIZE],
            rom_bank: 1,
            ram_enabled: false,
        }
    }

    #[inline]
    fn ram_index(addr: u16) -> usize {
        (addr.wrapping_sub(EXTERNAL_RAM_START) as usize) & (MBC2_RAM_SIZE - 1)
    }
}

impl Mapper for Mbc2 {
    #[inline]
    fn read_rom(&self, addr: u16) -> u8 {
        let bank = if ROM_SLOT_0_RANGE.contains(&addr) {
            0
        } else {
            self.rom_bank as usize
        };
        self.rom
            .get(rom_offset(bank, self.rom_banks, addr))
            .copied()
            .unwrap_or(0xff)
    }

    #[inline]
    fn write_rom_control(&mut self, addr: u16, data: u8) {
        if !CONTROL_RANGE.contains(&addr) {
            return;
        }

        if addr & REGISTER_SELECT_BIT == 0 {
            self.ram_enabled = (data & 0x0f) == 0x0a;
            debug!("MBC2: RAM enabled: {}", self.ram_enabled);
        } else {
            self.rom_bank = data & 0x0f;
            if self.rom_bank == 0 {
                self.rom_bank = 1;
            }
            debug!("MBC2: Switched to ROM bank {}", self.current_rom_bank());
        }
    }

    /// Only the low nibble is stored; the high nibble reads as ones.
    #[inline]
    fn read_ram(&self, addr: u16) -> u8 {
        if !self.ram_enabled {
            return 0xff;
        }
        self.ram[Mbc2::ram_index(addr)] | 0xf0
    }

    #[inline]
    fn write_ram(&mut self, addr: u16, data: u8) {
        if self.ram_enabled {
            self.ram[Mbc2::ram_index(addr)] = data & 0x0f;
        }
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }

    fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    #[inline]
    fn current_rom_bank(&self) -> u16 {
        (self.rom_bank as usize % self.rom_banks) as u16
    }

    #[inline]
    fn current_ram_bank(&self) -> u8 {
        0
    }

    fn rom_bank_count(&self) -> usize {
        self.rom_banks
    }

    #[inline]
    fn name(&self) -> String {
        String::from("MBC2")
    }
}
