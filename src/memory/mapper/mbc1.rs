use crate::memory::mapper::{ram_offset, rom_offset, Mapper};
use crate::memory::ROM_BANK_SIZE;
use log::debug;

const RAM_ENABLE_RANGE: std::ops::RangeInclusive<u16> = 0x0000..=0x1fff;
const ROM_BANK_RANGE: std::ops::RangeInclusive<u16> = 0x2000..=0x3fff;
const SECONDARY_BANK_REGISTER: std::ops::RangeInclusive<u16> = 0x4000..=0x5fff;
const BANKING_MODE_REGISTER: std::ops::RangeInclusive<u16> = 0x6000..=0x7fff;
const ROM_SLOT_0_RANGE: std::ops::RangeInclusive<u16> = 0x0000..=0x3fff;

#[derive(Clone)]
pub struct Mbc1 {
    rom: Vec<u8>,
    rom_banks: usize,
    ram: Vec<u8>,
    /// Low five bits of the ROM bank, never zero.
    rom_bank: u8,
    /// Two-bit register: RAM bank, or ROM bank bits 5-6.
    secondary_bank: u8,
    ram_enabled: bool,
    /// `true` selects "advanced" banking: the secondary register also
    /// applies to $0000-$3FFF and to external RAM.
    banking_mode: bool,
}

impl Mbc1 {
    pub fn new(rom: Vec<u8>, ram: Vec<u8>) -> Mbc1 {
        let rom_banks = (rom.len() / ROM_BANK_SIZE).max(1);

        Mbc1 {
            rom,
            rom_banks,
            ram,
            rom_bank: 1,
            secondary_bank: 0,
            ram_enabled: false,
            banking_mode: false,
        }
    }

    fn fixed_bank(&self) -> usize {
        if self.banking_mode {
            (self.secondary_bank as usize) << 5
        } else {
            0
        }
    }

    fn switchable_bank(&self) -> usize {
        ((self.secondary_bank as usize) << 5) | self.rom_bank as usize
    }

    fn ram_bank(&self) -> usize {
        if self.banking_mode {
            self.secondary_bank as usize
        } else {
            0
        }
    }
}

impl Mapper for Mbc1 {
    #[inline]
    fn read_rom(&self, addr: u16) -> u8 {
        let bank = if ROM_SLOT_0_RANGE.contains(&addr) {
            self.fixed_bank()
        } else {
            self.switchable_bank()
        };
        self.rom
            .get(rom_offset(bank, self.rom_banks, addr))
            .copied()
            .unwrap_or(0xff)
    }

    #[inline]
    fn write_rom_control(&mut self, addr: u16, data: u8) {
        match addr {
            addr if RAM_ENABLE_RANGE.contains(&addr) => {
                self.ram_enabled = (data & 0x0f) == 0x0a;
                debug!("MBC1: RAM enabled: {}", self.ram_enabled);
            }
            addr if ROM_BANK_RANGE.contains(&addr) => {
                // Higher bits are discarded, and a zero in the remaining five
                // reads as one: $00, $20, $40 and $60 all end up one bank up.
                self.rom_bank = data & 0b0001_1111;
                if self.rom_bank == 0 {
                    self.rom_bank = 1;
                }
                debug!("MBC1: Switched to ROM bank {}", self.current_rom_bank());
            }
            addr if SECONDARY_BANK_REGISTER.contains(&addr) => {
                self.secondary_bank = data & 0b11;
                debug!(
                    "MBC1: Secondary bank register set to {} (ROM bank {}, RAM bank {})",
                    self.secondary_bank,
                    self.current_rom_bank(),
                    self.current_ram_bank()
                );
            }
            addr if BANKING_MODE_REGISTER.contains(&addr) => {
                self.banking_mode = data & 0b0000_0001 == 1;
                debug!("MBC1: Switched to banking mode: {}", self.banking_mode);
            }
            _ => {}
        }
    }

    #[inline]
    fn read_ram(&self, addr: u16) -> u8 {
        if !self.ram_enabled {
            return 0xff;
        }
        match ram_offset(self.ram_bank(), self.ram.len(), addr) {
            Some(offset) => self.ram[offset],
            None => 0xff,
        }
    }

    #[inline]
    fn write_ram(&mut self, addr: u16, data: u8) {
        if !self.ram_enabled {
            return;
        }
        if let Some(offset) = ram_offset(self.ram_bank(), self.ram.len(), addr) {
            self.ram[offset] = data;
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
        (self.switchable_bank() % self.rom_banks) as u16
    }

    #[inline]
    fn current_ram_bank(&self) -> u8 {
        self.ram_bank() as u8
    }

    fn rom_bank_count(&self) -> usize {
        self.rom_banks
    }

    /// Banks $20, $40 and $60 can never be selected for $4000-$7FFF.
    fn switchable_rom_banks(&self) -> usize {
        let unreachable = [0x20, 0x40, 0x60]
            .iter()
            .filter(|bank| **bank < self.rom_banks)
            .count();
        self.rom_banks - 1 - unreachable
    }

    #[inline]
    fn name(&self) -> String {
        String::from("MBC1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::cartridge::tests::build_rom;
    use crate::memory::RAM_BANK_SIZE;

    fn mbc1(rom_size_code: u8, ram_size: usize) -> Mbc1 {
        Mbc1::new(build_rom(0x03, rom_size_code, 0x00), vec![0; ram_size])
    }

    #[test]
    fn bank_zero_selects_bank_one() {
        let mut mbc = mbc1(0x02, 0);
        mbc.write_rom_control(0x2000, 0x01);
        let bank_one: Vec<u8> = (0x4000..=0x7fffu16).map(|addr| mbc.read_rom(addr)).collect();

        mbc.write_rom_control(0x2000, 0x00);
        let bank_zero: Vec<u8> = (0x4000..=0x7fffu16).map(|addr| mbc.read_rom(addr)).collect();

        assert_eq!(bank_zero, bank_one);
        assert_eq!(mbc.read_rom(0x4000), 0x01);
    }

    #[test]
    fn switches_rom_banks() {
        let mut mbc = mbc1(0x02, 0);
        mbc.write_rom_control(0x2100, 0x05);
        assert_eq!(mbc.read_rom(0x4000), 0x05);
        assert_eq!(mbc.read_rom(0x0000), 0x00);
        assert_eq!(mbc.current_rom_bank(), 5);
    }

    #[test]
    fn oversized_bank_wraps() {
        // 8 banks: selecting 13 lands on 5
        let mut mbc = mbc1(0x02, 0);
        mbc.write_rom_control(0x2000, 0x0d);
        assert_eq!(mbc.read_rom(0x4000), 0x05);
        mbc.write_rom_control(0x2000, 0xe1);
        assert_eq!(mbc.read_rom(0x4000), 0x01);
    }

    #[test]
    fn secondary_register_selects_high_rom_bits() {
        // 64 banks (1 MiB)
        let mut mbc = mbc1(0x05, 0);
        mbc.write_rom_control(0x2000, 0x02);
        mbc.write_rom_control(0x4000, 0x01);
        assert_eq!(mbc.read_rom(0x4000), 0x22);

        // $20 is unreachable in the switchable window
        mbc.write_rom_control(0x2000, 0x00);
        assert_eq!(mbc.read_rom(0x4000), 0x21);

        // Mode 1 also pages the fixed window
        assert_eq!(mbc.read_rom(0x0000), 0x00);
        mbc.write_rom_control(0x6000, 0x01);
        assert_eq!(mbc.read_rom(0x0000), 0x20);
    }

    #[test]
    fn ram_requires_enable() {
        let mut mbc = mbc1(0x01, RAM_BANK_SIZE);
        mbc.write_ram(0xa000, 0x42);
        assert_eq!(mbc.read_ram(0xa000), 0xff);

        mbc.write_rom_control(0x0000, 0x0a);
        mbc.write_ram(0xa000, 0x42);
        assert_eq!(mbc.read_ram(0xa000), 0x42);

        mbc.write_rom_control(0x0000, 0x00);
        assert_eq!(mbc.read_ram(0xa000), 0xff);
        assert_eq!(mbc.ram()[0], 0x42);
    }

    #[test]
    fn ram_banking_only_in_mode_one() {
        let mut mbc = mbc1(0x01, 4 * RAM_BANK_SIZE);
        mbc.write_rom_control(0x0000, 0x0a);
        mbc.write_rom_control(0x4000, 0x02);
        mbc.write_ram(0xa000, 0x11);
        assert_eq!(mbc.ram()[0], 0x11);

        mbc.write_rom_control(0x6000, 0x01);
        mbc.write_ram(0xa000, 0x22);
        assert_eq!(mbc.ram()[2 * RAM_BANK_SIZE], 0x22);
        assert_eq!(mbc.current_ram_bank(), 2);
    }

    #[test]
    fn switchable_bank_count_skips_unreachable_banks() {
        assert_eq!(mbc1(0x02, 0).switchable_rom_banks(), 7);
        assert_eq!(mbc1(0x05, 0).switchable_rom_banks(), 62);
        assert_eq!(mbc1(0x06, 0).switchable_rom_banks(), 124);
    }
}
