use crate::memory::mapper::{ram_offset, rom_offset, Mapper};
use crate::memory::ROM_BANK_SIZE;
use log::trace;

/// Plain 32 KiB cartridge with optional unbanked RAM (types $00, $08, $09).
#[derive(Clone)]
pub struct Rom {
    rom: Vec<u8>,
    ram: Vec<u8>,
    rom_banks: usize,
}

impl Rom {
    pub fn new(rom: Vec<u8>, ram: Vec<u8>) -> Rom {
        let rom_banks = (rom.len() / ROM_BANK_SIZE).max(1);
        Rom { rom, ram, rom_banks }
    }
}

impl Mapper for Rom {
    #[inline]
    fn read_rom(&self, addr: u16) -> u8 {
        let bank = (addr as usize) / ROM_BANK_SIZE;
        self.rom
            .get(rom_offset(bank, self.rom_banks, addr))
            .copied()
            .unwrap_or(0xff)
    }

    #[inline]
    fn write_rom_control(&mut self, addr: u16, data: u8) {
        // No controller to talk to.
        trace!("ROM: Ignoring write of ${:02x} to ${:04x}", data, addr);
    }

    #[inline]
    fn read_ram(&self, addr: u16) -> u8 {
        match ram_offset(0, self.ram.len(), addr) {
            Some(offset) => self.ram[offset],
            None => 0xff,
        }
    }

    #[inline]
    fn write_ram(&mut self, addr: u16, data: u8) {
        if let Some(offset) = ram_offset(0, self.ram.len(), addr) {
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
        1
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
        String::from("ROM")
    }
}
