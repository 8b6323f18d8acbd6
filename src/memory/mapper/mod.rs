use crate::error::AyyError;
use crate::memory::cartridge::{CartridgeHeader, MapperKind};
use crate::memory::{EXTERNAL_RAM_START, RAM_BANK_SIZE, ROM_BANK_SIZE};
use dyn_clone::DynClone;
use log::warn;

pub mod mbc1;
pub mod mbc2;
pub mod mbc3;
pub mod rom;

/// Cartridge-side address translation. The bus hands every access in
/// $0000-$7FFF and $A000-$BFFF to the active mapper; writes into the ROM
/// window are control-register writes, never data.
pub trait Mapper: DynClone {
    fn read_rom(&self, addr: u16) -> u8;
    fn write_rom_control(&mut self, addr: u16, data: u8);
    fn read_ram(&self, addr: u16) -> u8;
    fn write_ram(&mut self, addr: u16, data: u8);

    /// Save RAM as raw bytes, for the persistence layer.
    fn ram(&self) -> &[u8];
    fn ram_mut(&mut self) -> &mut [u8];

    fn current_rom_bank(&self) -> u16;
    fn current_ram_bank(&self) -> u8;
    fn rom_bank_count(&self) -> usize;
    fn name(&self) -> String;

    /// Number of banks that can be paged into $4000-$7FFF.
    fn switchable_rom_banks(&self) -> usize {
        self.rom_bank_count().saturating_sub(1)
    }

    fn load_ram(&mut self, data: &[u8]) {
        let ram = self.ram_mut();
        if data.len() != ram.len() {
            warn!("Save RAM is {} bytes, cartridge expects {}", data.len(), ram.len());
        }
        let length = data.len().min(ram.len());
        ram[..length].copy_from_slice(&data[..length]);
    }
}

dyn_clone::clone_trait_object!(Mapper);

/// Parses the header, validates the image against it and builds the mapper
/// it names.
pub fn from_rom(rom: Vec<u8>) -> Result<(CartridgeHeader, Box<dyn Mapper>), AyyError> {
    let header = CartridgeHeader::parse(&rom)?;
    header.validate(&rom)?;

    let mut rom = rom;
    rom.truncate(header.rom_size());

    let ram = vec![0; header.effective_ram_size()];
    let mapper: Box<dyn Mapper> = match header.mapper {
        MapperKind::None => Box::new(rom::Rom::new(rom, ram)),
        MapperKind::Mbc1 => Box::new(mbc1::Mbc1::new(rom, ram)),
        MapperKind::Mbc2 => Box::new(mbc2::Mbc2::new(rom)),
        MapperKind::Mbc3 => Box::new(mbc3::Mbc3::new(rom, ram)),
    };

    Ok((header, mapper))
}

/// Offset into the ROM image of `addr` within `bank`. The bank is reduced
/// modulo the bank count so oversized selections wrap.
#[inline]
pub(crate) fn rom_offset(bank: usize, bank_count: usize, addr: u16) -> usize {
    (bank % bank_count.max(1)) * ROM_BANK_SIZE + (addr as usize & (ROM_BANK_SIZE - 1))
}

/// Offset into save RAM of `addr` within `bank`, or `None` when the
/// cartridge has no RAM. Images smaller than one bank (2 KiB) are mirrored.
#[inline]
pub(crate) fn ram_offset(bank: usize, ram_len: usize, addr: u16) -> Option<usize> {
    if ram_len == 0 {
        return None;
    }
    let bank_count = (ram_len / RAM_BANK_SIZE).max(1);
    let offset = (bank % bank_count) * RAM_BANK_SIZE + (addr.wrapping_sub(EXTERNAL_RAM_START) as usize & (RAM_BANK_SIZE - 1));
    Some(offset % ram_len)
}
