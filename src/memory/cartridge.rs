use crate::error::{AyyError, MissingHeaderSnafu, TruncatedRomSnafu, UnknownCartridgeTypeSnafu, UnknownRamSizeSnafu, UnknownRomSizeSnafu};
use crate::memory::{RAM_BANK_SIZE, ROM_BANK_SIZE};
use log::{info, warn};
use snafu::ensure;
use std::ops::Range;

pub const TITLE_RANGE: Range<usize> = 0x0134..0x0144;
pub const CARTRIDGE_TYPE_ADDRESS: usize = 0x0147;
pub const ROM_SIZE_ADDRESS: usize = 0x0148;
pub const RAM_SIZE_ADDRESS: usize = 0x0149;
pub const HEADER_CHECKSUM_ADDRESS: usize = 0x014d;
pub const HEADER_END: usize = 0x0150;

/// Built-in RAM of the MBC2: 512 half-bytes.
pub const MBC2_RAM_SIZE: usize = 0x200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperKind {
    None,
    Mbc1,
    Mbc2,
    Mbc3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub title: String,
    pub cartridge_type: u8,
    pub mapper: MapperKind,
    pub has_battery: bool,
    pub has_rtc: bool,
    pub rom_banks: usize,
    pub ram_size: usize,
    pub header_checksum: u8,
}

impl CartridgeHeader {
    pub fn parse(rom: &[u8]) -> Result<CartridgeHeader, AyyError> {
        ensure!(rom.len() >= HEADER_END, MissingHeaderSnafu { length: rom.len() });

        let cartridge_type = rom[CARTRIDGE_TYPE_ADDRESS];
        let (mapper, has_battery, has_rtc) = match cartridge_type {
            0x00 => (MapperKind::None, false, false),
            0x08 => (MapperKind::None, false, false),
            0x09 => (MapperKind::None, true, false),
            0x01 | 0x02 => (MapperKind::Mbc1, false, false),
            0x03 => (MapperKind::Mbc1, true, false),
            0x05 => (MapperKind::Mbc2, false, false),
            0x06 => (MapperKind::Mbc2, true, false),
            0x0f | 0x10 => (MapperKind::Mbc3, true, true),
            0x11 | 0x12 => (MapperKind::Mbc3, false, false),
            0x13 => (MapperKind::Mbc3, true, false),
            code => return UnknownCartridgeTypeSnafu { code }.fail(),
        };

        let rom_banks = match rom[ROM_SIZE_ADDRESS] {
            code @ 0x00..=0x08 => 2usize << code,
            0x52 => 72,
            0x53 => 80,
            0x54 => 96,
            code => return UnknownRomSizeSnafu { code }.fail(),
        };

        let ram_size = match rom[RAM_SIZE_ADDRESS] {
            0x00 => 0,
            0x01 => 0x800,
            0x02 => RAM_BANK_SIZE,
            0x03 => 4 * RAM_BANK_SIZE,
            0x04 => 16 * RAM_BANK_SIZE,
            0x05 => 8 * RAM_BANK_SIZE,
            code => return UnknownRamSizeSnafu { code }.fail(),
        };

        let title = String::from_utf8_lossy(&rom[TITLE_RANGE])
            .trim_end_matches('\0')
            .to_string();

        Ok(CartridgeHeader {
            title,
            cartridge_type,
            mapper,
            has_battery,
            has_rtc,
            rom_banks,
            ram_size,
            header_checksum: rom[HEADER_CHECKSUM_ADDRESS],
        })
    }

    pub fn rom_size(&self) -> usize {
        self.rom_banks * ROM_BANK_SIZE
    }

    /// Size of the save RAM the mapper actually carries. MBC2 ignores the
    /// header field and always has its built-in nibble RAM.
    pub fn effective_ram_size(&self) -> usize {
        match self.mapper {
            MapperKind::Mbc2 => MBC2_RAM_SIZE,
            _ => self.ram_size,
        }
    }

    /// Fails when the image is shorter than the declared ROM size. Extra
    /// trailing bytes are tolerated and never banked in.
    pub fn validate(&self, rom: &[u8]) -> Result<(), AyyError> {
        let declared = self.rom_size();
        ensure!(
            rom.len() >= declared,
            TruncatedRomSnafu {
                declared,
                actual: rom.len()
            }
        );

        if rom.len() > declared {
            warn!(
                "ROM image is {} bytes but the header declares {}, ignoring the excess",
                rom.len(),
                declared
            );
        }

        let computed = Self::compute_checksum(rom);
        if computed != self.header_checksum {
            warn!(
                "Header checksum mismatch: expected ${:02x}, computed ${:02x}",
                self.header_checksum, computed
            );
        }

        info!(
            "Cartridge \"{}\": type ${:02x} ({:?}), {} ROM banks, {} bytes RAM{}{}",
            self.title,
            self.cartridge_type,
            self.mapper,
            self.rom_banks,
            self.effective_ram_size(),
            if self.has_battery { ", battery" } else { "" },
            if self.has_rtc { ", RTC" } else { "" }
        );

        Ok(())
    }

    pub fn compute_checksum(rom: &[u8]) -> u8 {
        rom[TITLE_RANGE.start..HEADER_CHECKSUM_ADDRESS]
            .iter()
            .fold(0u8, |checksum, byte| checksum.wrapping_sub(*byte).wrapping_sub(1))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a ROM image of the size declared by `rom_size_code`. Every
    /// bank is filled with its own index so bank switching is observable.
    pub fn build_rom(cartridge_type: u8, rom_size_code: u8, ram_size_code: u8) -> Vec<u8> {
        let banks = 2usize << rom_size_code;
        let mut rom = Vec::with_capacity(banks * ROM_BANK_SIZE);
        for bank in 0..banks {
            rom.extend(std::iter::repeat(bank as u8).take(ROM_BANK_SIZE));
        }

        for (i, byte) in b"AYYCORE TEST".iter().enumerate() {
            rom[TITLE_RANGE.start + i] = *byte;
        }
        for address in TITLE_RANGE.start + 12..TITLE_RANGE.end {
            rom[address] = 0;
        }
        rom[CARTRIDGE_TYPE_ADDRESS] = cartridge_type;
        rom[ROM_SIZE_ADDRESS] = rom_size_code;
        rom[RAM_SIZE_ADDRESS] = ram_size_code;
        rom[HEADER_CHECKSUM_ADDRESS] = CartridgeHeader::compute_checksum(&rom);
        rom
    }

    #[test]
    fn parses_header_fields() {
        let rom = build_rom(0x03, 0x02, 0x03);
        let header = CartridgeHeader::parse(&rom).unwrap();

        assert_eq!(header.title, "AYYCORE TEST");
        assert_eq!(header.mapper, MapperKind::Mbc1);
        assert!(header.has_battery);
        assert_eq!(header.rom_banks, 8);
        assert_eq!(header.ram_size, 0x8000);
        assert!(header.validate(&rom).is_ok());
    }

    #[test]
    fn maps_type_codes_to_mappers() {
        for (code, mapper) in [
            (0x00, MapperKind::None),
            (0x08, MapperKind::None),
            (0x09, MapperKind::None),
            (0x01, MapperKind::Mbc1),
            (0x02, MapperKind::Mbc1),
            (0x05, MapperKind::Mbc2),
            (0x06, MapperKind::Mbc2),
            (0x0f, MapperKind::Mbc3),
            (0x13, MapperKind::Mbc3),
        ] {
            let rom = build_rom(code, 0x00, 0x00);
            assert_eq!(CartridgeHeader::parse(&rom).unwrap().mapper, mapper, "type ${:02x}", code);
        }
    }

    #[test]
    fn rejects_unknown_type() {
        let rom = build_rom(0x19, 0x00, 0x00);
        assert!(matches!(
            CartridgeHeader::parse(&rom),
            Err(AyyError::UnknownCartridgeType { code: 0x19 })
        ));
    }

    #[test]
    fn rejects_unknown_size_codes() {
        let mut rom = build_rom(0x00, 0x00, 0x00);
        rom[ROM_SIZE_ADDRESS] = 0x09;
        assert!(matches!(
            CartridgeHeader::parse(&rom),
            Err(AyyError::UnknownRomSize { code: 0x09 })
        ));

        rom[ROM_SIZE_ADDRESS] = 0x00;
        rom[RAM_SIZE_ADDRESS] = 0x06;
        assert!(matches!(
            CartridgeHeader::parse(&rom),
            Err(AyyError::UnknownRamSize { code: 0x06 })
        ));
    }

    #[test]
    fn rejects_short_images() {
        assert!(matches!(
            CartridgeHeader::parse(&[0u8; 0x100]),
            Err(AyyError::MissingHeader { length: 0x100 })
        ));

        let mut rom = build_rom(0x01, 0x01, 0x00);
        rom.truncate(0x8000);
        let header = CartridgeHeader::parse(&rom).unwrap();
        assert!(matches!(
            header.validate(&rom),
            Err(AyyError::TruncatedRom {
                declared: 0x10000,
                actual: 0x8000
            })
        ));
    }

    #[test]
    fn mbc2_ram_size_ignores_header() {
        let rom = build_rom(0x06, 0x01, 0x00);
        let header = CartridgeHeader::parse(&rom).unwrap();
        assert_eq!(header.effective_ram_size(), MBC2_RAM_SIZE);
    }
}
