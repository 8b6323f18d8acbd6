use crate::memory::mapper::{ram_offset, rom_offset, Mapper};
use crate::memory::ROM_BANK_SIZE;
use log::{debug, trace};

const RTC_REGISTER_COUNT: usize = 5;

/// What $A000-$BFFF currently shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RamSelect {
    Bank(u8),
    /// $08-$0C: seconds, minutes, hours, day low, day high/control.
    Rtc(u8),
    Unmapped(u8),
}

#[derive(Clone)]
pub struct Mbc3 {
    rom: Vec<u8>,
    rom_banks: usize,
    ram: Vec<u8>,
    rom_bank: u8,
    ram_select: RamSelect,
    ram_enabled: bool,
    /// The clock never ticks; the registers hold whatever was written.
    rtc: [u8; RTC_REGISTER_COUNT],
    latch: u8,
}

impl Mbc3 {
    pub fn new(rom: Vec<u8>, ram: Vec<u8>) -> Mbc3 {
        let rom_banks = (rom.len() / ROM_BANK_SIZE).max(1);

        Mbc3 {
            rom,
            rom_banks,
            ram,
            rom_bank: 1,
            ram_select: RamSelect::Bank(0),
            ram_enabled: false,
            rtc: [0; RTC_REGISTER_COUNT],
            latch: 0,
        }
    }

    pub fn rtc_registers(&self) -> &[u8; RTC_REGISTER_COUNT] {
        &self.rtc
    }
}

impl Mapper for Mbc3 {
    #[inline]
    fn read_rom(&self, addr: u16) -> u8 {
        let bank = match addr {
            0x0000..=0x3fff => 0,
            _ => self.rom_bank as usize,
        };
        self.rom
            .get(rom_offset(bank, self.rom_banks, addr))
            .copied()
            .unwrap_or(0xff)
    }

    #[inline]
    fn write_rom_control(&mut self, addr: u16, data: u8) {
        match addr {
            0x0000..=0x1fff => {
                self.ram_enabled = data & 0x0f == 0x0a;
                debug!("MBC3: RAM/RTC enabled: {}", self.ram_enabled);
            }
            0x2000..=0x3fff => {
                self.rom_bank = data & 0b0111_1111;
                if self.rom_bank == 0 {
                    self.rom_bank = 1;
                }
                debug!("MBC3: Switched to ROM bank {}", self.current_rom_bank());
            }
            0x4000..=0x5fff => {
                self.ram_select = match data {
                    0x00..=0x03 => RamSelect::Bank(data),
                    0x08..=0x0c => RamSelect::Rtc(data - 0x08),
                    _ => RamSelect::Unmapped(data),
                };
                debug!("MBC3: Selected {:?}", self.ram_select);
            }
            0x6000..=0x7fff => {
                trace!("MBC3: RTC latch write ${:02x}", data);
                self.latch = data;
            }
            _ => {}
        }
    }

    #[inline]
    fn read_ram(&self, addr: u16) -> u8 {
        if !self.ram_enabled {
            return 0xff;
        }
        match self.ram_select {
            RamSelect::Bank(bank) => match ram_offset(bank as usize, self.ram.len(), addr) {
                Some(offset) => self.ram[offset],
                None => 0xff,
            },
            RamSelect::Rtc(register) => self.rtc[register as usize],
            RamSelect::Unmapped(_) => 0xff,
        }
    }

    #[inline]
    fn write_ram(&mut self, addr: u16, data: u8) {
        if !self.ram_enabled {
            return;
        }
        match self.ram_select {
            RamSelect::Bank(bank) => {
                if let Some(offset) = ram_offset(bank as usize, self.ram.len(), addr) {
                    self.ram[offset] = data;
                }
            }
            RamSelect::Rtc(register) => self.rtc[register as usize] = data,
            RamSelect::Unmapped(_) => {}
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
        match self.ram_select {
            RamSelect::Bank(bank) => bank,
            RamSelect::Rtc(register) => register + 0x08,
            RamSelect::Unmapped(value) => value,
        }
    }

    fn rom_bank_count(&self) -> usize {
        self.rom_banks
    }

    #[inline]
    fn name(&self) -> String {
        String::from("MBC3")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::cartridge::tests::build_rom;
    use crate::memory::RAM_BANK_SIZE;

    #[test]
    fn seven_bit_rom_bank_with_zero_remap() {
        let mut mbc = Mbc3::new(build_rom(0x11, 0x06, 0x00), vec![]);
        mbc.write_rom_control(0x2000, 0x7f);
        assert_eq!(mbc.read_rom(0x4000), 0x7f);

        mbc.write_rom_control(0x2000, 0x00);
        assert_eq!(mbc.read_rom(0x4000), 0x01);

        mbc.write_rom_control(0x2000, 0xff);
        assert_eq!(mbc.current_rom_bank(), 0x7f);
    }

    #[test]
    fn ram_banks() {
        let mut mbc = Mbc3::new(build_rom(0x13, 0x01, 0x03), vec![0; 4 * RAM_BANK_SIZE]);
        mbc.write_rom_control(0x0000, 0x0a);
        for bank in 0..4u8 {
            mbc.write_rom_control(0x4000, bank);
            mbc.write_ram(0xa000, 0x10 + bank);
        }
        for bank in 0..4u8 {
            mbc.write_rom_control(0x4000, bank);
            assert_eq!(mbc.read_ram(0xa000), 0x10 + bank);
            assert_eq!(mbc.ram()[bank as usize * RAM_BANK_SIZE], 0x10 + bank);
        }
    }

    #[test]
    fn rtc_registers_are_inert_storage() {
        let mut mbc = Mbc3::new(build_rom(0x10, 0x01, 0x02), vec![0; RAM_BANK_SIZE]);
        mbc.write_rom_control(0x0000, 0x0a);
        mbc.write_rom_control(0x4000, 0x08);
        mbc.write_ram(0xa000, 0x3b);
        mbc.write_rom_control(0x4000, 0x0c);
        mbc.write_ram(0xbfff, 0xc1);
        mbc.write_rom_control(0x6000, 0x00);
        mbc.write_rom_control(0x6000, 0x01);

        mbc.write_rom_control(0x4000, 0x08);
        assert_eq!(mbc.read_ram(0xa000), 0x3b);
        assert_eq!(mbc.rtc_registers(), &[0x3b, 0, 0, 0, 0xc1]);
        assert_eq!(mbc.ram()[0], 0x00);
    }

    #[test]
    fn disabled_ram_reads_open_bus() {
        let mut mbc = Mbc3::new(build_rom(0x13, 0x01, 0x02), vec![0; RAM_BANK_SIZE]);
        mbc.write_ram(0xa000, 0x42);
        assert_eq!(mbc.read_ram(0xa000), 0xff);
        assert_eq!(mbc.ram()[0], 0x00);
    }
}
