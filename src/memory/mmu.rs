use crate::lr35902::irq::Interrupts;
use crate::memory::mapper::Mapper;
use crate::memory::registers::{InterruptFlags, LcdControl, SerialControl, IO_POST_BOOT, IO_READ_MASKS};
use crate::memory::*;
use log::{debug, trace};

// The last instruction of the boot ROM unmaps it. Execution continues
// normally, thus entering the cartridge entrypoint at $100
const BOOTROM_END: u16 = 0x00ff;

/// Port writes whose effect belongs to a peripheral outside the core. The
/// bus records them in order; the driver drains the queue between steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoEvent {
    DividerReset,
    LcdEnabled,
    LcdDisabled,
    OamDma { source: u8 },
    SerialTransfer { data: u8 },
    BootRomUnmapped,
}

#[derive(Clone)]
pub struct Mmu {
    cartridge: Box<dyn Mapper>,
    bootrom: Option<Vec<u8>>,
    vram: Vec<u8>,
    wram: Vec<u8>,
    oam: Vec<u8>,
    io: [u8; IO_SIZE],
    hram: [u8; HRAM_SIZE],
    interrupts: Interrupts,
    events: Vec<IoEvent>,
}

impl Mmu {
    pub fn new(cartridge: Box<dyn Mapper>) -> Mmu {
        let mut io = [0; IO_SIZE];
        // No buttons held
        io[(JOYPAD_REGISTER - IO_START) as usize] = 0x0f;

        Mmu {
            cartridge,
            bootrom: None,
            vram: vec![0; VRAM_SIZE],
            wram: vec![0; WRAM_SIZE],
            oam: vec![0; OAM_SIZE],
            io,
            hram: [0; HRAM_SIZE],
            interrupts: Interrupts::new(),
            events: Vec::new(),
        }
    }

    /// Maps `bootrom` over $0000-$00FF until the program writes a non-zero
    /// value to $FF50.
    pub fn with_bootrom(bootrom: Vec<u8>, cartridge: Box<dyn Mapper>) -> Mmu {
        let mut mmu = Mmu::new(cartridge);
        mmu.bootrom = Some(bootrom);
        mmu
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            ROM_BANK_0_START..=BOOTROM_END if self.bootrom.is_some() => self.read_bootrom(addr),
            ROM_BANK_0_START..=ROM_BANK_N_END => self.cartridge.read_rom(addr),
            VRAM_START..=VRAM_END => self.vram[(addr - VRAM_START) as usize],
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.read_ram(addr),
            WRAM_BANK_0_START..=WRAM_BANK_1_END => self.wram[(addr - WRAM_BANK_0_START) as usize],
            ECHO_RAM_START..=ECHO_RAM_END => self.wram[(addr - ECHO_RAM_START) as usize],
            OAM_START..=OAM_END => self.oam[(addr - OAM_START) as usize],
            UNUSABLE_START..=UNUSABLE_END => UNUSABLE_SENTINEL,
            IO_START..=IO_END => self.read_io(addr),
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize],
            INTERRUPT_ENABLE_REGISTER => self.interrupts.read_enable(),
        }
    }

    pub fn read_as<T>(&self, addr: u16) -> T
    where
        T: From<u8>,
    {
        T::from(self.read(addr))
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        match addr {
            ROM_BANK_0_START..=ROM_BANK_N_END => self.cartridge.write_rom_control(addr, data),
            VRAM_START..=VRAM_END => self.vram[(addr - VRAM_START) as usize] = data,
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.write_ram(addr, data),
            WRAM_BANK_0_START..=WRAM_BANK_1_END => self.wram[(addr - WRAM_BANK_0_START) as usize] = data,
            ECHO_RAM_START..=ECHO_RAM_END => self.wram[(addr - ECHO_RAM_START) as usize] = data,
            OAM_START..=OAM_END => self.oam[(addr - OAM_START) as usize] = data,
            UNUSABLE_START..=UNUSABLE_END => trace!("Ignoring write of ${:02x} to unusable ${:04x}", data, addr),
            IO_START..=IO_END => self.write_io(addr, data),
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize] = data,
            INTERRUPT_ENABLE_REGISTER => self.interrupts.write_enable(data),
        }
    }

    /// Little-endian, the second byte at `addr + 1` with wraparound.
    pub fn read16(&self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub fn write16(&mut self, addr: u16, data: u16) {
        let [lo, hi] = data.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    fn read_bootrom(&self, addr: u16) -> u8 {
        self.bootrom
            .as_ref()
            .and_then(|bootrom| bootrom.get(addr as usize))
            .copied()
            .unwrap_or(0xff)
    }

    fn read_io(&self, addr: u16) -> u8 {
        let index = (addr - IO_START) as usize;
        match addr {
            INTERRUPT_FLAGS_REGISTER => self.interrupts.read_flags(),
            _ => self.io[index] | IO_READ_MASKS[index],
        }
    }

    fn write_io(&mut self, addr: u16, data: u8) {
        let index = (addr - IO_START) as usize;
        match addr {
            JOYPAD_REGISTER => {
                // Only the select lines are writable; the button bits belong to the joypad
                self.io[index] = (self.io[index] & 0xcf) | (data & 0x30);
            }
            SERIAL_CONTROL_REGISTER => {
                self.io[index] = data;
                let control = SerialControl::from(data);
                if control.contains(SerialControl::TRANSFER_ENABLE | SerialControl::INTERNAL_CLOCK) {
                    let data = self.io[(SERIAL_DATA_REGISTER - IO_START) as usize];
                    self.push_event(IoEvent::SerialTransfer { data });
                }
            }
            DIV_REGISTER => {
                self.io[index] = 0;
                self.push_event(IoEvent::DividerReset);
            }
            INTERRUPT_FLAGS_REGISTER => self.interrupts.write_flags(data),
            AUDIO_MASTER_CONTROL_REGISTER => {
                // Channel status bits are read-only
                self.io[index] = (self.io[index] & 0x7f) | (data & 0x80);
            }
            LCD_CONTROL_REGISTER => {
                let before = LcdControl::from(self.io[index]).contains(LcdControl::LCD_DISPLAY);
                let after = LcdControl::from(data).contains(LcdControl::LCD_DISPLAY);
                self.io[index] = data;
                match (before, after) {
                    (false, true) => self.push_event(IoEvent::LcdEnabled),
                    (true, false) => self.push_event(IoEvent::LcdDisabled),
                    _ => {}
                }
            }
            LCD_STATUS_REGISTER => {
                // Mode and coincidence bits are owned by the display controller
                self.io[index] = (self.io[index] & 0x87) | (data & 0x78);
            }
            SCANLINE_Y_REGISTER => trace!("Ignoring write of ${:02x} to LY", data),
            OAM_DMA_REGISTER => {
                self.io[index] = data;
                self.push_event(IoEvent::OamDma { source: data });
            }
            BOOTROM_MAPPER_REGISTER => {
                self.io[index] = data;
                if data != 0 && self.bootrom.take().is_some() {
                    debug!("Boot ROM unmapped");
                    self.push_event(IoEvent::BootRomUnmapped);
                }
            }
            _ => self.io[index] = data,
        }
    }

    fn push_event(&mut self, event: IoEvent) {
        trace!("I/O event: {:?}", event);
        self.events.push(event);
    }

    /// Reads an I/O port as its owning peripheral sees it: no read masks.
    /// Addresses outside $FF00-$FF7F go through the regular bus.
    pub fn read_io_raw(&self, addr: u16) -> u8 {
        match addr {
            INTERRUPT_FLAGS_REGISTER => self.interrupts.read_flags(),
            IO_START..=IO_END => self.io[(addr - IO_START) as usize],
            _ => self.read(addr),
        }
    }

    /// Writes an I/O port without side effects or write masks, for the
    /// peripheral that owns it (timer counting DIV, PPU updating LY, ...).
    pub fn write_io_raw(&mut self, addr: u16, data: u8) {
        match addr {
            INTERRUPT_FLAGS_REGISTER => self.interrupts.write_flags(data),
            IO_START..=IO_END => self.io[(addr - IO_START) as usize] = data,
            _ => self.write(addr, data),
        }
    }

    pub fn request_interrupt(&mut self, source: InterruptFlags) {
        self.interrupts.request(source);
    }

    pub fn apply_post_boot_io(&mut self) {
        for (addr, data) in IO_POST_BOOT {
            self.write_io_raw(addr, data);
        }
    }

    pub fn take_io_events(&mut self) -> Vec<IoEvent> {
        std::mem::take(&mut self.events)
    }

    /// Empties the event queue in order, keeping its allocation.
    pub fn drain_io_events(&mut self) -> std::vec::Drain<'_, IoEvent> {
        self.events.drain(..)
    }

    pub fn interrupts(&self) -> &Interrupts {
        &self.interrupts
    }

    pub fn interrupts_mut(&mut self) -> &mut Interrupts {
        &mut self.interrupts
    }

    pub fn cartridge(&self) -> &dyn Mapper {
        self.cartridge.as_ref()
    }

    pub fn cartridge_mut(&mut self) -> &mut dyn Mapper {
        self.cartridge.as_mut()
    }

    pub fn is_bootrom_mapped(&self) -> bool {
        self.bootrom.is_some()
    }

    pub fn current_rom_bank(&self) -> u16 {
        self.cartridge.current_rom_bank()
    }
}
