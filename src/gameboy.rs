use crate::error::AyyError;
use crate::lr35902::cpu::Cpu;
use crate::memory::cartridge::CartridgeHeader;
use crate::memory::mapper::from_rom;
use crate::memory::mmu::{IoEvent, Mmu};
use log::debug;

pub struct GameBoy {
    cpu: Cpu,
    mmu: Mmu,
    header: CartridgeHeader,
}

impl GameBoy {
    /// Starts directly at the cartridge entrypoint, with registers and I/O
    /// ports as the boot ROM would have left them.
    pub fn new(rom: Vec<u8>) -> Result<GameBoy, AyyError> {
        let (header, cartridge) = from_rom(rom)?;
        let mut mmu = Mmu::new(cartridge);
        mmu.apply_post_boot_io();

        debug!("Starting at $0100 with the {} mapper", mmu.cartridge().name());
        Ok(GameBoy {
            cpu: Cpu::post_boot(),
            mmu,
            header,
        })
    }

    /// Starts at $0000 inside `bootrom`.
    pub fn with_bootrom(bootrom: Vec<u8>, rom: Vec<u8>) -> Result<GameBoy, AyyError> {
        let (header, cartridge) = from_rom(rom)?;
        let mmu = Mmu::with_bootrom(bootrom, cartridge);

        debug!("Starting in the boot ROM with the {} mapper", mmu.cartridge().name());
        Ok(GameBoy {
            cpu: Cpu::new(),
            mmu,
            header,
        })
    }

    pub fn step(&mut self) -> Result<usize, AyyError> {
        self.cpu.step(&mut self.mmu)
    }

    /// Steps until at least `budget` cycles have elapsed. The last
    /// instruction is never split, so the result may overshoot.
    ///
    /// I/O events are drained after every step and handed to `on_event`
    /// with the cycle count at which they were raised, so the queue never
    /// outlives the call.
    pub fn run_for<F>(&mut self, budget: usize, mut on_event: F) -> Result<usize, AyyError>
    where
        F: FnMut(usize, IoEvent),
    {
        let mut elapsed = 0;
        while elapsed < budget {
            elapsed += self.step()?;

            let cycles = self.cpu.cycles();
            for event in self.mmu.drain_io_events() {
                on_event(cycles, event);
            }
        }
        Ok(elapsed)
    }

    pub fn cycles(&self) -> usize {
        self.cpu.cycles()
    }

    pub fn take_io_events(&mut self) -> Vec<IoEvent> {
        self.mmu.take_io_events()
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn ram(&self) -> &[u8] {
        self.mmu.cartridge().ram()
    }

    pub fn load_save_ram(&mut self, data: &[u8]) {
        self.mmu.cartridge_mut().load_ram(data);
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }
}
