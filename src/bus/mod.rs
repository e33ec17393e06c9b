#![doc = r#"
Bus module: the console's shared address/data bus.

Modules and responsibilities
- Bus: façade owning RAM, PPU, nametable RAM, APU sink, controllers, the
  cartridge slot, and the OAM DMA engine.
- cpu_interface: CPU-visible address decoder (clocked read/write, unclocked peek).
- ppu_space: nametable RAM with mapper-selected mirroring.
- interfaces: the `CpuBus` trait and the split-borrow `PpuMemory` view.
- dma: OAM DMA controller.
- ram: 2 KiB mirrored work RAM.

Ownership
- The Bus is the only mutable intermediary between CPU, PPU, and cartridge.
  The PPU is ticked through `PpuMemory`, which borrows only nametable RAM and
  the cartridge, so no part of the Bus is moved out while it runs.
"#]

use tracing::debug;

use crate::apu::Apu;
use crate::cartridge::Cartridge;
use crate::controller::Controller;
use crate::ppu::Ppu;

pub mod cpu_interface;
pub mod dma;
pub mod interfaces;
pub mod ppu_space;
pub mod ram;

pub use dma::{CpuMemory, DmaController, OamWriter};
pub use interfaces::{CpuBus, PpuMemory};
pub use ppu_space::NametableRam;
pub use ram::Ram;

use dma::OamLatch;

#[derive(Debug)]
pub struct Bus {
    ram: Ram,
    ppu: Ppu,
    vram: NametableRam,
    apu: Apu,
    controllers: [Controller; 2],
    cartridge: Option<Cartridge>,
    dma: DmaController,
    cpu_cycle: u64,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    /// Bus with an empty cartridge slot.
    pub fn new() -> Self {
        Self {
            ram: Ram::new(),
            ppu: Ppu::new(),
            vram: NametableRam::new(),
            apu: Apu::new(),
            controllers: [Controller::new(), Controller::new()],
            cartridge: None,
            dma: DmaController::new(),
            cpu_cycle: 0,
        }
    }

    pub fn with_cartridge(cartridge: Cartridge) -> Self {
        let mut bus = Self::new();
        bus.insert_cartridge(cartridge);
        bus
    }

    /// Insert a cartridge, returning the one previously in the slot.
    /// Nametable RAM and cartridge-derived PPU state are cleared; work RAM is kept.
    pub fn insert_cartridge(&mut self, cartridge: Cartridge) -> Option<Cartridge> {
        debug!(
            mapper = cartridge.mapper_id(),
            mirroring = ?cartridge.mirroring(),
            "cartridge inserted"
        );
        let previous = self.cartridge.replace(cartridge);
        self.clear_cartridge_state();
        previous
    }

    /// Remove the cartridge. Work RAM is kept; cartridge-dependent state is cleared.
    pub fn eject_cartridge(&mut self) -> Option<Cartridge> {
        let previous = self.cartridge.take();
        if previous.is_some() {
            debug!("cartridge ejected");
        }
        self.clear_cartridge_state();
        previous
    }

    fn clear_cartridge_state(&mut self) {
        self.vram.clear();
        self.ppu.clear_cartridge_state();
        self.dma.reset();
    }

    /// Console reset: PPU, APU, DMA, and mapper return to power-on state.
    /// Work RAM and nametable contents survive.
    pub fn reset(&mut self) {
        self.ppu.reset();
        self.apu.reset();
        self.dma.reset();
        if let Some(cart) = self.cartridge.as_mut() {
            cart.mapper_mut().reset();
        }
    }

    // Accessors
    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }
    pub fn cartridge_mut(&mut self) -> Option<&mut Cartridge> {
        self.cartridge.as_mut()
    }
    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }
    pub fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }
    pub fn apu(&self) -> &Apu {
        &self.apu
    }
    pub fn ram(&self) -> &Ram {
        &self.ram
    }
    pub fn nametables(&self) -> &NametableRam {
        &self.vram
    }
    pub fn controller_mut(&mut self, port: usize) -> &mut Controller {
        &mut self.controllers[port & 1]
    }
    pub fn cpu_cycle(&self) -> u64 {
        self.cpu_cycle
    }

    /// Count one elapsed CPU cycle (DMA alignment uses its parity).
    pub fn begin_cpu_cycle(&mut self) {
        self.cpu_cycle = self.cpu_cycle.wrapping_add(1);
    }

    /// PPU plus its memory view, borrowed disjointly.
    pub(crate) fn split_ppu(&mut self) -> (&mut Ppu, PpuMemory<'_>) {
        let mem = PpuMemory::from_parts(&mut self.vram, self.cartridge.as_mut());
        (&mut self.ppu, mem)
    }

    /// Advance the PPU by one dot.
    pub fn tick_ppu(&mut self) {
        let (ppu, mut mem) = self.split_ppu();
        ppu.tick(&mut mem);
    }

    /// PPU address-space view for tools and tests.
    pub fn ppu_memory(&mut self) -> PpuMemory<'_> {
        PpuMemory::from_parts(&mut self.vram, self.cartridge.as_mut())
    }

    pub fn dma_active(&self) -> bool {
        self.dma.is_active()
    }

    /// Run one CPU cycle of OAM DMA. Returns whether the CPU is stalled.
    pub fn step_dma(&mut self) -> bool {
        let mut dma = std::mem::take(&mut self.dma);
        let mut latch = OamLatch::default();
        let stalled = dma.step_one_cycle(self, &mut latch);
        if let Some(value) = latch.0 {
            self.ppu.write_oam_data(value);
        }
        self.dma = dma;
        stalled
    }
}

impl CpuMemory for Bus {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        cpu_interface::cpu_read(self, addr)
    }
}

impl CpuBus for Bus {
    fn read(&mut self, addr: u16) -> u8 {
        cpu_interface::cpu_read(self, addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        cpu_interface::cpu_write(self, addr, value);
    }

    fn peek(&self, addr: u16) -> u8 {
        cpu_interface::cpu_peek(self, addr)
    }

    fn irq_line(&self) -> bool {
        self.cartridge
            .as_ref()
            .is_some_and(|c| c.mapper().irq_pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Buttons;
    use crate::test_utils::{build_ines, build_nrom_with_prg};

    fn nrom_bus() -> Bus {
        let rom = build_nrom_with_prg(&[0xEA, 0x4C, 0x00, 0x80], 1, 1, None);
        Bus::with_cartridge(Cartridge::from_ines_bytes(&rom).unwrap())
    }

    #[test]
    fn ram_is_mirrored_through_1fff() {
        let mut bus = nrom_bus();
        bus.write(0x0002, 0x44);
        assert_eq!(bus.read(0x0802), 0x44);
        assert_eq!(bus.peek(0x1802), 0x44);
    }

    #[test]
    fn prg_rom_and_vectors_are_visible() {
        let bus = nrom_bus();
        assert_eq!(bus.peek(0x8000), 0xEA);
        assert_eq!(bus.peek(0xC000), 0xEA, "NROM-128 mirror");
        assert_eq!(cpu_interface::cpu_peek_word(&bus, 0xFFFC), 0x8000);
    }

    #[test]
    fn ppu_registers_mirror_every_eight_bytes() {
        let mut bus = nrom_bus();
        bus.write(0x3FFE, 0x20); // $2006 mirror
        bus.write(0x2006, 0x00);
        assert_eq!(bus.ppu().vram_addr(), 0x2000);
        bus.write(0x2007, 0x99);
        assert_eq!(bus.nametables().as_slice()[0], 0x99);
    }

    #[test]
    fn peek_has_no_side_effects() {
        let mut bus = nrom_bus();
        bus.controller_mut(0).set_buttons(Buttons::A);
        bus.write(0x4016, 1);
        bus.write(0x4016, 0);
        assert_eq!(bus.peek(0x4016), 1);
        assert_eq!(bus.peek(0x4016), 1);
        assert_eq!(bus.read(0x4016), 1);
        assert_eq!(bus.read(0x4016), 0);
    }

    #[test]
    fn apu_window_reaches_the_sink() {
        let mut bus = nrom_bus();
        bus.write(0x4015, 0x0F);
        assert_eq!(bus.read(0x4015), 0x0F);
        bus.write(0x4003, 0x77);
        assert_eq!(bus.apu().register(0x4003), Some(0x77));
        assert_eq!(bus.read(0x4018), 0x00);
    }

    #[test]
    fn oam_dma_copies_a_page_and_stalls_513_cycles() {
        let mut bus = nrom_bus();
        for i in 0..256u16 {
            bus.write(0x0200 + i, i as u8);
        }
        bus.write(0x4014, 0x02);
        assert!(bus.dma_active());
        let mut cycles = 0;
        while bus.dma_active() {
            bus.step_dma();
            bus.begin_cpu_cycle();
            cycles += 1;
        }
        assert_eq!(cycles, 513);
        assert_eq!(bus.ppu().peek_oam(0), 0);
        assert_eq!(bus.ppu().peek_oam(0x80), 0x80);
        assert_eq!(bus.ppu().peek_oam(0xFF), 0xFF);
    }

    #[test]
    fn oam_dma_on_odd_cycle_takes_514() {
        let mut bus = nrom_bus();
        bus.begin_cpu_cycle();
        bus.write(0x4014, 0x00);
        let mut cycles = 0;
        while bus.step_dma() {
            cycles += 1;
        }
        assert_eq!(cycles, 514);
    }

    #[test]
    fn eject_keeps_ram_and_clears_nametables() {
        let mut bus = nrom_bus();
        bus.write(0x0010, 0x5A);
        bus.write(0x2006, 0x20);
        bus.write(0x2006, 0x00);
        bus.write(0x2007, 0x99);
        let cart = bus.eject_cartridge();
        assert!(cart.is_some());
        assert!(bus.cartridge().is_none());
        assert_eq!(bus.read(0x0010), 0x5A);
        assert!(bus.nametables().as_slice().iter().all(|&b| b == 0));
        assert_eq!(bus.read(0x8000), 0x00, "empty slot answers the sentinel");
        assert!(!bus.irq_line());
    }

    #[test]
    fn insert_replaces_previous_cartridge() {
        let mut bus = nrom_bus();
        let other = Cartridge::from_ines_bytes(&build_ines(1, 1, 0x01, 0, 0, None)).unwrap();
        let previous = bus.insert_cartridge(other);
        assert_eq!(previous.map(|c| c.mapper_id()), Some(0));
        assert_eq!(bus.peek(0x8000), 0xAA);
    }
}
