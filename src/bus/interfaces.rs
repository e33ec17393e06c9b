/*!
interfaces: the CPU-facing bus trait and the PPU's split-borrow memory view.

- `CpuBus` is what `Cpu::tick` talks to. `read`/`write` model one clocked bus
  access each; `peek` is unclocked and side-effect free (disassembler,
  debuggers). `irq_line` reports the level-triggered IRQ input.
- `PpuMemory` borrows only the nametable RAM and the cartridge, so the `Bus`
  can hand it to `Ppu::tick` while the PPU itself is borrowed mutably.
*/

use crate::bus::ppu_space::NametableRam;
use crate::cartridge::Cartridge;
use crate::mapper::{Mirroring, OPEN_BUS_SENTINEL};
use crate::ppu_bus::PpuBus;

/// CPU address-space interface.
pub trait CpuBus {
    /// Clocked read; may have side effects (PPU status, controller shift).
    fn read(&mut self, addr: u16) -> u8;

    /// Clocked write.
    fn write(&mut self, addr: u16, value: u8);

    /// Unclocked read without side effects.
    fn peek(&self, addr: u16) -> u8;

    /// Level of the IRQ input (mapper/APU), sampled at instruction boundaries.
    fn irq_line(&self) -> bool {
        false
    }
}

/// PPU address space backed by nametable RAM and the cartridge mapper.
///
/// Every access is reported to the mapper through `observe_ppu_address`
/// before it is serviced.
pub struct PpuMemory<'a> {
    vram: &'a mut NametableRam,
    cartridge: Option<&'a mut Cartridge>,
}

impl<'a> PpuMemory<'a> {
    #[inline]
    pub fn from_parts(vram: &'a mut NametableRam, cartridge: Option<&'a mut Cartridge>) -> Self {
        Self { vram, cartridge }
    }

    fn mirroring(&self) -> Mirroring {
        self.cartridge
            .as_deref()
            .map_or(Mirroring::Horizontal, Cartridge::mirroring)
    }
}

impl PpuBus for PpuMemory<'_> {
    fn ppu_read(&mut self, addr: u16) -> u8 {
        let a = addr & 0x3FFF;
        if let Some(cart) = self.cartridge.as_deref_mut() {
            cart.mapper_mut().observe_ppu_address(a);
        }
        match a {
            0x0000..=0x1FFF => self
                .cartridge
                .as_deref()
                .map_or(OPEN_BUS_SENTINEL, |c| c.mapper().ppu_read(a)),
            _ => {
                let mirroring = self.mirroring();
                self.vram.read(a, mirroring)
            }
        }
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        let a = addr & 0x3FFF;
        if let Some(cart) = self.cartridge.as_deref_mut() {
            cart.mapper_mut().observe_ppu_address(a);
        }
        match a {
            0x0000..=0x1FFF => {
                if let Some(cart) = self.cartridge.as_deref_mut() {
                    cart.mapper_mut().ppu_write(a, value);
                }
            }
            _ => {
                let mirroring = self.mirroring();
                self.vram.write(a, value, mirroring);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::build_ines;

    #[test]
    fn nametables_follow_cartridge_mirroring() {
        let mut vram = NametableRam::new();
        // flags6 bit 0 = vertical
        let rom = build_ines(1, 1, 0x01, 0x00, 0, None);
        let mut cart = Cartridge::from_ines_bytes(&rom).unwrap();
        let mut mem = PpuMemory::from_parts(&mut vram, Some(&mut cart));
        mem.ppu_write(0x2000, 0x12);
        assert_eq!(mem.ppu_read(0x2800), 0x12);
        assert_eq!(mem.ppu_read(0x2400), 0x00);
        assert_eq!(mem.ppu_read(0x3000), 0x12);
    }

    #[test]
    fn pattern_reads_go_to_chr() {
        let mut vram = NametableRam::new();
        let rom = build_ines(1, 1, 0x00, 0x00, 0, None);
        let mut cart = Cartridge::from_ines_bytes(&rom).unwrap();
        let mut mem = PpuMemory::from_parts(&mut vram, Some(&mut cart));
        assert_eq!(mem.ppu_read(0x0123), 0xCC);
    }

    #[test]
    fn no_cartridge_reads_sentinel_patterns() {
        let mut vram = NametableRam::new();
        let mut mem = PpuMemory::from_parts(&mut vram, None);
        assert_eq!(mem.ppu_read(0x0000), OPEN_BUS_SENTINEL);
        mem.ppu_write(0x2000, 0x34);
        assert_eq!(mem.ppu_read(0x2400), 0x34, "defaults to horizontal");
    }
}
