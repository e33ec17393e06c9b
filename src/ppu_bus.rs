/*!
ppu_bus: Trait abstraction decoupling the PPU from the concrete `Bus`.

The PPU reaches the outside world only through this trait:
- 0x0000-0x1FFF : Pattern tables (CHR ROM/RAM via the mapper)
- 0x2000-0x2FFF : Nametables (mapper-controlled mirroring)
- 0x3000-0x3EFF : Mirrors of 0x2000-0x2EFF

Palette RAM (0x3F00-0x3FFF) is owned by the PPU and never reaches the trait.

Every call models one access on the PPU address bus, so implementors may
observe the address stream (MMC3 counts A12 edges this way). Tests use the
flat `MockPpuBus` below instead of a full console.
*/

/// Minimal interface the PPU depends on for memory fetches.
pub trait PpuBus {
    /// Read a byte from the 14-bit PPU address space (palette excluded).
    fn ppu_read(&mut self, addr: u16) -> u8;

    /// Write a byte to the 14-bit PPU address space (palette excluded).
    fn ppu_write(&mut self, addr: u16, value: u8);
}

/// Flat 16 KiB PPU memory with single-screen nametables, for unit tests.
#[cfg(test)]
pub struct MockPpuBus {
    pub mem: Vec<u8>,
    pub reads: Vec<u16>,
}

#[cfg(test)]
impl MockPpuBus {
    pub fn new() -> Self {
        Self {
            mem: vec![0; 0x4000],
            reads: Vec::new(),
        }
    }

    /// Write one 8x8 tile (both bit planes) into the pattern table.
    pub fn set_tile(&mut self, table: u16, tile: u8, lo: [u8; 8], hi: [u8; 8]) {
        let base = (table + tile as u16 * 16) as usize;
        self.mem[base..base + 8].copy_from_slice(&lo);
        self.mem[base + 8..base + 16].copy_from_slice(&hi);
    }

    fn index(addr: u16) -> usize {
        let a = addr & 0x3FFF;
        if a >= 0x2000 {
            0x2000 + (a as usize & 0x03FF)
        } else {
            a as usize
        }
    }
}

#[cfg(test)]
impl PpuBus for MockPpuBus {
    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.reads.push(addr);
        self.mem[Self::index(addr)]
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        self.mem[Self::index(addr)] = value;
    }
}
