#![doc = r#"
PPU address-space module: nametable RAM.

- The console has 2 KiB of nametable RAM; four-screen boards add 2 KiB on the
  cartridge. Both live here as one 4 KiB store so `Mirroring::nametable_index`
  can address either.
- $3000-$3EFF mirrors $2000-$2EFF; the index helper folds that by masking.
- Palette RAM ($3F00-$3FFF) lives in the PPU and never reaches this store.
"#]

use crate::mapper::Mirroring;

/// Backing size for nametables including four-screen RAM.
pub const NAMETABLE_RAM_SIZE: usize = 0x1000;

#[derive(Clone)]
pub struct NametableRam {
    data: [u8; NAMETABLE_RAM_SIZE],
}

impl Default for NametableRam {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NametableRam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NametableRam").finish_non_exhaustive()
    }
}

impl NametableRam {
    pub fn new() -> Self {
        Self {
            data: [0; NAMETABLE_RAM_SIZE],
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    pub fn read(&self, addr: u16, mirroring: Mirroring) -> u8 {
        self.data[mirroring.nametable_index(addr)]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u8, mirroring: Mirroring) {
        self.data[mirroring.nametable_index(addr)] = value;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_pairs_top_and_bottom() {
        let mut nt = NametableRam::new();
        nt.write(0x2001, 0x11, Mirroring::Horizontal);
        nt.write(0x2801, 0x22, Mirroring::Horizontal);
        assert_eq!(nt.read(0x2401, Mirroring::Horizontal), 0x11);
        assert_eq!(nt.read(0x2C01, Mirroring::Horizontal), 0x22);
    }

    #[test]
    fn single_screen_upper_uses_second_page() {
        let mut nt = NametableRam::new();
        nt.write(0x2000, 0x77, Mirroring::SingleScreenUpper);
        assert_eq!(nt.as_slice()[0x400], 0x77);
        assert_eq!(nt.read(0x2C00, Mirroring::SingleScreenUpper), 0x77);
    }

    #[test]
    fn four_screen_keeps_tables_apart_and_mirrors_3000() {
        let mut nt = NametableRam::new();
        for (i, base) in [0x2000u16, 0x2400, 0x2800, 0x2C00].into_iter().enumerate() {
            nt.write(base + 5, i as u8 + 1, Mirroring::FourScreen);
        }
        assert_eq!(nt.read(0x2C05, Mirroring::FourScreen), 4);
        assert_eq!(nt.read(0x3805, Mirroring::FourScreen), 3);
    }

    #[test]
    fn clear_zeroes_everything() {
        let mut nt = NametableRam::new();
        nt.write(0x2000, 0xFF, Mirroring::Vertical);
        nt.clear();
        assert!(nt.as_slice().iter().all(|&b| b == 0));
    }
}
