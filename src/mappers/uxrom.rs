/*
UxROM (Mapper 2) implementation.

Characteristics:
- PRG: $8000-$BFFF is a switchable 16 KiB bank; $C000-$FFFF is fixed to the last bank.
- CHR: 8 KiB, almost always RAM on real boards (ROM accepted if the image carries it).
- Mirroring: fixed by the iNES header.
- No PRG RAM, no IRQ.

Bank Select:
- Any write to $8000-$FFFF latches `value & mask`, where the mask covers the
  bank count rounded up to a power of two. Bus conflicts are not modelled.

Reset Behavior:
- Bank register returns to 0.
*/

use tracing::trace;

use crate::mapper::{Chr, Mapper, Mirroring, banked_index, unmapped_read, unmapped_write};

const PRG_BANK: usize = 0x4000;

#[derive(Debug, Clone)]
pub struct Uxrom {
    prg_rom: Vec<u8>,
    chr: Chr,
    mirroring: Mirroring,
    bank: u8,
    bank_mask: u8,
    last_bank: usize,
}

impl Uxrom {
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_is_ram: bool, mirroring: Mirroring) -> Self {
        let bank_count = (prg_rom.len() / PRG_BANK).max(1);
        let bank_mask = (bank_count.next_power_of_two() - 1).min(0xFF) as u8;
        Self {
            prg_rom,
            chr: Chr::new(chr, chr_is_ram),
            mirroring,
            bank: 0,
            bank_mask,
            last_bank: bank_count - 1,
        }
    }

    /// Bank currently visible at $8000-$BFFF.
    pub fn selected_bank(&self) -> u8 {
        self.bank
    }
}

impl Mapper for Uxrom {
    fn mapper_id(&self) -> u16 {
        2
    }

    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xBFFF => {
                let idx = banked_index(
                    self.prg_rom.len(),
                    self.bank as usize,
                    PRG_BANK,
                    (addr - 0x8000) as usize,
                );
                self.prg_rom[idx]
            }
            0xC000..=0xFFFF => {
                let idx = banked_index(
                    self.prg_rom.len(),
                    self.last_bank,
                    PRG_BANK,
                    (addr - 0xC000) as usize,
                );
                self.prg_rom[idx]
            }
            _ => unmapped_read("UxROM", addr),
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        match addr {
            0x8000..=0xFFFF => {
                self.bank = value & self.bank_mask;
                trace!("UxROM: PRG bank {} at $8000", self.bank);
            }
            _ => unmapped_write("UxROM", addr, value),
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        self.chr.read_banked(0, 0x2000, addr as usize)
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        self.chr.write_banked(0, 0x2000, addr as usize, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn reset(&mut self) {
        self.bank = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// PRG image whose every byte holds its own 16 KiB bank number.
    fn tagged_prg(banks: usize) -> Vec<u8> {
        (0..banks * PRG_BANK).map(|i| (i / PRG_BANK) as u8).collect()
    }

    #[test]
    fn switchable_low_window_fixed_high_window() {
        let mut m = Uxrom::new(tagged_prg(8), Vec::new(), true, Mirroring::Vertical);
        assert_eq!(m.cpu_read(0x8000), 0);
        assert_eq!(m.cpu_read(0xC000), 7);

        for b in 0..16u8 {
            m.cpu_write(0x8000 + b as u16 * 0x123, b);
            let expected = b & 0x07;
            assert_eq!(m.cpu_read(0x8000), expected, "bank {b}");
            assert_eq!(m.cpu_read(0xBFFF), expected, "bank {b}");
            assert_eq!(m.cpu_read(0xC000), 7, "fixed bank must not move");
            assert_eq!(m.cpu_read(0xFFFF), 7, "fixed bank must not move");
        }
    }

    #[test]
    fn non_power_of_two_bank_count_wraps() {
        let mut m = Uxrom::new(tagged_prg(6), Vec::new(), true, Mirroring::Vertical);
        m.cpu_write(0xFFFF, 0x07);
        // mask = 7, bank 7 wraps to 1 within six banks
        assert_eq!(m.cpu_read(0x8000), 1);
        assert_eq!(m.cpu_read(0xC000), 5);
    }

    #[test]
    fn reset_returns_to_bank_zero() {
        let mut m = Uxrom::new(tagged_prg(4), Vec::new(), true, Mirroring::Horizontal);
        m.cpu_write(0x8000, 2);
        m.reset();
        assert_eq!(m.selected_bank(), 0);
        assert_eq!(m.cpu_read(0x8000), 0);
    }

    #[test]
    fn chr_ram_round_trip() {
        let mut m = Uxrom::new(tagged_prg(2), Vec::new(), true, Mirroring::Horizontal);
        m.ppu_write(0x1FFF, 0xAB);
        assert_eq!(m.ppu_read(0x1FFF), 0xAB);
    }
}
