#![doc = r#"
PPU sprite evaluation module

Phases per visible scanline (rendering enabled)
- CLEAR     (dots   1..=64):  secondary OAM filled with $FF, one byte per even dot.
- EVALUATE  (dots  65..=256): odd dots read primary OAM into a latch, even dots
  act on it. In-range sprites are copied to secondary OAM (up to 8). Once 8 are
  found, the search keeps going with the hardware's diagonal (n, m) walk, so the
  overflow flag is both missed and falsely set the way real games see it.
- FETCH     (dots 257..=320): 8 slots x 8 dots. Two garbage nametable reads, then
  the pattern low/high planes. Empty slots fetch tile $FF so the pattern-table
  address stream (and mapper A12 edges) stays identical to hardware.

Sprites found on line N are drawn on line N + 1; a sprite's OAM Y is its top
row minus one.
"#]

use super::{Ppu, SpriteEval, SpriteSlot};
use crate::ppu::registers::PpuStatus;
use crate::ppu_bus::PpuBus;

impl Ppu {
    /// One dot of sprite pipeline work on a rendering line.
    pub(in crate::ppu) fn sprite_step<B: PpuBus>(&mut self, bus: &mut B, visible: bool) {
        match self.dot {
            1 => self.eval = SpriteEval::default(),
            2..=64 if self.dot % 2 == 0 => {
                self.secondary_oam[(self.dot / 2 - 1) as usize] = 0xFF;
            }
            65..=256 if visible => self.evaluate_step(),
            257..=320 => self.fetch_sprite_step(bus),
            _ => {}
        }
    }

    fn sprite_in_range(&self, y: u8) -> bool {
        self.scanline.wrapping_sub(y as u16) < self.ctrl.sprite_height()
    }

    fn evaluate_step(&mut self) {
        let e = self.eval;
        if self.dot % 2 == 1 {
            let idx = (e.n as usize * 4 + e.m as usize) & 0xFF;
            self.eval.latch = self.oam[idx];
            return;
        }
        if e.done {
            return;
        }

        let latch = e.latch;
        if e.found < 8 {
            self.secondary_oam[e.found as usize * 4 + e.m as usize] = latch;
            if e.m == 0 {
                if self.sprite_in_range(latch) {
                    self.eval.m = 1;
                    if e.n == 0 {
                        self.eval.sprite_zero_found = true;
                    }
                } else {
                    self.next_sprite();
                }
            } else if e.m == 3 {
                self.eval.m = 0;
                self.eval.found += 1;
                self.next_sprite();
            } else {
                self.eval.m += 1;
            }
        } else if self.sprite_in_range(latch) {
            self.status.insert(PpuStatus::SPRITE_OVERFLOW);
            self.eval.done = true;
        } else {
            // Hardware bug: m advances along with n.
            self.eval.m = (e.m + 1) & 0x03;
            self.next_sprite();
        }
    }

    fn next_sprite(&mut self) {
        self.eval.n += 1;
        if self.eval.n >= 64 {
            self.eval.n = 0;
            self.eval.done = true;
        }
    }

    fn fetch_sprite_step<B: PpuBus>(&mut self, bus: &mut B) {
        let offset = self.dot - 257;
        let slot = (offset / 8) as usize;
        self.oam_addr = 0;

        match offset % 8 {
            0 => {
                if slot == 0 {
                    self.sprite_count = self.eval.found.min(8);
                    self.sprite_zero_in_line = self.eval.sprite_zero_found;
                }
                bus.ppu_read(self.v.tile_address());
            }
            2 => {
                bus.ppu_read(self.v.tile_address());
            }
            4 => {
                let addr = self.sprite_pattern_address(slot);
                self.sprites[slot].pattern_lo = bus.ppu_read(addr);
            }
            6 => {
                let addr = self.sprite_pattern_address(slot) + 8;
                let hi = bus.ppu_read(addr);
                let base = slot * 4;
                let attr = self.secondary_oam[base + 2];
                let lo = self.sprites[slot].pattern_lo;
                let (lo, hi) = if slot < self.sprite_count as usize {
                    if attr & 0x40 != 0 {
                        (lo.reverse_bits(), hi.reverse_bits())
                    } else {
                        (lo, hi)
                    }
                } else {
                    (0, 0)
                };
                self.sprites[slot] = SpriteSlot {
                    pattern_lo: lo,
                    pattern_hi: hi,
                    attr,
                    x_counter: self.secondary_oam[base + 3],
                };
            }
            _ => {}
        }
    }

    fn sprite_pattern_address(&self, slot: usize) -> u16 {
        let base = slot * 4;
        let y = self.secondary_oam[base];
        let tile = self.secondary_oam[base + 1];
        let attr = self.secondary_oam[base + 2];
        let height = self.ctrl.sprite_height();

        let mut row = self.scanline.wrapping_sub(y as u16) & (height - 1);
        if attr & 0x80 != 0 {
            row = height - 1 - row;
        }

        if height == 16 {
            let table = u16::from(tile & 0x01) * 0x1000;
            let mut index = (tile & 0xFE) as u16;
            if row >= 8 {
                index += 1;
                row -= 8;
            }
            table + (index << 4) + row
        } else {
            self.ctrl.sprite_table() + ((tile as u16) << 4) + row
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppu::registers::{PpuCtrl, PpuMask};
    use crate::ppu_bus::MockPpuBus;

    fn eval_line(ppu: &mut Ppu, bus: &mut MockPpuBus, scanline: u16) {
        ppu.scanline = scanline;
        for dot in 1..=320 {
            ppu.dot = dot;
            ppu.sprite_step(bus, true);
        }
    }

    fn ppu_with_hidden_sprites() -> Ppu {
        let mut ppu = Ppu::new();
        ppu.mask = PpuMask::SHOW_SPRITES;
        for i in 0..256 {
            ppu.poke_oam(i, 0xFF);
        }
        ppu
    }

    fn place(ppu: &mut Ppu, n: usize, y: u8, tile: u8, attr: u8, x: u8) {
        ppu.poke_oam(n * 4, y);
        ppu.poke_oam(n * 4 + 1, tile);
        ppu.poke_oam(n * 4 + 2, attr);
        ppu.poke_oam(n * 4 + 3, x);
    }

    #[test]
    fn copies_in_range_sprites_to_secondary_oam() {
        let mut ppu = ppu_with_hidden_sprites();
        let mut bus = MockPpuBus::new();
        place(&mut ppu, 0, 10, 0x01, 0x00, 40);
        place(&mut ppu, 5, 14, 0x02, 0x01, 80);
        place(&mut ppu, 6, 30, 0x03, 0x00, 90);
        eval_line(&mut ppu, &mut bus, 15);
        assert_eq!(ppu.sprite_count, 2);
        assert!(ppu.sprite_zero_in_line);
        assert_eq!(&ppu.secondary_oam[0..8], &[10, 0x01, 0x00, 40, 14, 0x02, 0x01, 80]);
        assert!(!ppu.sprite_overflow());
    }

    #[test]
    fn nine_sprites_on_a_line_set_overflow() {
        let mut ppu = ppu_with_hidden_sprites();
        let mut bus = MockPpuBus::new();
        for n in 0..9 {
            place(&mut ppu, n, 50, 0, 0, n as u8 * 8);
        }
        eval_line(&mut ppu, &mut bus, 52);
        assert_eq!(ppu.sprite_count, 8);
        assert!(ppu.sprite_overflow());
    }

    #[test]
    fn eight_sprites_do_not_overflow() {
        let mut ppu = ppu_with_hidden_sprites();
        let mut bus = MockPpuBus::new();
        for n in 0..8 {
            place(&mut ppu, n, 50, 0, 0, 0);
        }
        eval_line(&mut ppu, &mut bus, 50);
        assert_eq!(ppu.sprite_count, 8);
        assert!(!ppu.sprite_overflow());
    }

    #[test]
    fn diagonal_walk_misses_ninth_sprite() {
        let mut ppu = ppu_with_hidden_sprites();
        let mut bus = MockPpuBus::new();
        for n in 0..8 {
            place(&mut ppu, n, 50, 0, 0, 0);
        }
        // Sprite 8 is out of range, so the walk reads sprite 9's tile byte as Y.
        place(&mut ppu, 9, 50, 0xC0, 0, 0);
        eval_line(&mut ppu, &mut bus, 50);
        assert!(!ppu.sprite_overflow());
    }

    #[test]
    fn diagonal_walk_flags_out_of_range_sprite() {
        let mut ppu = ppu_with_hidden_sprites();
        let mut bus = MockPpuBus::new();
        for n in 0..8 {
            place(&mut ppu, n, 50, 0, 0, 0);
        }
        // Sprite 9 is off this line, but its tile byte is read as Y and matches.
        place(&mut ppu, 9, 0xF0, 50, 0, 0);
        eval_line(&mut ppu, &mut bus, 50);
        assert_eq!(ppu.sprite_count, 8);
        assert!(ppu.sprite_overflow());
    }

    #[test]
    fn fetch_applies_flips_and_empty_slots_use_tile_ff() {
        let mut ppu = ppu_with_hidden_sprites();
        let mut bus = MockPpuBus::new();
        ppu.ctrl = PpuCtrl::SPRITE_TABLE;
        bus.set_tile(0x1000, 0x01, [0x80, 0, 0, 0, 0, 0, 0, 0x01], [0; 8]);
        place(&mut ppu, 0, 20, 0x01, 0xC0, 7); // both flips
        eval_line(&mut ppu, &mut bus, 20);
        // Row 0 with V flip reads row 7 (0x01); H flip turns it into 0x80.
        assert_eq!(ppu.sprites[0].pattern_lo, 0x80);
        assert_eq!(ppu.sprites[0].x_counter, 7);
        assert_eq!(ppu.sprites[1].pattern_lo, 0);
        assert!(bus.reads.iter().any(|&a| (0x1FF0..0x2000).contains(&a)));
    }

    #[test]
    fn tall_sprites_pick_table_from_tile_bit() {
        let mut ppu = ppu_with_hidden_sprites();
        let mut bus = MockPpuBus::new();
        ppu.ctrl = PpuCtrl::SPRITE_SIZE_16;
        bus.set_tile(0x1000, 0x04, [0; 8], [0; 8]);
        bus.set_tile(0x1000, 0x05, [0xAA; 8], [0; 8]);
        place(&mut ppu, 0, 100, 0x05, 0x00, 0);
        eval_line(&mut ppu, &mut bus, 110); // row 10 -> bottom tile
        assert_eq!(ppu.sprite_count, 1);
        assert_eq!(ppu.sprites[0].pattern_lo, 0xAA);
    }
}
