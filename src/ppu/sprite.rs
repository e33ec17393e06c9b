//! Sprite output units: per-dot X countdown, shifting, and pixel selection.
//!
//! Each loaded slot waits `x_counter` dots, then shifts its (already
//! horizontally flipped) pattern out MSB first. Lower slot index wins.

use super::Ppu;

/// Opaque sprite pixel chosen for the current dot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SpritePixel {
    pub(crate) pixel: u8,
    pub(crate) palette: u8,
    pub(crate) behind_background: bool,
    pub(crate) slot: usize,
}

impl Ppu {
    pub(in crate::ppu) fn shift_sprites(&mut self) {
        let count = self.sprite_count as usize;
        for s in &mut self.sprites[..count] {
            if s.x_counter > 0 {
                s.x_counter -= 1;
            } else {
                s.pattern_lo <<= 1;
                s.pattern_hi <<= 1;
            }
        }
    }

    pub(in crate::ppu) fn sprite_pixel(&self) -> Option<SpritePixel> {
        let count = self.sprite_count as usize;
        self.sprites[..count]
            .iter()
            .enumerate()
            .filter(|(_, s)| s.x_counter == 0)
            .find_map(|(slot, s)| {
                let pixel = ((s.pattern_hi >> 7) << 1) | (s.pattern_lo >> 7);
                (pixel != 0).then_some(SpritePixel {
                    pixel,
                    palette: s.attr & 0x03,
                    behind_background: s.attr & 0x20 != 0,
                    slot,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppu::SpriteSlot;

    #[test]
    fn countdown_then_shift() {
        let mut ppu = Ppu::new();
        ppu.sprite_count = 1;
        ppu.sprites[0] = SpriteSlot {
            pattern_lo: 0x80,
            pattern_hi: 0x00,
            attr: 0x02,
            x_counter: 2,
        };
        assert_eq!(ppu.sprite_pixel(), None);
        ppu.shift_sprites();
        ppu.shift_sprites();
        let px = ppu.sprite_pixel().map(|p| (p.pixel, p.palette));
        assert_eq!(px, Some((1, 2)));
        ppu.shift_sprites();
        assert_eq!(ppu.sprite_pixel(), None);
    }

    #[test]
    fn lower_slot_wins_and_transparent_falls_through() {
        let mut ppu = Ppu::new();
        ppu.sprite_count = 3;
        ppu.sprites[0] = SpriteSlot { pattern_lo: 0x00, pattern_hi: 0x00, attr: 0, x_counter: 0 };
        ppu.sprites[1] = SpriteSlot {
            pattern_lo: 0x00,
            pattern_hi: 0x80,
            attr: 0x21,
            x_counter: 0,
        };
        ppu.sprites[2] = SpriteSlot {
            pattern_lo: 0x80,
            pattern_hi: 0x80,
            attr: 0x03,
            x_counter: 0,
        };
        let p = ppu.sprite_pixel();
        assert_eq!(
            p,
            Some(SpritePixel { pixel: 2, palette: 1, behind_background: true, slot: 1 })
        );
    }

    #[test]
    fn slots_beyond_count_are_ignored() {
        let mut ppu = Ppu::new();
        ppu.sprite_count = 0;
        ppu.sprites[0] = SpriteSlot { pattern_lo: 0xFF, pattern_hi: 0xFF, attr: 0, x_counter: 0 };
        assert_eq!(ppu.sprite_pixel(), None);
    }
}
