#![doc = r#"
PPU background fetch module

Responsibilities
- Per-dot background fetch cycle: nametable byte, attribute byte, pattern
  low/high planes, each on its own dot of an 8-dot group.
- Shifter reload every 8 dots and the one-bit-per-dot shift.
- Scroll counter maintenance: coarse X at the end of each group, Y at dot 256,
  horizontal copy at dot 257, vertical copy on the pre-render line.
- Background pixel output through the fine-X multiplexer.

Timing (visible and pre-render lines with rendering enabled)
- Shift on dots 2..=257 and 322..=337.
- Within each group, (dot - 1) % 8: 0 reload + NT, 2 AT, 4 pattern low,
  6 pattern high, 7 coarse X increment.
- Dots 338 and 340 perform the trailing dummy nametable fetches.
"#]

use super::Ppu;
use crate::ppu_bus::PpuBus;

impl Ppu {
    /// One dot of background pipeline work.
    pub(in crate::ppu) fn background_step<B: PpuBus>(&mut self, bus: &mut B, pre_render: bool) {
        let dot = self.dot;

        if (2..=257).contains(&dot) || (321..=337).contains(&dot) {
            if self.mask.contains(super::registers::PpuMask::SHOW_BG) {
                self.shift_background();
            }
            match (dot - 1) % 8 {
                0 => {
                    self.load_background_shifters();
                    self.bg_latch.tile = bus.ppu_read(self.v.tile_address());
                }
                2 => {
                    let at = bus.ppu_read(self.v.attribute_address());
                    self.bg_latch.attr = (at >> self.v.attribute_shift()) & 0x03;
                }
                4 => {
                    let addr = self.background_pattern_address();
                    self.bg_latch.pattern_lo = bus.ppu_read(addr);
                }
                6 => {
                    let addr = self.background_pattern_address() + 8;
                    self.bg_latch.pattern_hi = bus.ppu_read(addr);
                }
                7 => self.v.increment_x(),
                _ => {}
            }
        }

        match dot {
            256 => self.v.increment_y(),
            257 => self.v.copy_horizontal(self.t),
            338 | 340 => {
                self.bg_latch.tile = bus.ppu_read(self.v.tile_address());
            }
            280..=304 if pre_render => self.v.copy_vertical(self.t),
            _ => {}
        }
    }

    fn background_pattern_address(&self) -> u16 {
        self.ctrl.background_table() + ((self.bg_latch.tile as u16) << 4) + self.v.fine_y()
    }

    fn load_background_shifters(&mut self) {
        let s = &mut self.bg_shift;
        s.pattern_lo = (s.pattern_lo & 0xFF00) | self.bg_latch.pattern_lo as u16;
        s.pattern_hi = (s.pattern_hi & 0xFF00) | self.bg_latch.pattern_hi as u16;
        let a = self.bg_latch.attr;
        s.attr_lo = (s.attr_lo & 0xFF00) | if a & 0x01 != 0 { 0x00FF } else { 0 };
        s.attr_hi = (s.attr_hi & 0xFF00) | if a & 0x02 != 0 { 0x00FF } else { 0 };
    }

    fn shift_background(&mut self) {
        let s = &mut self.bg_shift;
        s.pattern_lo <<= 1;
        s.pattern_hi <<= 1;
        s.attr_lo <<= 1;
        s.attr_hi <<= 1;
    }

    /// Background (pixel, palette) at the current dot; pixel 0 is transparent.
    pub(in crate::ppu) fn background_pixel(&self) -> (u8, u8) {
        let mux = 0x8000u16 >> self.fine_x;
        let s = &self.bg_shift;
        let bit = |reg: u16| u8::from(reg & mux != 0);
        let pixel = (bit(s.pattern_hi) << 1) | bit(s.pattern_lo);
        let palette = (bit(s.attr_hi) << 1) | bit(s.attr_lo);
        (pixel, palette)
    }
}
