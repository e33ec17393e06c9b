#![doc = r#"
PPU renderer module

Responsibilities
- Hosts `Ppu::tick`, the one-dot entry point (called 3x per CPU cycle).
- Runs background and sprite pipelines on visible and pre-render lines while
  rendering is enabled.
- Composes one pixel per visible dot (1..=256) with priority and sprite-0 hit.
- Raises VBlank/NMI and frame-complete at (241, 1); clears flags at (261, 1).
- Advances the raster, skipping pre-render dot 340 on odd frames when
  rendering is enabled.
"#]

use tracing::trace;

use super::registers::{PpuMask, PpuStatus};
use super::*;
use crate::ppu::registers::PpuCtrl;
use crate::ppu_bus::PpuBus;

impl Ppu {
    /// Advance one PPU dot.
    pub fn tick<B: PpuBus>(&mut self, bus: &mut B) {
        let visible = self.scanline < NES_HEIGHT as u16;
        let pre_render = self.scanline == PRE_RENDER_SCANLINE;
        let rendering = self.rendering_enabled();

        if visible || pre_render {
            if pre_render && self.dot == 1 {
                self.status.remove(
                    PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT | PpuStatus::SPRITE_OVERFLOW,
                );
            }
            if rendering {
                self.background_step(bus, pre_render);
                self.sprite_step(bus, visible);
                if (2..=257).contains(&self.dot) && self.mask.contains(PpuMask::SHOW_SPRITES) {
                    self.shift_sprites();
                }
            }
            if visible && (1..=NES_WIDTH as u16).contains(&self.dot) {
                self.compose_pixel();
            }
        }

        if self.scanline == VBLANK_SCANLINE && self.dot == 1 {
            self.status.insert(PpuStatus::VBLANK);
            if self.ctrl.contains(PpuCtrl::NMI_ENABLE) {
                self.nmi_request = true;
            }
            self.frame_complete = true;
            trace!(frame = self.frame_count, "vblank start");
        }

        self.advance_raster(rendering);
    }

    fn advance_raster(&mut self, rendering: bool) {
        self.dot += 1;
        if self.scanline == PRE_RENDER_SCANLINE && self.dot == 340 && self.odd_frame && rendering {
            self.dot = DOTS_PER_SCANLINE;
        }
        if self.dot >= DOTS_PER_SCANLINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline >= SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.odd_frame = !self.odd_frame;
                self.frame_count += 1;
            }
        }
    }

    fn compose_pixel(&mut self) {
        let x = (self.dot - 1) as usize;
        let y = self.scanline as usize;
        let left = x < 8;

        let (bg, bg_palette) = if self.mask.contains(PpuMask::SHOW_BG)
            && (!left || self.mask.contains(PpuMask::SHOW_BG_LEFT))
        {
            self.background_pixel()
        } else {
            (0, 0)
        };
        let sprite = if self.mask.contains(PpuMask::SHOW_SPRITES)
            && (!left || self.mask.contains(PpuMask::SHOW_SPRITES_LEFT))
        {
            self.sprite_pixel()
        } else {
            None
        };

        let bg_index = 0x3F00 + ((bg_palette as u16) << 2) + bg as u16;
        let index = match sprite {
            None if bg == 0 => 0x3F00,
            None => bg_index,
            Some(s) => {
                let sp_index = 0x3F10 + ((s.palette as u16) << 2) + s.pixel as u16;
                if bg == 0 {
                    sp_index
                } else {
                    if s.slot == 0 && self.sprite_zero_in_line && self.dot >= 3 && x != 255 {
                        self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
                    }
                    if s.behind_background { bg_index } else { sp_index }
                }
            }
        };

        let mut color = self.palette.read(index);
        if self.mask.contains(PpuMask::GRAYSCALE) {
            color &= 0x30;
        }
        self.frame[y * NES_WIDTH + x] = color;
    }
}
