#![doc = r#"
PPU registers module

Purpose
- Bit layouts of PPUCTRL, PPUMASK, and PPUSTATUS.
- CPU-visible register semantics: the shared v/t/x/w scroll latch, buffered
  PPUDATA reads, OAM access, and the NMI edge raised by enabling NMI output
  while VBlank is already set.

Notes
- Addresses 0x2000..=0x3FFF mirror to the 8-byte window 0x2000..=0x2007.
- Every register write lands on the CPU data-bus latch; write-only registers
  read back that latch, and PPUSTATUS fills its low five bits from it.
- PPUDATA reaches pattern/nametable memory through `PpuBus`; palette RAM is
  served internally without the buffer delay.
"#]

use bitflags::bitflags;

use super::{PRE_RENDER_SCANLINE, Ppu};
use crate::ppu_bus::PpuBus;

bitflags! {
    /// PPUCTRL ($2000)
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PpuCtrl: u8 {
        const NAMETABLE_X      = 0b0000_0001;
        const NAMETABLE_Y      = 0b0000_0010;
        const INCREMENT_32     = 0b0000_0100;
        const SPRITE_TABLE     = 0b0000_1000;
        const BACKGROUND_TABLE = 0b0001_0000;
        const SPRITE_SIZE_16   = 0b0010_0000;
        const MASTER_SLAVE     = 0b0100_0000;
        const NMI_ENABLE       = 0b1000_0000;
    }
}

bitflags! {
    /// PPUMASK ($2001)
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PpuMask: u8 {
        const GRAYSCALE        = 0b0000_0001;
        const SHOW_BG_LEFT     = 0b0000_0010;
        const SHOW_SPRITES_LEFT = 0b0000_0100;
        const SHOW_BG          = 0b0000_1000;
        const SHOW_SPRITES     = 0b0001_0000;
        const EMPHASIZE_RED    = 0b0010_0000;
        const EMPHASIZE_GREEN  = 0b0100_0000;
        const EMPHASIZE_BLUE   = 0b1000_0000;
    }
}

bitflags! {
    /// PPUSTATUS ($2002), upper three bits only.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PpuStatus: u8 {
        const SPRITE_OVERFLOW = 0b0010_0000;
        const SPRITE_ZERO_HIT = 0b0100_0000;
        const VBLANK          = 0b1000_0000;
    }
}

impl PpuCtrl {
    pub fn vram_increment(self) -> u16 {
        if self.contains(Self::INCREMENT_32) { 32 } else { 1 }
    }

    pub fn sprite_table(self) -> u16 {
        if self.contains(Self::SPRITE_TABLE) { 0x1000 } else { 0 }
    }

    pub fn background_table(self) -> u16 {
        if self.contains(Self::BACKGROUND_TABLE) { 0x1000 } else { 0 }
    }

    pub fn sprite_height(self) -> u16 {
        if self.contains(Self::SPRITE_SIZE_16) { 16 } else { 8 }
    }
}

impl PpuMask {
    pub fn rendering_enabled(self) -> bool {
        self.intersects(Self::SHOW_BG | Self::SHOW_SPRITES)
    }
}

impl Ppu {
    /// CPU-visible register read ($2000..$3FFF) with side effects.
    pub fn read_register<B: PpuBus>(&mut self, addr: u16, bus: &mut B) -> u8 {
        let value = match addr & 0x7 {
            2 => {
                let v = self.status.bits() | (self.io_latch & 0x1F);
                self.status.remove(PpuStatus::VBLANK);
                self.w = false;
                v
            }
            4 => self.oam[self.oam_addr as usize],
            7 => self.read_data(bus),
            _ => self.io_latch,
        };
        self.io_latch = value;
        value
    }

    /// Side-effect-free register view for debuggers and `Bus::peek`.
    pub fn peek_register(&self, addr: u16) -> u8 {
        match addr & 0x7 {
            2 => self.status.bits() | (self.io_latch & 0x1F),
            4 => self.oam[self.oam_addr as usize],
            7 => {
                let a = self.v.get() & 0x3FFF;
                if a >= 0x3F00 {
                    self.palette.read(a)
                } else {
                    self.read_buffer
                }
            }
            _ => self.io_latch,
        }
    }

    /// CPU-visible register write ($2000..$3FFF).
    pub fn write_register<B: PpuBus>(&mut self, addr: u16, value: u8, bus: &mut B) {
        self.io_latch = value;
        match addr & 0x7 {
            0 => {
                let was_enabled = self.ctrl.contains(PpuCtrl::NMI_ENABLE);
                self.ctrl = PpuCtrl::from_bits_retain(value);
                self.t.set_nametable(value & 0x03);
                if !was_enabled
                    && self.ctrl.contains(PpuCtrl::NMI_ENABLE)
                    && self.status.contains(PpuStatus::VBLANK)
                {
                    self.nmi_request = true;
                }
            }
            1 => self.mask = PpuMask::from_bits_retain(value),
            2 => {}
            3 => self.oam_addr = value,
            4 => self.write_oam_data(value),
            5 => {
                if !self.w {
                    self.t.set_coarse_x(value >> 3);
                    self.fine_x = value & 0x07;
                } else {
                    self.t.set_fine_y(value & 0x07);
                    self.t.set_coarse_y(value >> 3);
                }
                self.w = !self.w;
            }
            6 => {
                if !self.w {
                    self.t.set((self.t.get() & 0x00FF) | (((value & 0x3F) as u16) << 8));
                } else {
                    self.t.set((self.t.get() & 0xFF00) | value as u16);
                    self.v = self.t;
                }
                self.w = !self.w;
            }
            _ => self.write_data(value, bus),
        }
    }

    fn read_data<B: PpuBus>(&mut self, bus: &mut B) -> u8 {
        let a = self.v.get() & 0x3FFF;
        let value = if a >= 0x3F00 {
            // Palette reads are immediate; the buffer picks up the nametable byte underneath.
            self.read_buffer = bus.ppu_read(a - 0x1000);
            self.palette.read(a) | (self.io_latch & 0xC0)
        } else {
            let out = self.read_buffer;
            self.read_buffer = bus.ppu_read(a);
            out
        };
        self.advance_vram_addr();
        value
    }

    fn write_data<B: PpuBus>(&mut self, value: u8, bus: &mut B) {
        let a = self.v.get() & 0x3FFF;
        if a >= 0x3F00 {
            self.palette.write(a, value);
        } else {
            bus.ppu_write(a, value);
        }
        self.advance_vram_addr();
    }

    /// Post-access VRAM address step. While rendering, the access glitches
    /// into a coarse-X plus Y increment of the scroll counters.
    fn advance_vram_addr(&mut self) {
        let on_render_line = self.scanline < 240 || self.scanline == PRE_RENDER_SCANLINE;
        if self.rendering_enabled() && on_render_line {
            self.v.increment_x();
            self.v.increment_y();
        } else {
            let next = self.v.get().wrapping_add(self.ctrl.vram_increment()) & 0x7FFF;
            self.v.set(next);
        }
    }
}
