/*!
PPU (2C02) providing:
- CPU-visible register interface ($2000..$2007, mirrored through $3FFF)
- Dot-stepped raster over 262 scanlines x 341 dots with the odd-frame skip
- Background shift-register pipeline driven by the loopy v/t/x/w registers
- Per-scanline two-phase sprite evaluation (overflow bug included), sprite
  pattern fetches, and per-dot sprite shifters
- Pixel composition with priority and sprite-0 hit into a 256x240 buffer of
  6-bit colour indices
- VBlank / NMI signalling and a frame-complete event

STRUCTURE:
- `registers.rs` — PPUCTRL/PPUMASK/PPUSTATUS bit layouts and register semantics
- `scroll.rs`    — `VramAddr`, the 15-bit loopy scroll/address register
- `palette.rs`   — palette RAM with its mirrors, master RGB palette
- `fetch.rs`     — background fetch cycle and shifters
- `oam_eval.rs`  — secondary OAM clear/evaluate and sprite pattern fetch
- `sprite.rs`    — sprite shift registers and per-dot sprite pixel output
- `renderer.rs`  — `tick`: raster timing, orchestration, composition
*/

use self::palette::PaletteRam;
use self::registers::{PpuCtrl, PpuMask, PpuStatus};
use self::scroll::VramAddr;

pub(crate) mod fetch;
pub(crate) mod oam_eval;
pub mod palette;
pub mod registers;
pub(crate) mod renderer;
pub mod scroll;
pub(crate) mod sprite;

/// Screen width in pixels.
pub const NES_WIDTH: usize = 256;
/// Screen height in pixels.
pub const NES_HEIGHT: usize = 240;

/// Dots per scanline (0..=340).
pub const DOTS_PER_SCANLINE: u16 = 341;
/// Scanlines per frame (0..=261).
pub const SCANLINES_PER_FRAME: u16 = 262;
/// First scanline of vertical blank.
pub const VBLANK_SCANLINE: u16 = 241;
/// Pre-render scanline index.
pub const PRE_RENDER_SCANLINE: u16 = 261;

/// Latched background tile data for the tile after the one being shifted out.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BackgroundLatch {
    pub(crate) tile: u8,
    pub(crate) attr: u8,
    pub(crate) pattern_lo: u8,
    pub(crate) pattern_hi: u8,
}

/// Background shifters: high byte is the tile under the beam, low byte the next one.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BackgroundShifters {
    pub(crate) pattern_lo: u16,
    pub(crate) pattern_hi: u16,
    pub(crate) attr_lo: u16,
    pub(crate) attr_hi: u16,
}

/// Per-slot sprite output unit for the scanline being drawn.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SpriteSlot {
    pub(crate) pattern_lo: u8,
    pub(crate) pattern_hi: u8,
    pub(crate) attr: u8,
    pub(crate) x_counter: u8,
}

/// Secondary-OAM evaluation cursor (n = sprite, m = byte within sprite).
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SpriteEval {
    pub(crate) n: u8,
    pub(crate) m: u8,
    pub(crate) found: u8,
    pub(crate) latch: u8,
    pub(crate) copying: bool,
    pub(crate) done: bool,
    pub(crate) sprite_zero_found: bool,
}

pub struct Ppu {
    // CPU-visible registers
    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    oam_addr: u8,

    // Loopy scroll registers
    v: VramAddr,
    t: VramAddr,
    fine_x: u8,
    w: bool,

    // PPUDATA read buffer and the CPU data-bus latch
    read_buffer: u8,
    io_latch: u8,

    palette: PaletteRam,
    oam: [u8; 256],
    secondary_oam: [u8; 32],

    // Raster
    scanline: u16,
    dot: u16,
    odd_frame: bool,
    frame_count: u64,

    // Background pipeline
    bg_latch: BackgroundLatch,
    bg_shift: BackgroundShifters,

    // Sprite pipeline
    eval: SpriteEval,
    sprites: [SpriteSlot; 8],
    sprite_count: u8,
    sprite_zero_in_line: bool,

    // Output
    frame: Vec<u8>,
    frame_complete: bool,
    nmi_request: bool,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ppu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ppu")
            .field("ctrl", &self.ctrl)
            .field("mask", &self.mask)
            .field("status", &self.status)
            .field("v", &self.v)
            .field("t", &self.t)
            .field("fine_x", &self.fine_x)
            .field("scanline", &self.scanline)
            .field("dot", &self.dot)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr: 0,
            v: VramAddr::default(),
            t: VramAddr::default(),
            fine_x: 0,
            w: false,
            read_buffer: 0,
            io_latch: 0,
            palette: PaletteRam::new(),
            oam: [0; 256],
            secondary_oam: [0xFF; 32],
            scanline: PRE_RENDER_SCANLINE,
            dot: 0,
            odd_frame: false,
            frame_count: 0,
            bg_latch: BackgroundLatch::default(),
            bg_shift: BackgroundShifters::default(),
            eval: SpriteEval::default(),
            sprites: [SpriteSlot::default(); 8],
            sprite_count: 0,
            sprite_zero_in_line: false,
            frame: vec![0; NES_WIDTH * NES_HEIGHT],
            frame_complete: false,
            nmi_request: false,
        }
    }

    /// Reset raster position, registers, and pending events. OAM and palette
    /// contents survive, as they do on hardware.
    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.oam_addr = 0;
        self.v = VramAddr::default();
        self.t = VramAddr::default();
        self.fine_x = 0;
        self.w = false;
        self.read_buffer = 0;
        self.io_latch = 0;
        self.scanline = PRE_RENDER_SCANLINE;
        self.dot = 0;
        self.odd_frame = false;
        self.bg_latch = BackgroundLatch::default();
        self.bg_shift = BackgroundShifters::default();
        self.eval = SpriteEval::default();
        self.sprites = [SpriteSlot::default(); 8];
        self.sprite_count = 0;
        self.sprite_zero_in_line = false;
        self.frame_complete = false;
        self.nmi_request = false;
    }

    /// Drop state that depends on the inserted cartridge.
    pub fn clear_cartridge_state(&mut self) {
        self.read_buffer = 0;
        self.bg_latch = BackgroundLatch::default();
        self.bg_shift = BackgroundShifters::default();
        self.sprites = [SpriteSlot::default(); 8];
        self.sprite_count = 0;
    }

    /// Finished (or in-progress) frame as 6-bit colour indices, row-major.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    // Raster position
    pub fn scanline(&self) -> u16 {
        self.scanline
    }
    pub fn dot(&self) -> u16 {
        self.dot
    }
    pub fn odd_frame(&self) -> bool {
        self.odd_frame
    }
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    // Flag queries
    pub fn vblank(&self) -> bool {
        self.status.contains(PpuStatus::VBLANK)
    }
    pub fn sprite_zero_hit(&self) -> bool {
        self.status.contains(PpuStatus::SPRITE_ZERO_HIT)
    }
    pub fn sprite_overflow(&self) -> bool {
        self.status.contains(PpuStatus::SPRITE_OVERFLOW)
    }
    pub fn ctrl(&self) -> PpuCtrl {
        self.ctrl
    }
    pub fn mask(&self) -> PpuMask {
        self.mask
    }
    pub fn vram_addr(&self) -> u16 {
        self.v.get()
    }
    pub fn temp_addr(&self) -> u16 {
        self.t.get()
    }
    pub fn fine_x(&self) -> u8 {
        self.fine_x
    }
    pub fn write_toggle(&self) -> bool {
        self.w
    }

    // OAM convenience
    pub fn peek_oam(&self, idx: usize) -> u8 {
        self.oam[idx & 0xFF]
    }
    pub fn poke_oam(&mut self, idx: usize, value: u8) {
        self.oam[idx & 0xFF] = value;
    }

    /// Palette RAM read with mirroring applied.
    pub fn peek_palette(&self, addr: u16) -> u8 {
        self.palette.read(addr)
    }

    /// OAMDATA write as performed by OAM DMA.
    pub fn write_oam_data(&mut self, value: u8) {
        self.oam[self.oam_addr as usize] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    // Frame completion & NMI latch
    pub fn frame_complete(&self) -> bool {
        self.frame_complete
    }
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }
    pub fn take_nmi_request(&mut self) -> bool {
        std::mem::take(&mut self.nmi_request)
    }

    #[inline]
    pub(crate) fn rendering_enabled(&self) -> bool {
        self.mask.rendering_enabled()
    }
}
