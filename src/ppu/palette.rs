/*!
Palette RAM and colour output.

- `PaletteRam`: 32 bytes at $3F00-$3F1F, mirrored through $3FFF. Entry 0
  of every background and sprite palette ($3F04, $3F08, ..., $3F1C) aliases
  the universal backdrop at $3F00.
- `MASTER_PALETTE`: 64-entry 2C02 colour table (RGB).
- `frame_to_rgb` expands a 6-bit index frame into packed RGB24.
- `save_png` (feature `screenshot`) writes such a frame with the `image` crate.
*/

use super::{NES_HEIGHT, NES_WIDTH};

#[derive(Clone, Debug)]
pub struct PaletteRam {
    data: [u8; 32],
}

impl Default for PaletteRam {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteRam {
    pub fn new() -> Self {
        Self { data: [0; 32] }
    }

    /// Fold any $3F00-$3FFF address onto its backing entry.
    #[inline]
    pub fn index(addr: u16) -> usize {
        let i = (addr & 0x1F) as usize;
        if i & 0x03 == 0 { 0 } else { i }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.data[Self::index(addr)] & 0x3F
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.data[Self::index(addr)] = value & 0x3F;
    }
}

/// 2C02 master palette, indexed by 6-bit colour.
pub const MASTER_PALETTE: [(u8, u8, u8); 64] = [
    (84, 84, 84), (0, 30, 116), (8, 16, 144), (48, 0, 136),
    (68, 0, 100), (92, 0, 48), (84, 4, 0), (60, 24, 0),
    (32, 42, 0), (8, 58, 0), (0, 64, 0), (0, 60, 0),
    (0, 50, 60), (0, 0, 0), (0, 0, 0), (0, 0, 0),
    (152, 150, 152), (8, 76, 196), (48, 50, 236), (92, 30, 228),
    (136, 20, 176), (160, 20, 100), (152, 34, 32), (120, 60, 0),
    (84, 90, 0), (40, 114, 0), (8, 124, 0), (0, 118, 40),
    (0, 102, 120), (0, 0, 0), (0, 0, 0), (0, 0, 0),
    (236, 238, 236), (76, 154, 236), (120, 124, 236), (176, 98, 236),
    (228, 84, 236), (236, 88, 180), (236, 106, 100), (212, 136, 32),
    (160, 170, 0), (116, 196, 0), (76, 208, 32), (56, 204, 108),
    (56, 180, 204), (60, 60, 60), (0, 0, 0), (0, 0, 0),
    (236, 238, 236), (168, 204, 236), (188, 188, 236), (212, 178, 236),
    (236, 174, 236), (236, 174, 212), (236, 180, 176), (228, 196, 144),
    (204, 210, 120), (180, 222, 120), (168, 226, 144), (152, 226, 180),
    (160, 214, 228), (160, 162, 160), (0, 0, 0), (0, 0, 0),
];

/// Expand a frame of colour indices into RGB24 (3 bytes per pixel).
pub fn frame_to_rgb(frame: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.len() * 3);
    for &idx in frame {
        let (r, g, b) = MASTER_PALETTE[(idx & 0x3F) as usize];
        out.extend_from_slice(&[r, g, b]);
    }
    out
}

/// Write a 256x240 index frame to `path` as PNG.
#[cfg(feature = "screenshot")]
pub fn save_png<P: AsRef<std::path::Path>>(
    frame: &[u8],
    path: P,
) -> Result<(), image::ImageError> {
    let rgb = frame_to_rgb(frame);
    let img =
        image::RgbImage::from_raw(NES_WIDTH as u32, NES_HEIGHT as u32, rgb).ok_or_else(|| {
            image::ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ))
        })?;
    img.save(path)
}

/// Pixel count of one frame; handy for consumers sizing RGB buffers.
pub const FRAME_PIXELS: usize = NES_WIDTH * NES_HEIGHT;

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY_ZERO: [u16; 8] = [
        0x3F00, 0x3F04, 0x3F08, 0x3F0C, 0x3F10, 0x3F14, 0x3F18, 0x3F1C,
    ];

    #[test]
    fn backdrop_write_reaches_every_entry_zero() {
        let mut pal = PaletteRam::new();
        pal.write(0x3F00, 0x2A);
        for addr in ENTRY_ZERO {
            assert_eq!(pal.read(addr), 0x2A, "{addr:#06X}");
        }
        assert_eq!(pal.read(0x3F20), 0x2A);
        assert_eq!(pal.read(0x3FF0), 0x2A);
    }

    #[test]
    fn entry_zero_mirror_write_updates_backdrop() {
        let mut pal = PaletteRam::new();
        pal.write(0x3F14, 0x11);
        for addr in ENTRY_ZERO {
            assert_eq!(pal.read(addr), 0x11, "{addr:#06X}");
        }
        pal.write(0x3F0C, 0x05);
        assert_eq!(pal.read(0x3F00), 0x05);
        assert_eq!(pal.read(0x3F1C), 0x05);
    }

    #[test]
    fn non_backdrop_sprite_entries_are_distinct() {
        let mut pal = PaletteRam::new();
        pal.write(0x3F11, 0x30);
        pal.write(0x3F01, 0x0F);
        assert_eq!(pal.read(0x3F11), 0x30);
        assert_eq!(pal.read(0x3F01), 0x0F);
    }

    #[test]
    fn whole_window_mirrors_every_32_bytes() {
        let mut pal = PaletteRam::new();
        pal.write(0x3F03, 0x2C);
        assert_eq!(pal.read(0x3F23), 0x2C);
        assert_eq!(pal.read(0x3FE3), 0x2C);
    }

    #[test]
    fn writes_keep_six_bits() {
        let mut pal = PaletteRam::new();
        pal.write(0x3F02, 0xFF);
        assert_eq!(pal.read(0x3F02), 0x3F);
    }

    #[test]
    fn rgb_expansion_uses_master_palette() {
        let rgb = frame_to_rgb(&[0x00, 0x30]);
        assert_eq!(rgb, vec![84, 84, 84, 236, 238, 236]);
        assert_eq!(FRAME_PIXELS, 61_440);
    }
}
