//! Loopy scroll/address register.
//!
//! Layout (15 bits): `yyy NN YYYYY XXXXX`
//! fine Y (12-14), nametable select (10-11), coarse Y (5-9), coarse X (0-4).

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VramAddr(u16);

impl VramAddr {
    pub fn new(raw: u16) -> Self {
        Self(raw & 0x7FFF)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn set(&mut self, raw: u16) {
        self.0 = raw & 0x7FFF;
    }

    pub fn coarse_x(self) -> u16 {
        self.0 & 0x001F
    }

    pub fn coarse_y(self) -> u16 {
        (self.0 >> 5) & 0x001F
    }

    pub fn nametable(self) -> u16 {
        (self.0 >> 10) & 0x0003
    }

    pub fn fine_y(self) -> u16 {
        (self.0 >> 12) & 0x0007
    }

    pub fn set_coarse_x(&mut self, value: u8) {
        self.0 = (self.0 & !0x001F) | (value as u16 & 0x1F);
    }

    pub fn set_coarse_y(&mut self, value: u8) {
        self.0 = (self.0 & !0x03E0) | ((value as u16 & 0x1F) << 5);
    }

    pub fn set_nametable(&mut self, value: u8) {
        self.0 = (self.0 & !0x0C00) | ((value as u16 & 0x03) << 10);
    }

    pub fn set_fine_y(&mut self, value: u8) {
        self.0 = (self.0 & !0x7000) | ((value as u16 & 0x07) << 12);
    }

    /// Step coarse X, wrapping into the horizontally adjacent nametable.
    pub fn increment_x(&mut self) {
        if self.coarse_x() == 31 {
            self.0 &= !0x001F;
            self.0 ^= 0x0400;
        } else {
            self.0 += 1;
        }
    }

    /// Step fine Y, carrying into coarse Y. Row 29 wraps into the vertically
    /// adjacent nametable; rows 30/31 (attribute area) wrap without switching.
    pub fn increment_y(&mut self) {
        if self.fine_y() < 7 {
            self.0 += 0x1000;
            return;
        }
        self.0 &= !0x7000;
        let y = match self.coarse_y() {
            29 => {
                self.0 ^= 0x0800;
                0
            }
            31 => 0,
            y => y + 1,
        };
        self.0 = (self.0 & !0x03E0) | (y << 5);
    }

    pub fn copy_horizontal(&mut self, from: VramAddr) {
        self.0 = (self.0 & !0x041F) | (from.0 & 0x041F);
    }

    pub fn copy_vertical(&mut self, from: VramAddr) {
        self.0 = (self.0 & !0x7BE0) | (from.0 & 0x7BE0);
    }

    pub fn tile_address(self) -> u16 {
        0x2000 | (self.0 & 0x0FFF)
    }

    pub fn attribute_address(self) -> u16 {
        0x23C0 | (self.0 & 0x0C00) | ((self.0 >> 4) & 0x38) | ((self.0 >> 2) & 0x07)
    }

    /// Shift selecting this tile's 2-bit quadrant within its attribute byte.
    pub fn attribute_shift(self) -> u8 {
        (((self.coarse_y() & 0x02) << 1) | (self.coarse_x() & 0x02)) as u8
    }
}
