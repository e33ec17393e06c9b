/*!
Standard controller: 8 buttons behind a strobe-latched shift register.

Behavior:
- Buttons are read out in the order A, B, Select, Start, Up, Down, Left, Right
  (bit 0 through bit 7 of `Buttons`).
- Writing to $4016 sets the strobe from bit 0. While strobe is high the pad
  keeps reloading and every read returns the A button.
- With strobe low, each read shifts out the next latched bit. After eight
  reads the register returns 1.
*/

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Buttons: u8 {
        const A      = 1 << 0;
        const B      = 1 << 1;
        const SELECT = 1 << 2;
        const START  = 1 << 3;
        const UP     = 1 << 4;
        const DOWN   = 1 << 5;
        const LEFT   = 1 << 6;
        const RIGHT  = 1 << 7;
    }
}

#[derive(Clone, Debug, Default)]
pub struct Controller {
    buttons: Buttons,
    shift: u8,
    strobe: bool,
    index: u8,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_buttons(&mut self, buttons: Buttons) {
        self.buttons = buttons;
    }

    pub fn set_button(&mut self, button: Buttons, pressed: bool) {
        self.buttons.set(button, pressed);
    }

    pub fn buttons(&self) -> Buttons {
        self.buttons
    }

    /// $4016 write. Only bit 0 matters.
    pub fn write_strobe(&mut self, value: u8) {
        self.strobe = value & 1 != 0;
        if self.strobe {
            self.latch();
        }
    }

    /// $4016/$4017 read; only bit 0 is meaningful.
    pub fn read_serial(&mut self) -> u8 {
        if self.strobe {
            self.latch();
            return self.shift & 1;
        }
        if self.index >= 8 {
            return 1;
        }
        let bit = (self.shift >> self.index) & 1;
        self.index += 1;
        bit
    }

    /// Value the next `read_serial` would return, without shifting.
    pub fn peek_serial(&self) -> u8 {
        if self.strobe {
            self.buttons.bits() & 1
        } else if self.index >= 8 {
            1
        } else {
            (self.shift >> self.index) & 1
        }
    }

    fn latch(&mut self) {
        self.shift = self.buttons.bits();
        self.index = 0;
    }
}
