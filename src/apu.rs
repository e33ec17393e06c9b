/*!
APU register sink.

Scope:
- Latches CPU writes to $4000..=$4013, $4015, and $4017 so the bus has a real
  device behind the audio window.
- Reading $4015 returns the channel enable bits from the last $4015 write.
- No synthesis, no frame sequencer, no IRQ.
- $4014 (OAM DMA) and $4016 (controller strobe) never reach this type.
*/

use tracing::trace;

#[derive(Clone, Debug, Default)]
pub struct Apu {
    regs: [u8; 0x14],
    enabled: u8,
    frame_counter: u8,
}

impl Apu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns true if the address belongs to the APU.
    pub fn write_register(&mut self, addr: u16, value: u8) -> bool {
        match addr {
            0x4000..=0x4013 => self.regs[(addr - 0x4000) as usize] = value,
            0x4015 => self.enabled = value & 0x1F,
            0x4017 => self.frame_counter = value,
            _ => return false,
        }
        trace!(
            addr = format_args!("{addr:#06X}"),
            value = format_args!("{value:#04X}"),
            "apu write"
        );
        true
    }

    /// $4015 status read.
    pub fn read_status(&self) -> u8 {
        self.enabled
    }

    pub fn register(&self, addr: u16) -> Option<u8> {
        match addr {
            0x4000..=0x4013 => Some(self.regs[(addr - 0x4000) as usize]),
            0x4015 => Some(self.enabled),
            0x4017 => Some(self.frame_counter),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latches_channel_registers() {
        let mut apu = Apu::new();
        assert!(apu.write_register(0x4000, 0xBF));
        assert!(apu.write_register(0x4013, 0x12));
        assert_eq!(apu.register(0x4000), Some(0xBF));
        assert_eq!(apu.register(0x4013), Some(0x12));
    }

    #[test]
    fn status_reflects_enable_bits() {
        let mut apu = Apu::new();
        apu.write_register(0x4015, 0xFF);
        assert_eq!(apu.read_status(), 0x1F);
        apu.reset();
        assert_eq!(apu.read_status(), 0);
    }

    #[test]
    fn foreign_addresses_are_declined() {
        let mut apu = Apu::new();
        assert!(!apu.write_register(0x4014, 0x02));
        assert!(!apu.write_register(0x4016, 0x01));
        assert_eq!(apu.register(0x4016), None);
        assert!(apu.write_register(0x4017, 0x40));
        assert_eq!(apu.register(0x4017), Some(0x40));
    }
}
