/*!
MMC3 (Mapper 4)

Implemented:
- Bank select ($8000 even) / bank data ($8001 odd) registers R0..R7
- PRG banking modes (bit 6): two switchable 8K banks, second-last bank fixed at
  $8000 or $C000, last bank fixed at $E000
- CHR banking (two 2K + four 1K windows) with A12 inversion (bit 7)
- Runtime mirroring ($A000 even), ignored on four-screen boards
- PRG RAM enable / write protect ($A001 odd)
- Scanline IRQ: latch ($C000), reload ($C001), disable+acknowledge ($E000),
  enable ($E001). The counter is clocked by a rising edge of PPU A12 that
  follows at least three consecutive low samples of the PPU address bus.

Not modelled:
- MMC6 variants and the MMC3A/old-style "alternate" IRQ behaviour
*/

use tracing::{debug, trace};

use crate::mapper::{
    Chr, Mapper, Mirroring, OPEN_BUS_SENTINEL, PrgRam, banked_index, unmapped_read,
    unmapped_write,
};

const PRG_BANK: usize = 0x2000;
const CHR_BANK: usize = 0x0400;

/// Low samples required before an A12 rise counts as a scanline edge.
const A12_LOW_SAMPLES: u8 = 3;

#[derive(Debug, Clone)]
pub struct Mmc3 {
    prg_rom: Vec<u8>,
    prg_ram: PrgRam,
    chr: Chr,

    // Bank registers R0..R7 and the last bank-select write
    bank_regs: [u8; 8],
    bank_select: u8,

    prg_8k_count: usize,

    // IRQ unit
    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,
    a12_low_samples: u8,

    four_screen: bool,
    mirroring: Mirroring,
    prg_ram_enabled: bool,
    prg_ram_write_protect: bool,
}

impl Mmc3 {
    pub fn new(
        prg_rom: Vec<u8>,
        chr: Vec<u8>,
        chr_is_ram: bool,
        prg_ram_size: usize,
        header_mirroring: Mirroring,
    ) -> Self {
        let prg_8k_count = (prg_rom.len() / PRG_BANK).max(2);
        Self {
            prg_rom,
            prg_ram: PrgRam::new(prg_ram_size),
            chr: Chr::new(chr, chr_is_ram),
            bank_regs: [0; 8],
            bank_select: 0,
            prg_8k_count,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
            a12_low_samples: 0,
            four_screen: header_mirroring == Mirroring::FourScreen,
            mirroring: header_mirroring,
            prg_ram_enabled: true,
            prg_ram_write_protect: false,
        }
    }

    #[inline]
    fn prg_swap_mode(&self) -> bool {
        self.bank_select & 0x40 != 0
    }

    #[inline]
    fn chr_inverted(&self) -> bool {
        self.bank_select & 0x80 != 0
    }

    /// 8 KiB PRG bank visible at `addr` ($8000..=$FFFF).
    fn prg_bank_for(&self, addr: u16) -> usize {
        let last = self.prg_8k_count - 1;
        let second_last = self.prg_8k_count - 2;
        let r6 = (self.bank_regs[6] & 0x3F) as usize;
        let r7 = (self.bank_regs[7] & 0x3F) as usize;
        match ((addr >> 13) & 0x03, self.prg_swap_mode()) {
            (0, false) => r6,
            (0, true) => second_last,
            (1, _) => r7,
            (2, false) => second_last,
            (2, true) => r6,
            _ => last,
        }
    }

    /// 1 KiB CHR bank visible at `addr` ($0000..=$1FFF).
    fn chr_bank_for(&self, addr: u16) -> usize {
        let mut slot = ((addr >> 10) & 0x07) as usize;
        if self.chr_inverted() {
            slot ^= 4;
        }
        let r = &self.bank_regs;
        let bank = match slot {
            0 => r[0] & 0xFE,
            1 => r[0] | 0x01,
            2 => r[1] & 0xFE,
            3 => r[1] | 0x01,
            s => r[s - 2],
        };
        bank as usize
    }

    fn clock_irq_counter(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            if !self.irq_pending {
                trace!("MMC3: IRQ asserted");
            }
            self.irq_pending = true;
        }
    }

    fn write_register(&mut self, addr: u16, value: u8) {
        let odd = addr & 1 != 0;
        match (addr, odd) {
            (0x8000..=0x9FFF, false) => self.bank_select = value,
            (0x8000..=0x9FFF, true) => {
                let target = (self.bank_select & 0x07) as usize;
                self.bank_regs[target] = value;
                trace!("MMC3: R{target} <- {value:#04X}");
            }
            (0xA000..=0xBFFF, false) => {
                if !self.four_screen {
                    self.mirroring = if value & 1 == 0 {
                        Mirroring::Vertical
                    } else {
                        Mirroring::Horizontal
                    };
                }
            }
            (0xA000..=0xBFFF, true) => {
                self.prg_ram_enabled = value & 0x80 != 0;
                self.prg_ram_write_protect = value & 0x40 != 0;
            }
            (0xC000..=0xDFFF, false) => self.irq_latch = value,
            (0xC000..=0xDFFF, true) => {
                self.irq_counter = 0;
                self.irq_reload = true;
            }
            (0xE000..=0xFFFF, false) => {
                self.irq_enabled = false;
                self.irq_pending = false;
            }
            (_, _) => self.irq_enabled = true,
        }
    }

    /// Current value of the scanline counter.
    pub fn irq_counter(&self) -> u8 {
        self.irq_counter
    }
}

impl Mapper for Mmc3 {
    fn mapper_id(&self) -> u16 {
        4
    }

    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled {
                    self.prg_ram.read(addr)
                } else {
                    OPEN_BUS_SENTINEL
                }
            }
            0x8000..=0xFFFF => {
                let bank = self.prg_bank_for(addr);
                self.prg_rom[banked_index(self.prg_rom.len(), bank, PRG_BANK, addr as usize)]
            }
            _ => unmapped_read("MMC3", addr),
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled && !self.prg_ram_write_protect {
                    self.prg_ram.write(addr, value);
                }
            }
            0x8000..=0xFFFF => self.write_register(addr, value),
            _ => unmapped_write("MMC3", addr, value),
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        self.chr
            .read_banked(self.chr_bank_for(addr), CHR_BANK, addr as usize)
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        let bank = self.chr_bank_for(addr);
        self.chr.write_banked(bank, CHR_BANK, addr as usize, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn observe_ppu_address(&mut self, addr: u16) {
        if addr & 0x1000 != 0 {
            if self.a12_low_samples >= A12_LOW_SAMPLES {
                self.clock_irq_counter();
            }
            self.a12_low_samples = 0;
        } else {
            self.a12_low_samples = self.a12_low_samples.saturating_add(1);
        }
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn reset(&mut self) {
        debug!("MMC3: reset");
        self.bank_select = 0;
        self.bank_regs = [0, 2, 4, 5, 6, 7, 0, 1];
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload = false;
        self.irq_enabled = false;
        self.irq_pending = false;
        self.a12_low_samples = 0;
        self.prg_ram_enabled = true;
        self.prg_ram_write_protect = false;
    }
}
