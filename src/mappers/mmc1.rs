//! MMC1 (Mapper 1) implementation.
//!
//! Implements:
//! - Serial 5-bit shift register loaded one bit per CPU write to $8000-$FFFF
//! - Target register selected by address bits 13-14 on the fifth write
//!   (control / CHR bank 0 / CHR bank 1 / PRG bank)
//! - PRG banking modes (32K switch, 16K with fixed low, 16K with fixed high)
//! - CHR banking (one 8K bank or two independent 4K banks)
//! - Runtime mirroring including both single-screen variants
//! - PRG RAM enable (PRG bank register bit 4, active low)
//!
//! Deferred:
//! - Ignoring writes on consecutive CPU cycles (needs cycle stamps from the bus)
//! - Large board variants (SUROM / SOROM / SXROM)

use tracing::trace;

use crate::mapper::{
    Chr, Mapper, Mirroring, OPEN_BUS_SENTINEL, PrgRam, banked_index, unmapped_read,
    unmapped_write,
};

const PRG_BANK: usize = 0x4000;
const CHR_BANK: usize = 0x1000;

/// Control register value at power-on: PRG mode 3 (fix last bank at $C000).
const CONTROL_POWER_ON: u8 = 0x0C;

/// MMC1 mapper core state.
#[derive(Debug, Clone)]
pub struct Mmc1 {
    prg_rom: Vec<u8>,
    prg_ram: PrgRam,
    chr: Chr,

    // 5-bit registers
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,

    // Serial latch
    shift_reg: u8,
    shift_count: u8,

    prg_16k_bank_count: usize,
}

impl Mmc1 {
    pub fn new(prg_rom: Vec<u8>, chr: Vec<u8>, chr_is_ram: bool, prg_ram_size: usize) -> Self {
        let prg_16k_bank_count = (prg_rom.len() / PRG_BANK).max(1);
        Self {
            prg_rom,
            prg_ram: PrgRam::new(prg_ram_size),
            chr: Chr::new(chr, chr_is_ram),
            control: CONTROL_POWER_ON,
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
            shift_reg: 0,
            shift_count: 0,
            prg_16k_bank_count,
        }
    }

    /// Raw 5-bit control register.
    pub fn control(&self) -> u8 {
        self.control
    }

    /// Bits 2-3 of control: 0/1 = 32K, 2 = fix first bank, 3 = fix last bank.
    #[inline]
    pub fn prg_mode(&self) -> u8 {
        (self.control >> 2) & 0x03
    }

    #[inline]
    fn chr_4k_mode(&self) -> bool {
        self.control & 0x10 != 0
    }

    /// Number of bits currently held in the serial shift register.
    pub fn pending_bits(&self) -> u8 {
        self.shift_count
    }

    fn prg_ram_enabled(&self) -> bool {
        self.prg_bank & 0x10 == 0
    }

    /// 16 KiB banks mapped at $8000 and $C000.
    fn prg_banks(&self) -> (usize, usize) {
        let bank = (self.prg_bank & 0x0F) as usize;
        let last = self.prg_16k_bank_count - 1;
        match self.prg_mode() {
            0 | 1 => {
                let base = bank & !1;
                (base, base + 1)
            }
            2 => (0, bank),
            _ => (bank, last),
        }
    }

    /// 4 KiB banks mapped at $0000 and $1000.
    fn chr_banks(&self) -> (usize, usize) {
        if self.chr_4k_mode() {
            (self.chr_bank0 as usize, self.chr_bank1 as usize)
        } else {
            let base = (self.chr_bank0 & 0x1E) as usize;
            (base, base | 1)
        }
    }

    fn chr_bank_for(&self, addr: u16) -> usize {
        let (lo, hi) = self.chr_banks();
        if addr & 0x1000 == 0 { lo } else { hi }
    }

    fn commit_register(&mut self, addr: u16, value5: u8) {
        match addr {
            0x8000..=0x9FFF => self.control = value5,
            0xA000..=0xBFFF => self.chr_bank0 = value5,
            0xC000..=0xDFFF => self.chr_bank1 = value5,
            _ => self.prg_bank = value5,
        }
        trace!(
            "MMC1: reg {:#06X} <- {:#04X} (prg {:?}, chr {:?})",
            addr & 0xE000,
            value5,
            self.prg_banks(),
            self.chr_banks()
        );
    }

    fn serial_write(&mut self, addr: u16, data: u8) {
        if data & 0x80 != 0 {
            self.shift_reg = 0;
            self.shift_count = 0;
            self.control |= 0x0C;
            return;
        }
        self.shift_reg |= (data & 1) << self.shift_count;
        self.shift_count += 1;
        if self.shift_count == 5 {
            let value5 = self.shift_reg & 0x1F;
            self.shift_reg = 0;
            self.shift_count = 0;
            self.commit_register(addr, value5);
        }
    }
}

impl Mapper for Mmc1 {
    fn mapper_id(&self) -> u16 {
        1
    }

    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled() {
                    self.prg_ram.read(addr)
                } else {
                    OPEN_BUS_SENTINEL
                }
            }
            0x8000..=0xFFFF => {
                let (lo, hi) = self.prg_banks();
                let bank = if addr < 0xC000 { lo } else { hi };
                self.prg_rom[banked_index(self.prg_rom.len(), bank, PRG_BANK, addr as usize)]
            }
            _ => unmapped_read("MMC1", addr),
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled() {
                    self.prg_ram.write(addr, value);
                }
            }
            0x8000..=0xFFFF => self.serial_write(addr, value),
            _ => unmapped_write("MMC1", addr, value),
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
        match self.control & 0x03 {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    fn reset(&mut self) {
        self.control = CONTROL_POWER_ON;
        self.shift_reg = 0;
        self.shift_count = 0;
        self.chr_bank0 = 0;
        self.chr_bank1 = 0;
        self.prg_bank = 0;
    }
}
