//! Shared test utilities: iNES image builders and a flat CPU bus.
//!
//! iNES header fields written here:
//! - bytes[0..4] = b"NES\x1A"
//! - byte 4 = PRG ROM size in 16 KiB units
//! - byte 5 = CHR ROM size in 8 KiB units (0 => 8 KiB CHR RAM)
//! - byte 6 = Flags 6 (mirroring, battery, trainer, mapper low nibble)
//! - byte 7 = Flags 7 (NES 2.0 indicator, mapper high nibble)
//! - byte 8 = PRG RAM size in 8 KiB units (0 => 8 KiB by convention)
//!
//! PRG payloads are filled with 0xAA and CHR with 0xCC unless a builder
//! injects a program.

#![allow(dead_code)]

use crate::bus::CpuBus;

/// Build a minimal iNES image with configurable PRG/CHR sizes and flags.
pub fn build_ines(
    prg_16k: usize,
    chr_8k: usize,
    flags6: u8,
    flags7: u8,
    prg_ram_8k: u8,
    trainer: Option<&[u8; 512]>,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(
        16 + trainer.map_or(0, |_| 512) + prg_16k * 16 * 1024 + chr_8k * 8 * 1024,
    );

    bytes.extend_from_slice(b"NES\x1A");
    bytes.extend_from_slice(&[prg_16k as u8, chr_8k as u8, flags6, flags7, prg_ram_8k]);
    bytes.extend_from_slice(&[0u8; 7]);

    if let Some(t) = trainer {
        bytes.extend_from_slice(t);
    }
    bytes.resize(bytes.len() + prg_16k * 16 * 1024, 0xAA);
    bytes.resize(bytes.len() + chr_8k * 8 * 1024, 0xCC);
    bytes
}

/// NROM-128 image with `prg` at $8000 and the given (reset, nmi, irq)
/// vectors, defaulting all three to $8000.
pub fn build_nrom_with_prg(
    prg: &[u8],
    chr_8k: usize,
    prg_ram_8k: u8,
    vectors: Option<(u16, u16, u16)>,
) -> Vec<u8> {
    assert!(prg.len() <= 16 * 1024, "program must fit in one 16 KiB bank");

    let mut rom = build_ines(1, chr_8k, 0, 0, prg_ram_8k, None);
    let prg_area = &mut rom[16..16 + 16 * 1024];
    prg_area[..prg.len()].copy_from_slice(prg);

    let (reset, nmi, irq) = vectors.unwrap_or((0x8000, 0x8000, 0x8000));
    set_vectors_in_prg(prg_area, reset, nmi, irq);
    rom
}

/// Write NMI/RESET/IRQ vectors at the end of a 16 or 32 KiB PRG slice.
pub fn set_vectors_in_prg(prg: &mut [u8], reset: u16, nmi: u16, irq: u16) {
    let base = match prg.len() {
        16384 => 0x3FFA,
        32768 => 0x7FFA,
        other => panic!("unsupported PRG length for vectors: {other} bytes"),
    };
    write_le_u16(prg, base, nmi);
    write_le_u16(prg, base + 2, reset);
    write_le_u16(prg, base + 4, irq);
}

fn write_le_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// One access observed on a `FlatBus`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read(u16),
    Write(u16, u8),
}

/// 64 KiB of flat RAM behind the `CpuBus` trait, recording every clocked
/// access. The IRQ line is driven by the `irq` field.
pub struct FlatBus {
    pub mem: Vec<u8>,
    pub log: Vec<Access>,
    pub irq: bool,
}

impl FlatBus {
    pub fn new() -> Self {
        Self {
            mem: vec![0; 0x10000],
            log: Vec::new(),
            irq: false,
        }
    }

    /// Load `program` at `origin` and point the reset vector at it.
    pub fn with_program(origin: u16, program: &[u8]) -> Self {
        let mut bus = Self::new();
        bus.load(origin, program);
        bus.set_vector(0xFFFC, origin);
        bus
    }

    pub fn load(&mut self, origin: u16, bytes: &[u8]) {
        let start = origin as usize;
        self.mem[start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn set_vector(&mut self, vector: u16, target: u16) {
        write_le_u16(&mut self.mem, vector as usize, target);
    }

    pub fn reads(&self) -> Vec<u16> {
        self.log
            .iter()
            .filter_map(|a| match a {
                Access::Read(addr) => Some(*addr),
                Access::Write(..) => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.log
            .iter()
            .filter_map(|a| match a {
                Access::Write(addr, v) => Some((*addr, *v)),
                Access::Read(_) => None,
            })
            .collect()
    }
}

impl CpuBus for FlatBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.log.push(Access::Read(addr));
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.log.push(Access::Write(addr, value));
        self.mem[addr as usize] = value;
    }

    fn peek(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn irq_line(&self) -> bool {
        self.irq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_basic_ines() {
        let rom = build_ines(2, 1, 0x01, 0x00, 1, None);
        assert_eq!(&rom[0..4], b"NES\x1A");
        assert_eq!(&rom[4..9], &[2, 1, 0x01, 0x00, 1]);
        assert_eq!(rom.len(), 16 + 2 * 16 * 1024 + 8 * 1024);
        assert_eq!(rom[16], 0xAA);
        assert_eq!(rom[rom.len() - 1], 0xCC);
    }

    #[test]
    fn writes_vectors_for_32k_prg() {
        let mut prg = vec![0u8; 32 * 1024];
        set_vectors_in_prg(&mut prg, 0x8123, 0x8456, 0x8ABC);
        assert_eq!(&prg[0x7FFA..], &[0x56, 0x84, 0x23, 0x81, 0xBC, 0x8A]);
    }

    #[test]
    fn nrom_program_lands_at_prg_start() {
        let rom = build_nrom_with_prg(&[0xA9, 0x01], 1, 1, Some((0x8010, 0x8000, 0x8000)));
        assert_eq!(&rom[16..18], &[0xA9, 0x01]);
        assert_eq!(&rom[16 + 0x3FFC..16 + 0x3FFE], &[0x10, 0x80]);
    }

    #[test]
    fn flat_bus_logs_clocked_accesses_only() {
        let mut bus = FlatBus::with_program(0x0200, &[0xEA]);
        assert_eq!(bus.peek(0xFFFC), 0x00);
        assert_eq!(bus.peek(0xFFFD), 0x02);
        bus.write(0x10, 7);
        assert_eq!(bus.read(0x10), 7);
        assert_eq!(bus.log, vec![Access::Write(0x10, 7), Access::Read(0x10)]);
    }
}
