/*!
Cartridge: iNES loader and mapper factory.

Features:
- Parse the 16-byte iNES header from bytes or a file path
- Skip the optional 512-byte trainer
- Extract PRG ROM and CHR (ROM, or 8 KiB CHR RAM when the CHR count is 0)
- Determine mirroring, battery, PRG-RAM size, and mapper id
- Construct the concrete `Mapper` for the board

Notes:
- NES 2.0 images are accepted; only their iNES-1 compatible fields are read
  (mapper bits 0-7, sizes in bytes 4/5, PRG-RAM byte 8 as 8 KiB units).
- PRG RAM allocation: header byte 8 in 8 KiB units; 0 means 8 KiB, the
  compatibility default for images that predate the field.
- A cartridge is immutable after loading apart from the mapper's own
  runtime state. Loading either returns a complete cartridge or an error.
*/

use std::fmt;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::mapper::{Mapper, Mirroring, Nrom};
use crate::mappers::{Mmc1, Mmc3, Uxrom};

pub const INES_HEADER_LEN: usize = 16;
pub const TRAINER_LEN: usize = 512;
pub const PRG_UNIT: usize = 16 * 1024;
pub const CHR_UNIT: usize = 8 * 1024;
pub const PRG_RAM_UNIT: usize = 8 * 1024;

/// Reasons a cartridge image cannot be turned into a running board.
#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("invalid iNES magic, expected NES<1A> but found {found:02X?}")]
    InvalidMagic { found: [u8; 4] },
    #[error("image truncated: {section} needs {needed} bytes, only {available} available")]
    Truncated {
        section: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("image declares no PRG ROM")]
    MissingPrgRom,
    #[error("unsupported mapper {mapper_id} (supported: 0 NROM, 1 MMC1, 2 UxROM, 4 MMC3)")]
    UnsupportedMapper { mapper_id: u16 },
    #[error("error reading cartridge file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InesVersion {
    Ines1,
    Ines2,
}

/// Decoded iNES header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InesHeader {
    pub version: InesVersion,
    pub mapper_id: u16,
    pub prg_rom_len: usize,
    pub chr_rom_len: usize,
    pub prg_ram_len: usize,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub has_trainer: bool,
    /// Byte 9 bit 0: 0 = NTSC, 1 = PAL. Informational only.
    pub pal: bool,
}

impl InesHeader {
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < INES_HEADER_LEN {
            return Err(CartridgeError::Truncated {
                section: "header",
                needed: INES_HEADER_LEN,
                available: data.len(),
            });
        }
        if &data[0..4] != b"NES\x1A" {
            return Err(CartridgeError::InvalidMagic {
                found: [data[0], data[1], data[2], data[3]],
            });
        }

        let flags6 = data[6];
        let flags7 = data[7];
        let version = if flags7 & 0x0C == 0x08 {
            InesVersion::Ines2
        } else {
            InesVersion::Ines1
        };

        // Mapper id: high nibble from flags7, low nibble from flags6
        let mapper_id = (flags7 & 0xF0) as u16 | (flags6 >> 4) as u16;

        let mirroring = if flags6 & 0b0000_1000 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0b0000_0001 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let prg_ram_units = data[8] as usize;
        let prg_ram_len = if prg_ram_units == 0 {
            PRG_RAM_UNIT
        } else {
            prg_ram_units * PRG_RAM_UNIT
        };

        Ok(Self {
            version,
            mapper_id,
            prg_rom_len: data[4] as usize * PRG_UNIT,
            chr_rom_len: data[5] as usize * CHR_UNIT,
            prg_ram_len,
            mirroring,
            battery: flags6 & 0b0000_0010 != 0,
            has_trainer: flags6 & 0b0000_0100 != 0,
            pal: data[9] & 0x01 != 0,
        })
    }

    pub fn chr_is_ram(&self) -> bool {
        self.chr_rom_len == 0
    }
}

pub struct Cartridge {
    header: InesHeader,
    mapper: Box<dyn Mapper>,
}

impl fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cartridge")
            .field("header", &self.header)
            .field("mirroring", &self.mapper.mirroring())
            .finish()
    }
}

impl Cartridge {
    // -------------- Construction --------------

    /// Load a cartridge from raw iNES bytes and construct its mapper.
    pub fn from_ines_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        let header = InesHeader::parse(data)?;
        if header.prg_rom_len == 0 {
            return Err(CartridgeError::MissingPrgRom);
        }

        let mut offset = INES_HEADER_LEN;
        if header.has_trainer {
            offset = take(data, offset, TRAINER_LEN, "trainer")?.1;
        }
        let (prg, next) = take(data, offset, header.prg_rom_len, "PRG ROM")?;
        let prg_rom = prg.to_vec();
        let chr = if header.chr_is_ram() {
            vec![0; CHR_UNIT]
        } else {
            take(data, next, header.chr_rom_len, "CHR ROM")?.0.to_vec()
        };

        let mapper = build_mapper(&header, prg_rom, chr)?;
        debug!(
            "loaded cartridge: mapper {} ({:?}), PRG {} KiB, CHR {} KiB{}, PRG RAM {} KiB, {:?}",
            header.mapper_id,
            header.version,
            header.prg_rom_len / 1024,
            header.chr_rom_len.max(CHR_UNIT) / 1024,
            if header.chr_is_ram() { " RAM" } else { "" },
            header.prg_ram_len / 1024,
            header.mirroring
        );
        Ok(Self { header, mapper })
    }

    /// Load a cartridge from an iNES file (.nes).
    pub fn from_ines_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| CartridgeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ines_bytes(&bytes)
    }

    // -------------- Accessors --------------

    pub fn header(&self) -> &InesHeader {
        &self.header
    }

    pub fn mapper_id(&self) -> u16 {
        self.header.mapper_id
    }

    /// Current mirroring (the header default or the mapper's runtime choice).
    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    pub fn battery_backed(&self) -> bool {
        self.header.battery
    }

    pub fn mapper(&self) -> &dyn Mapper {
        self.mapper.as_ref()
    }

    pub fn mapper_mut(&mut self) -> &mut dyn Mapper {
        self.mapper.as_mut()
    }
}

/// Slice `len` bytes at `offset`, returning the slice and the following offset.
fn take<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    section: &'static str,
) -> Result<(&'a [u8], usize), CartridgeError> {
    let end = offset + len;
    if data.len() < end {
        return Err(CartridgeError::Truncated {
            section,
            needed: len,
            available: data.len().saturating_sub(offset),
        });
    }
    Ok((&data[offset..end], end))
}

fn build_mapper(
    header: &InesHeader,
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
) -> Result<Box<dyn Mapper>, CartridgeError> {
    let chr_is_ram = header.chr_is_ram();
    let mapper: Box<dyn Mapper> = match header.mapper_id {
        0 => Box::new(Nrom::new(
            prg_rom,
            chr,
            chr_is_ram,
            header.prg_ram_len,
            header.mirroring,
        )),
        1 => Box::new(Mmc1::new(prg_rom, chr, chr_is_ram, header.prg_ram_len)),
        2 => Box::new(Uxrom::new(prg_rom, chr, chr_is_ram, header.mirroring)),
        4 => Box::new(Mmc3::new(
            prg_rom,
            chr,
            chr_is_ram,
            header.prg_ram_len,
            header.mirroring,
        )),
        mapper_id => return Err(CartridgeError::UnsupportedMapper { mapper_id }),
    };
    Ok(mapper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::build_ines;

    #[test]
    fn parse_simple_nrom_32k_chr8k() {
        let data = build_ines(2, 1, 0b0000_0001, 0, 1, None);
        let cart = Cartridge::from_ines_bytes(&data).expect("parse");

        assert_eq!(cart.mapper_id(), 0);
        assert_eq!(cart.mirroring(), Mirroring::Vertical);
        assert_eq!(cart.header().prg_rom_len, 32 * 1024);
        assert_eq!(cart.header().chr_rom_len, 8 * 1024);
        assert_eq!(cart.mapper().cpu_read(0x8000), 0xAA);
        assert_eq!(cart.mapper().cpu_read(0xFFFF), 0xAA);
        assert_eq!(cart.mapper().ppu_read(0x0000), 0xCC);
    }

    #[test]
    fn chr_count_zero_allocates_chr_ram() {
        let data = build_ines(1, 0, 0, 0, 0, None);
        let mut cart = Cartridge::from_ines_bytes(&data).expect("parse");
        assert!(cart.header().chr_is_ram());
        assert_eq!(cart.header().prg_ram_len, 8 * 1024);
        cart.mapper_mut().ppu_write(0x0042, 0x99);
        assert_eq!(cart.mapper().ppu_read(0x0042), 0x99);
    }

    #[test]
    fn mapper_id_combines_both_nibbles() {
        let data = build_ines(2, 1, 0x40, 0x00, 0, None);
        assert_eq!(InesHeader::parse(&data).unwrap().mapper_id, 4);
        let data = build_ines(2, 1, 0x10, 0x20, 0, None);
        assert_eq!(InesHeader::parse(&data).unwrap().mapper_id, 0x21);
    }

    #[test]
    fn trainer_moves_data_offset() {
        let trainer = [0x5Au8; 512];
        let data = build_ines(1, 1, 0b0000_0100, 0, 1, Some(&trainer));
        let cart = Cartridge::from_ines_bytes(&data).expect("parse");
        assert!(cart.header().has_trainer);
        assert_eq!(cart.mapper().cpu_read(0x8000), 0xAA, "trainer must be skipped");
    }

    #[test]
    fn four_screen_and_battery_flags() {
        let data = build_ines(1, 1, 0b0000_1011, 0, 1, None);
        let cart = Cartridge::from_ines_bytes(&data).expect("parse");
        assert_eq!(cart.mirroring(), Mirroring::FourScreen);
        assert!(cart.battery_backed());
    }

    #[test]
    fn ines2_header_is_read_through_compatible_fields() {
        let data = build_ines(1, 1, 0x10, 0b0000_1000, 1, None);
        let cart = Cartridge::from_ines_bytes(&data).expect("parse");
        assert_eq!(cart.header().version, InesVersion::Ines2);
        assert_eq!(cart.mapper_id(), 1);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut data = build_ines(1, 1, 0, 0, 1, None);
        data[3] = 0x00;
        let err = Cartridge::from_ines_bytes(&data).unwrap_err();
        assert!(matches!(err, CartridgeError::InvalidMagic { .. }));
    }

    #[test]
    fn short_file_rejected() {
        let data = build_ines(2, 1, 0, 0, 1, None);
        let err = Cartridge::from_ines_bytes(&data[..16 + 20_000]).unwrap_err();
        assert!(
            matches!(err, CartridgeError::Truncated { section: "PRG ROM", .. }),
            "{err}"
        );
        let err = Cartridge::from_ines_bytes(&data[..10]).unwrap_err();
        assert!(matches!(err, CartridgeError::Truncated { section: "header", .. }));
    }

    #[test]
    fn unsupported_mapper_names_the_id() {
        let data = build_ines(1, 1, 0x50, 0, 1, None);
        let err = Cartridge::from_ines_bytes(&data).unwrap_err();
        assert!(matches!(err, CartridgeError::UnsupportedMapper { mapper_id: 5 }));
        assert!(err.to_string().contains("unsupported mapper 5"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Cartridge::from_ines_file("/nonexistent/rom.nes").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rom.nes"));
    }
}
