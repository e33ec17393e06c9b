/*!
Mapper subsystem: trait definition, nametable mirroring policy, and the NROM
(mapper 0) board.

Purpose:
- Decouple CPU/PPU address mapping from the `Cartridge` so each board can own
  its bank-select state.
- Provide a stable interface the Bus calls for every CPU access at $4020 and
  above and every PPU access to the pattern tables.

Address windows handed to a mapper:
- CPU $4020..=$5FFF: expansion area (unmapped on the boards implemented here)
- CPU $6000..=$7FFF: PRG RAM, if the header declares any
- CPU $8000..=$FFFF: PRG ROM (bank switched)
- PPU $0000..=$1FFF: CHR ROM or CHR RAM (bank switched)

Nametables ($2000..=$3EFF) live in console VRAM, but *which* physical page a
logical table lands on is decided by `Mapper::mirroring`.

Out-of-range policy: reads from a window the board does not decode log a
warning and return `OPEN_BUS_SENTINEL`; writes are dropped.
*/

use tracing::warn;

/// Value answered for CPU/PPU reads that no device on the cartridge decodes.
pub const OPEN_BUS_SENTINEL: u8 = 0x00;

/// Nametable mirroring modes, either fixed by the header or chosen at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenLower,
    SingleScreenUpper,
    /// Four independent tables; the upper 2 KiB is cartridge-side RAM.
    FourScreen,
}

impl Mirroring {
    /// Map a nametable address ($2000..=$3EFF) to an index into the 4 KiB
    /// nametable backing store. Only `FourScreen` reaches past 0x7FF.
    ///
    /// - Horizontal: tables (0,1) -> page 0, (2,3) -> page 1
    /// - Vertical:   tables (0,2) -> page 0, (1,3) -> page 1
    #[inline]
    pub fn nametable_index(self, addr: u16) -> usize {
        let a = (addr & 0x0FFF) as usize;
        let table = a >> 10;
        let offset = a & 0x03FF;
        let page = match self {
            Mirroring::Horizontal => table >> 1,
            Mirroring::Vertical => table & 1,
            Mirroring::SingleScreenLower => 0,
            Mirroring::SingleScreenUpper => 1,
            Mirroring::FourScreen => table,
        };
        page * 0x0400 + offset
    }
}

/// Common interface all cartridge boards implement.
///
/// Semantics:
/// - All methods take full, unmasked CPU or PPU addresses.
/// - Reads are side-effect free; boards that watch the PPU address bus
///   (MMC3) do so through `observe_ppu_address`.
/// - `irq_pending()` reports the board's IRQ output; the Bus ORs it into the
///   CPU IRQ line.
pub trait Mapper {
    /// iNES mapper number (e.g. 0 for NROM).
    fn mapper_id(&self) -> u16;

    /// CPU-visible read at $4020..=$FFFF.
    fn cpu_read(&self, addr: u16) -> u8;

    /// CPU-visible write at $4020..=$FFFF.
    fn cpu_write(&mut self, addr: u16, value: u8);

    /// PPU-visible read at $0000..=$1FFF (pattern tables).
    fn ppu_read(&self, addr: u16) -> u8;

    /// PPU-visible write at $0000..=$1FFF. Ignored unless CHR is RAM.
    fn ppu_write(&mut self, addr: u16, value: u8);

    /// Current nametable mirroring.
    fn mirroring(&self) -> Mirroring;

    /// Called with every address the PPU drives onto its bus.
    fn observe_ppu_address(&mut self, _addr: u16) {}

    /// Whether the board is asserting its IRQ output.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Return bank and IRQ registers to their power-on state.
    fn reset(&mut self) {}
}

// ---------------------------------------------------------------------------
// Shared banking helpers
// ---------------------------------------------------------------------------

/// Index into `len` bytes of banked memory for `bank` of `bank_size` bytes.
/// The bank number wraps at the number of banks actually present.
#[inline]
pub(crate) fn banked_index(len: usize, bank: usize, bank_size: usize, offset: usize) -> usize {
    let banks = (len / bank_size).max(1);
    ((bank % banks) * bank_size + (offset & (bank_size - 1))) % len.max(1)
}

/// Battery-less work RAM at $6000..=$7FFF, sized from the header.
#[derive(Clone, Debug, Default)]
pub(crate) struct PrgRam {
    data: Vec<u8>,
}

impl PrgRam {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    pub(crate) fn read(&self, addr: u16) -> u8 {
        if self.data.is_empty() {
            warn!("read from absent PRG RAM at {addr:#06X}");
            return OPEN_BUS_SENTINEL;
        }
        let rel = (addr as usize - 0x6000) % self.data.len();
        self.data[rel]
    }

    pub(crate) fn write(&mut self, addr: u16, value: u8) {
        if self.data.is_empty() {
            warn!("write to absent PRG RAM at {addr:#06X} dropped");
            return;
        }
        let rel = (addr as usize - 0x6000) % self.data.len();
        self.data[rel] = value;
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }
}

/// CHR ROM, or a writable CHR RAM buffer when the header declares no CHR.
#[derive(Clone, Debug)]
pub(crate) struct Chr {
    data: Vec<u8>,
    writable: bool,
}

impl Chr {
    pub(crate) fn new(data: Vec<u8>, writable: bool) -> Self {
        let data = if data.is_empty() {
            vec![0; 8 * 1024]
        } else {
            data
        };
        Self { data, writable }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub(crate) fn read_banked(&self, bank: usize, bank_size: usize, offset: usize) -> u8 {
        self.data[banked_index(self.data.len(), bank, bank_size, offset)]
    }

    #[inline]
    pub(crate) fn write_banked(&mut self, bank: usize, bank_size: usize, offset: usize, value: u8) {
        if self.writable {
            let idx = banked_index(self.data.len(), bank, bank_size, offset);
            self.data[idx] = value;
        }
    }
}

/// Log an access to a CPU window the board does not decode.
#[inline]
pub(crate) fn unmapped_read(board: &str, addr: u16) -> u8 {
    warn!("{board}: read from unmapped address {addr:#06X}");
    OPEN_BUS_SENTINEL
}

#[inline]
pub(crate) fn unmapped_write(board: &str, addr: u16, value: u8) {
    warn!("{board}: write {value:#04X} to unmapped address {addr:#06X} dropped");
}

// ---------------------------------------------------------------------------
// NROM
// ---------------------------------------------------------------------------

/// NROM (mapper 0).
///
/// - PRG ROM: 16 KiB (NROM-128, mirrored into $C000) or 32 KiB (NROM-256).
/// - PRG RAM: header-sized, at $6000..=$7FFF; absent when the size is 0.
/// - CHR: 8 KiB ROM, or 8 KiB RAM when the image carries none.
#[derive(Clone, Debug)]
pub struct Nrom {
    prg_rom: Vec<u8>,
    prg_ram: PrgRam,
    chr: Chr,
    mirroring: Mirroring,
}

impl Nrom {
    pub fn new(
        prg_rom: Vec<u8>,
        chr: Vec<u8>,
        chr_is_ram: bool,
        prg_ram_size: usize,
        mirroring: Mirroring,
    ) -> Self {
        Self {
            prg_rom,
            prg_ram: PrgRam::new(prg_ram_size),
            chr: Chr::new(chr, chr_is_ram),
            mirroring,
        }
    }
}

impl Mapper for Nrom {
    fn mapper_id(&self) -> u16 {
        0
    }

    fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram.read(addr),
            0x8000..=0xFFFF => {
                // 16 KiB images repeat across the 32 KiB window.
                let rel = (addr - 0x8000) as usize;
                self.prg_rom[rel % self.prg_rom.len()]
            }
            _ => unmapped_read("NROM", addr),
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        match addr {
            0x6000..=0x7FFF => self.prg_ram.write(addr, value),
            // ROM: writes have no effect and are not an error.
            0x8000..=0xFFFF => {}
            _ => unmapped_write("NROM", addr, value),
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        self.chr.read_banked(0, 0x2000, addr as usize)
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        self.chr.write_banked(0, 0x2000, addr as usize, value);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }
}
