/*!
DmaController: cycle-accurate OAM DMA state machine.

Behavioral model
- A write of page XX to $4014 starts the transfer. The CPU is stalled for
  513 cycles when the write lands on an even CPU cycle, 514 on an odd one
  (one or two alignment cycles, then 256 read/write pairs).
- Reads go through the normal CPU read path so any side effects match.
- Writes land on OAMDATA, which increments OAMADDR.

Public API
- `start(src_page, cpu_cycle)`, `is_active()`, `stall_remaining()`.
- `step_one_cycle(mem, oam)`: one CPU cycle of transfer work.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DmaPhase {
    Read,
    Write,
}

/// Source side of the transfer; must behave exactly like a CPU read.
pub trait CpuMemory {
    fn cpu_read(&mut self, addr: u16) -> u8;
}

/// Sink side of the transfer; equivalent to a write to $2004.
pub trait OamWriter {
    fn write_oam_data(&mut self, value: u8);
}

/// One-slot buffer for the byte written on a DMA write cycle, so the source
/// bus and the PPU need not be borrowed at the same time.
#[derive(Debug, Default)]
pub(crate) struct OamLatch(pub(crate) Option<u8>);

impl OamWriter for OamLatch {
    fn write_oam_data(&mut self, value: u8) {
        self.0 = Some(value);
    }
}

#[derive(Debug, Clone)]
pub struct DmaController {
    active: bool,
    src_addr: u16,
    index: u16,
    phase: DmaPhase,
    latch: u8,
    align_cycles: u8,
}

impl Default for DmaController {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaController {
    pub fn new() -> Self {
        Self {
            active: false,
            src_addr: 0,
            index: 0,
            phase: DmaPhase::Read,
            latch: 0,
            align_cycles: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Begin a transfer from `src_page << 8`. `cpu_cycle` parity picks the
    /// alignment: even -> 1 cycle (513 total), odd -> 2 cycles (514 total).
    pub fn start(&mut self, src_page: u8, cpu_cycle: u64) {
        self.active = true;
        self.src_addr = (src_page as u16) << 8;
        self.index = 0;
        self.phase = DmaPhase::Read;
        self.latch = 0;
        self.align_cycles = 1 + ((cpu_cycle & 1) as u8);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// CPU stall cycles left, alignment included. 0 when idle.
    pub fn stall_remaining(&self) -> u32 {
        if !self.active {
            return 0;
        }
        let bytes_left = 256u32.saturating_sub(self.index as u32);
        let transfer = match self.phase {
            DmaPhase::Read => bytes_left * 2,
            DmaPhase::Write => (bytes_left * 2).saturating_sub(1),
        };
        self.align_cycles as u32 + transfer
    }

    /// One CPU cycle of DMA work. Returns whether the CPU is stalled.
    pub fn step_one_cycle<M: CpuMemory, O: OamWriter>(&mut self, mem: &mut M, oam: &mut O) -> bool {
        if !self.active {
            return false;
        }

        if self.align_cycles > 0 {
            self.align_cycles -= 1;
            return true;
        }

        match self.phase {
            DmaPhase::Read => {
                self.latch = mem.cpu_read(self.src_addr.wrapping_add(self.index));
                self.phase = DmaPhase::Write;
            }
            DmaPhase::Write => {
                oam.write_oam_data(self.latch);
                self.index += 1;
                self.phase = DmaPhase::Read;
                if self.index >= 256 {
                    self.active = false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PatternMem;

    impl CpuMemory for PatternMem {
        fn cpu_read(&mut self, addr: u16) -> u8 {
            (addr & 0xFF) as u8 ^ 0x5A
        }
    }

    #[derive(Default)]
    struct SinkOam {
        writes: Vec<u8>,
    }

    impl OamWriter for SinkOam {
        fn write_oam_data(&mut self, value: u8) {
            self.writes.push(value);
        }
    }

    fn run(start_cycle: u64) -> (u32, Vec<u8>) {
        let mut dma = DmaController::new();
        let mut oam = SinkOam::default();
        dma.start(0x02, start_cycle);
        let mut cycles = 0;
        while dma.is_active() {
            assert!(dma.step_one_cycle(&mut PatternMem, &mut oam));
            cycles += 1;
        }
        (cycles, oam.writes)
    }

    #[test]
    fn even_start_takes_513_cycles() {
        let (cycles, writes) = run(0);
        assert_eq!(cycles, 513);
        assert_eq!(writes.len(), 256);
        assert_eq!(writes[0], 0x5A);
        assert_eq!(writes[255], 0xFF ^ 0x5A);
    }

    #[test]
    fn odd_start_takes_514_cycles() {
        let (cycles, writes) = run(7);
        assert_eq!(cycles, 514);
        assert_eq!(writes.len(), 256);
    }

    #[test]
    fn stall_remaining_counts_down_to_zero() {
        let mut dma = DmaController::new();
        let mut oam = SinkOam::default();
        dma.start(0x00, 0);
        assert_eq!(dma.stall_remaining(), 513);
        dma.step_one_cycle(&mut PatternMem, &mut oam);
        dma.step_one_cycle(&mut PatternMem, &mut oam);
        assert_eq!(dma.stall_remaining(), 511);
        while dma.is_active() {
            dma.step_one_cycle(&mut PatternMem, &mut oam);
        }
        assert_eq!(dma.stall_remaining(), 0);
        assert!(!dma.step_one_cycle(&mut PatternMem, &mut oam));
    }
}
