/*!
Console: the master-clock sequencer.

One `tick` is one CPU cycle:
  1) count the cycle on the bus (DMA alignment reads its parity)
  2) either one OAM DMA cycle (CPU stalled) or one CPU tick
  3) three PPU dots
  4) forward a PPU NMI request to the CPU; hand a finished frame to the
     registered listeners

The IRQ line needs no forwarding: the CPU samples `CpuBus::irq_line`, which
the bus derives from the mapper, at every instruction boundary.
*/

use tracing::debug;

use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::cpu::Cpu;

/// PPU dots per CPU cycle (NTSC).
pub const PPU_DOTS_PER_CPU_CYCLE: usize = 3;

/// Callback receiving each completed frame as palette indices.
pub type FrameListener = Box<dyn FnMut(&[u8])>;

pub struct Console {
    cpu: Cpu,
    bus: Bus,
    listeners: Vec<FrameListener>,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    /// Console with an empty cartridge slot. The CPU is powered on when a
    /// cartridge is inserted.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            bus: Bus::new(),
            listeners: Vec::new(),
        }
    }

    pub fn with_cartridge(cartridge: Cartridge) -> Self {
        let mut console = Self::new();
        console.insert_cartridge(cartridge);
        console
    }

    /// Insert a cartridge and power the CPU on through its reset vector.
    /// Returns the cartridge previously in the slot.
    pub fn insert_cartridge(&mut self, cartridge: Cartridge) -> Option<Cartridge> {
        let previous = self.bus.insert_cartridge(cartridge);
        self.cpu.power_on(&mut self.bus);
        previous
    }

    /// Remove the cartridge. Work RAM survives; cartridge-dependent state
    /// (mapper, nametables, PPU scroll/latches, DMA) is cleared.
    pub fn eject_cartridge(&mut self) -> Option<Cartridge> {
        self.bus.eject_cartridge()
    }

    /// Press the reset button.
    pub fn reset(&mut self) {
        debug!("console reset");
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }
    pub fn bus(&self) -> &Bus {
        &self.bus
    }
    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Current framebuffer (palette indices, 256x240).
    pub fn frame(&self) -> &[u8] {
        self.bus.ppu().frame()
    }

    pub fn add_frame_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&[u8]) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Advance one CPU cycle. Returns true when a frame completed during it.
    pub fn tick(&mut self) -> bool {
        self.bus.begin_cpu_cycle();
        if self.bus.dma_active() {
            self.bus.step_dma();
        } else {
            self.cpu.tick(&mut self.bus);
        }

        for _ in 0..PPU_DOTS_PER_CPU_CYCLE {
            self.bus.tick_ppu();
        }

        if self.bus.ppu_mut().take_nmi_request() {
            self.cpu.enqueue_nmi();
        }

        if self.bus.ppu_mut().take_frame_complete() {
            let frame = self.bus.ppu().frame();
            for listener in &mut self.listeners {
                listener(frame);
            }
            return true;
        }
        false
    }

    /// Run CPU cycles until the CPU reaches its next instruction boundary.
    /// Returns the cycles spent (DMA stalls included).
    pub fn step_instruction(&mut self) -> u32 {
        let mut cycles = 0;
        loop {
            self.tick();
            cycles += 1;
            if (self.cpu.instruction_complete() && !self.bus.dma_active()) || self.cpu.is_jammed() {
                return cycles;
            }
        }
    }

    /// Run until the next completed frame and return it.
    pub fn run_frame(&mut self) -> &[u8] {
        while !self.tick() {}
        self.bus.ppu().frame()
    }
}
