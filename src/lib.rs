#![doc = r#"
cyclenes: a cycle-stepped NES emulator core.

Modules:
- apu: APU register sink behind $4000-$4017
- bus: CPU address decoder owning RAM, PPU, nametables, controllers, DMA, cartridge slot
- cartridge: iNES loader; builds the board's Mapper
- console: master-clock sequencer (CPU : PPU = 1 : 3), NMI and frame forwarding
- controller: standard pad with strobe-latched serial shift register
- cpu: cycle-stepped 6502 (state machine, opcode table, disassembler)
- mapper / mappers: Mapper trait, NROM, UxROM, MMC1, MMC3
- ppu: dot-stepped picture pipeline, registers, palette
- ppu_bus: trait the PPU uses to reach pattern tables and nametables

In tests, iNES builders and a flat 64 KiB CPU bus live under `crate::test_utils`.
"#]

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod console;
pub mod controller;
pub mod cpu;
pub mod mapper;
pub mod mappers;
pub mod ppu;
pub mod ppu_bus;

pub use bus::Bus;
pub use cartridge::{Cartridge, CartridgeError};
pub use console::Console;
pub use controller::Buttons;
pub use cpu::Cpu;

#[cfg(test)]
pub mod test_utils;
