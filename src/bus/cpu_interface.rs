/*!
CPU interface dispatcher

Purpose
- Centralize CPU-visible address decoding and delegate to devices.
- Keep clocked (`cpu_read`/`cpu_write`) and unclocked (`cpu_peek`) paths
  side by side so they decode identically.

Address map:
- $0000-$07FF: 2KB internal RAM
- $0800-$1FFF: Mirrors of $0000-$07FF (mask & 0x07FF)
- $2000-$2007: PPU registers
- $2008-$3FFF: Mirrors of $2000-$2007 (mask with & 0x0007)
- $4000-$4013: APU registers
- $4014: OAM DMA (write starts a transfer)
- $4015: APU status (read) / enables (write)
- $4016: Controller strobe (write), controller 1 serial read (read)
- $4017: APU frame counter (write), controller 2 serial read (read)
- $4018-$401F: Disabled test registers (sentinel / ignored)
- $4020-$FFFF: Cartridge mapper
*/

use tracing::trace;

use crate::bus::Bus;
use crate::mapper::{OPEN_BUS_SENTINEL, unmapped_read, unmapped_write};

/// Clocked CPU read.
pub fn cpu_read(bus: &mut Bus, addr: u16) -> u8 {
    match addr {
        0x0000..=0x1FFF => bus.ram.read(addr),
        0x2000..=0x3FFF => {
            let (ppu, mut mem) = bus.split_ppu();
            ppu.read_register(addr, &mut mem)
        }
        0x4015 => bus.apu.read_status(),
        0x4016 => bus.controllers[0].read_serial(),
        0x4017 => bus.controllers[1].read_serial(),
        0x4000..=0x401F => OPEN_BUS_SENTINEL,
        0x4020..=0xFFFF => match &bus.cartridge {
            Some(cart) => cart.mapper().cpu_read(addr),
            None => unmapped_read("empty slot", addr),
        },
    }
}

/// Clocked CPU write.
pub fn cpu_write(bus: &mut Bus, addr: u16, value: u8) {
    match addr {
        0x0000..=0x1FFF => bus.ram.write(addr, value),
        0x2000..=0x3FFF => {
            let (ppu, mut mem) = bus.split_ppu();
            ppu.write_register(addr, value, &mut mem);
        }
        0x4014 => {
            trace!(page = format_args!("{value:#04X}"), cycle = bus.cpu_cycle, "oam dma start");
            bus.dma.start(value, bus.cpu_cycle);
        }
        0x4016 => {
            for pad in &mut bus.controllers {
                pad.write_strobe(value);
            }
        }
        0x4000..=0x4017 => {
            bus.apu.write_register(addr, value);
        }
        0x4018..=0x401F => {}
        0x4020..=0xFFFF => match &mut bus.cartridge {
            Some(cart) => cart.mapper_mut().cpu_write(addr, value),
            None => unmapped_write("empty slot", addr, value),
        },
    }
}

/// Unclocked, side-effect-free CPU view.
pub fn cpu_peek(bus: &Bus, addr: u16) -> u8 {
    match addr {
        0x0000..=0x1FFF => bus.ram.read(addr),
        0x2000..=0x3FFF => bus.ppu.peek_register(addr),
        0x4015 => bus.apu.read_status(),
        0x4016 => bus.controllers[0].peek_serial(),
        0x4017 => bus.controllers[1].peek_serial(),
        0x4000..=0x401F => OPEN_BUS_SENTINEL,
        0x4020..=0xFFFF => bus
            .cartridge
            .as_ref()
            .map_or(OPEN_BUS_SENTINEL, |c| c.mapper().cpu_read(addr)),
    }
}

/// Little-endian word read, used for vectors.
pub fn cpu_peek_word(bus: &Bus, addr: u16) -> u16 {
    let lo = cpu_peek(bus, addr) as u16;
    let hi = cpu_peek(bus, addr.wrapping_add(1)) as u16;
    (hi << 8) | lo
}
