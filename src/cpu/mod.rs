/*!
cpu - cycle-stepped 6502 (NES 2A03) core.

```text
    state.rs       Registers, flag masks, stack pointer helpers.
    addressing.rs  Addressing modes and address arithmetic quirks.
    execute.rs     Operation handlers (ALU, transfers, RMW transforms).
    table.rs       Compile-time 256-entry opcode descriptor table.
    core/          `Cpu`: phase/step state machine, one bus access per tick.
    disasm.rs      Table-driven disassembler (not on the execution path).
```

Usage:
```ignore
let mut cpu = Cpu::new();
cpu.power_on(&mut bus);
let ticks = cpu.step(&mut bus);
```
*/

pub mod addressing;
pub mod core;
pub mod disasm;
pub mod execute;
pub mod state;
pub mod table;

pub use crate::cpu::addressing::AddrMode;
pub use crate::cpu::core::{Cpu, IRQ_VECTOR, Interrupt, NMI_VECTOR, Phase, RESET_VECTOR};
pub use crate::cpu::disasm::{disassemble, disassemble_bus};
pub use crate::cpu::state::{
    BREAK, CARRY, CpuState, DECIMAL, IRQ_DISABLE, NEGATIVE, OVERFLOW, UNUSED, ZERO,
};
pub use crate::cpu::table::{OPCODES, OpClass, OpKind, Opcode};
