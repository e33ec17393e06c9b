/*!
core::Cpu - cycle-stepped 6502 (2A03) execution engine.

Design
======
- `Cpu` owns a `CpuState` plus the microcode position: a `Phase` and a
  `step` counter within the current instruction or interrupt entry.
- `tick` performs exactly one bus access (read or write) and advances the
  microcode by one step. Nothing else on the bus moves in between, so the
  caller can interleave PPU dots and DMA cycles at CPU-cycle granularity.
- Operation semantics come from the descriptor's handler (`execute.rs`);
  this file only sequences the bus traffic around them.

Phases
======
```text
    Fetch      at an instruction boundary; polls interrupts, then reads an opcode
    Execute    walks the addressing mode and operation class one tick at a time
    Interrupt  7-tick NMI/IRQ entry
    Jammed     JAM executed; reads $FFFF every tick until reset
```

Interrupts
==========
`enqueue_nmi`/`enqueue_irq` latch requests (ignored while an entry is in
flight). At a boundary NMI wins; IRQ is taken when requested or when the
bus asserts its IRQ line, and only with I clear. BRK checks for a pending
NMI at its first push and, if present, vectors through $FFFA instead.
*/

use tracing::{trace, warn};

use crate::bus::CpuBus;
use crate::cpu::addressing::{AddrMode, index_address, indirect_high_pointer, uncorrected_address};
use crate::cpu::execute::{BranchCond, ModifyOp, ReadOp, WriteOp};
use crate::cpu::state::{CpuState, IRQ_DISABLE};
use crate::cpu::table::{Control, OpKind, Opcode, lookup};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Address driven on every tick while jammed.
const JAM_BUS_ADDR: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetch,
    Execute,
    Interrupt,
    Jammed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Nmi,
    Irq,
}

#[derive(Debug, Clone)]
pub struct Cpu {
    state: CpuState,
    phase: Phase,
    op: &'static Opcode,
    step: u8,
    /// Effective address (or branch target) under construction.
    addr: u16,
    /// Unindexed base address for indexed modes.
    base: u16,
    /// Zero-page pointer for indirect modes.
    ptr: u8,
    /// Operand latch (RMW value, low byte of a jump target, branch offset).
    data: u8,
    crossed: bool,
    vector: u16,
    nmi_request: bool,
    irq_request: bool,
    interrupt_depth: u32,
    cycles: u64,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            state: CpuState::new(),
            phase: Phase::Fetch,
            op: lookup(0xEA),
            step: 0,
            addr: 0,
            base: 0,
            ptr: 0,
            data: 0,
            crossed: false,
            vector: IRQ_VECTOR,
            nmi_request: false,
            irq_request: false,
            interrupt_depth: 0,
            cycles: 0,
        }
    }

    /// Power-on: registers to their defaults, PC from the reset vector.
    pub fn power_on<B: CpuBus>(&mut self, bus: &mut B) {
        self.state = CpuState::new();
        self.load_reset_vector(bus);
    }

    /// Reset: any instruction or interrupt entry in progress is discarded,
    /// registers return to their power-on values and PC is reloaded from
    /// $FFFC.
    pub fn reset<B: CpuBus>(&mut self, bus: &mut B) {
        self.state = CpuState::new();
        self.load_reset_vector(bus);
    }

    /// Hardware-accurate warm reset: A/X/Y survive, SP drops by three
    /// (the suppressed pushes) and I is set.
    pub fn warm_reset<B: CpuBus>(&mut self, bus: &mut B) {
        self.state.sp = self.state.sp.wrapping_sub(3);
        self.state.assign_flag(IRQ_DISABLE, true);
        self.load_reset_vector(bus);
    }

    fn load_reset_vector<B: CpuBus>(&mut self, bus: &mut B) {
        let lo = bus.read(RESET_VECTOR) as u16;
        let hi = bus.read(RESET_VECTOR + 1) as u16;
        self.state.pc = (hi << 8) | lo;
        self.phase = Phase::Fetch;
        self.step = 0;
        self.nmi_request = false;
        self.irq_request = false;
        self.interrupt_depth = 0;
        trace!(pc = format_args!("{:#06X}", self.state.pc), "cpu reset");
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------
    pub fn state(&self) -> &CpuState {
        &self.state
    }
    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }
    pub fn pc(&self) -> u16 {
        self.state.pc
    }
    pub fn set_pc(&mut self, pc: u16) {
        self.state.pc = pc;
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn is_jammed(&self) -> bool {
        self.phase == Phase::Jammed
    }
    /// Total ticks since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
    /// True at an instruction boundary (the next tick fetches an opcode or
    /// begins an interrupt entry).
    pub fn instruction_complete(&self) -> bool {
        self.phase == Phase::Fetch
    }
    pub fn nmi_pending(&self) -> bool {
        self.nmi_request
    }
    pub fn irq_pending(&self) -> bool {
        self.irq_request
    }

    // ---------------------------------------------------------------------
    // Interrupt requests
    // ---------------------------------------------------------------------
    pub fn enqueue_nmi(&mut self) {
        if self.phase != Phase::Interrupt {
            self.nmi_request = true;
        }
    }

    pub fn enqueue_irq(&mut self) {
        if self.phase != Phase::Interrupt {
            self.irq_request = true;
        }
    }

    // ---------------------------------------------------------------------
    // Clocking
    // ---------------------------------------------------------------------

    /// Run exactly one CPU cycle (one bus access).
    pub fn tick<B: CpuBus>(&mut self, bus: &mut B) {
        self.cycles = self.cycles.wrapping_add(1);
        match self.phase {
            Phase::Fetch => self.fetch(bus),
            Phase::Execute => {
                self.step += 1;
                self.execute(bus);
            }
            Phase::Interrupt => {
                self.step += 1;
                self.interrupt_step(bus);
            }
            Phase::Jammed => {
                bus.read(JAM_BUS_ADDR);
            }
        }
    }

    /// Tick until the next instruction boundary; returns the ticks spent.
    /// A jammed CPU returns after a single tick.
    pub fn step<B: CpuBus>(&mut self, bus: &mut B) -> u32 {
        let mut ticks = 0;
        loop {
            self.tick(bus);
            ticks += 1;
            if self.instruction_complete() || self.phase == Phase::Jammed {
                return ticks;
            }
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Fetch;
        self.step = 0;
    }

    fn fetch_operand<B: CpuBus>(&mut self, bus: &mut B) -> u8 {
        let v = bus.read(self.state.pc);
        self.state.advance_pc(1);
        v
    }

    fn fetch<B: CpuBus>(&mut self, bus: &mut B) {
        if self.nmi_request {
            self.nmi_request = false;
            self.begin_interrupt(bus, Interrupt::Nmi);
            return;
        }
        if (self.irq_request || bus.irq_line()) && !self.state.is_flag_set(IRQ_DISABLE) {
            self.irq_request = false;
            self.begin_interrupt(bus, Interrupt::Irq);
            return;
        }

        let pc = self.state.pc;
        let opcode = self.fetch_operand(bus);
        self.op = lookup(opcode);
        self.step = 0;
        if matches!(self.op.kind, OpKind::Jam) {
            warn!(
                opcode = format_args!("{opcode:#04X}"),
                pc = format_args!("{pc:#06X}"),
                "cpu jammed"
            );
            self.phase = Phase::Jammed;
        } else {
            self.phase = Phase::Execute;
        }
    }

    // ---------------------------------------------------------------------
    // Interrupt entry
    // ---------------------------------------------------------------------

    fn begin_interrupt<B: CpuBus>(&mut self, bus: &mut B, kind: Interrupt) {
        trace!(?kind, pc = format_args!("{:#06X}", self.state.pc), "interrupt entry");
        self.vector = match kind {
            Interrupt::Nmi => NMI_VECTOR,
            Interrupt::Irq => IRQ_VECTOR,
        };
        self.phase = Phase::Interrupt;
        self.step = 0;
        bus.read(self.state.pc);
    }

    fn interrupt_step<B: CpuBus>(&mut self, bus: &mut B) {
        match self.step {
            1 => {
                bus.read(self.state.pc);
            }
            2..=4 => self.push_interrupt_frame(bus, false),
            5 | 6 => self.load_vector(bus),
            n => unreachable!("interrupt entry has no step {n}"),
        }
    }

    /// Steps 2-4 of BRK and hardware interrupts: PCH, PCL, then P.
    fn push_interrupt_frame<B: CpuBus>(&mut self, bus: &mut B, set_break: bool) {
        match self.step {
            2 => {
                let addr = self.state.push_addr();
                bus.write(addr, (self.state.pc >> 8) as u8);
            }
            3 => {
                let addr = self.state.push_addr();
                bus.write(addr, self.state.pc as u8);
            }
            _ => {
                let p = self.state.compose_status_for_push(set_break);
                let addr = self.state.push_addr();
                bus.write(addr, p);
                self.state.assign_flag(IRQ_DISABLE, true);
            }
        }
    }

    /// Steps 5-6: vector low then high; completes the entry.
    fn load_vector<B: CpuBus>(&mut self, bus: &mut B) {
        if self.step == 5 {
            self.data = bus.read(self.vector);
        } else {
            let hi = bus.read(self.vector.wrapping_add(1)) as u16;
            self.state.pc = (hi << 8) | self.data as u16;
            self.interrupt_depth = self.interrupt_depth.saturating_add(1);
            self.finish();
        }
    }

    // ---------------------------------------------------------------------
    // Instruction microcode
    // ---------------------------------------------------------------------

    fn execute<B: CpuBus>(&mut self, bus: &mut B) {
        match self.op.kind {
            OpKind::Implied(f) => {
                bus.read(self.state.pc);
                f(&mut self.state);
                self.finish();
            }
            OpKind::Read(f) => self.read_step(bus, f),
            OpKind::Write(f) => self.write_step(bus, f),
            OpKind::Modify(f) => self.modify_step(bus, f),
            OpKind::Branch(cond) => self.branch_step(bus, cond),
            OpKind::Control(c) => self.control_step(bus, c),
            OpKind::Jam => unreachable!("JAM {:#04X} in execute phase", self.op.opcode),
        }
    }

    fn index_for(&self, mode: AddrMode) -> u8 {
        match mode {
            AddrMode::ZeroPageX | AddrMode::AbsoluteX | AddrMode::IndirectX => self.state.x,
            _ => self.state.y,
        }
    }

    /// One addressing tick. On the page-fixup tick of indexed modes the
    /// byte read at the uncorrected address is returned.
    fn address_step<B: CpuBus>(&mut self, bus: &mut B) -> Option<u8> {
        let mode = self.op.mode;
        match (mode, self.step) {
            (AddrMode::ZeroPage, 1) => self.addr = self.fetch_operand(bus) as u16,

            (AddrMode::ZeroPageX | AddrMode::ZeroPageY, 1) => {
                self.base = self.fetch_operand(bus) as u16;
            }
            (AddrMode::ZeroPageX | AddrMode::ZeroPageY, 2) => {
                bus.read(self.base);
                self.addr = (self.base as u8).wrapping_add(self.index_for(mode)) as u16;
            }

            (AddrMode::Absolute, 1) => self.addr = self.fetch_operand(bus) as u16,
            (AddrMode::Absolute, 2) => self.addr |= (self.fetch_operand(bus) as u16) << 8,

            (AddrMode::AbsoluteX | AddrMode::AbsoluteY, 1) => {
                self.base = self.fetch_operand(bus) as u16;
            }
            (AddrMode::AbsoluteX | AddrMode::AbsoluteY, 2) => {
                self.base |= (self.fetch_operand(bus) as u16) << 8;
                self.apply_index(mode);
            }

            (AddrMode::IndirectX, 1) => self.ptr = self.fetch_operand(bus),
            (AddrMode::IndirectX, 2) => {
                bus.read(self.ptr as u16);
                self.ptr = self.ptr.wrapping_add(self.state.x);
            }
            (AddrMode::IndirectX, 3) => self.addr = bus.read(self.ptr as u16) as u16,
            (AddrMode::IndirectX, 4) => {
                let hi = bus.read(self.ptr.wrapping_add(1) as u16) as u16;
                self.addr |= hi << 8;
            }

            (AddrMode::IndirectY, 1) => self.ptr = self.fetch_operand(bus),
            (AddrMode::IndirectY, 2) => self.base = bus.read(self.ptr as u16) as u16,
            (AddrMode::IndirectY, 3) => {
                let hi = bus.read(self.ptr.wrapping_add(1) as u16) as u16;
                self.base |= hi << 8;
                self.apply_index(mode);
            }

            (AddrMode::AbsoluteX | AddrMode::AbsoluteY, 3) | (AddrMode::IndirectY, 4) => {
                return Some(bus.read(uncorrected_address(self.base, self.addr)));
            }

            (mode, step) => unreachable!(
                "{} {:#04X}: no addressing step {step} for {mode:?}",
                self.op.mnemonic, self.op.opcode
            ),
        }
        None
    }

    fn apply_index(&mut self, mode: AddrMode) {
        let (addr, crossed) = index_address(self.base, self.index_for(mode));
        self.addr = addr;
        self.crossed = crossed;
    }

    /// High byte of the unindexed target plus one (SHX/SHY/AHX/TAS).
    fn store_high(&self) -> u8 {
        let base = if self.op.mode.is_indexed_absolute() { self.base } else { self.addr };
        ((base >> 8) as u8).wrapping_add(1)
    }

    fn read_step<B: CpuBus>(&mut self, bus: &mut B, f: ReadOp) {
        let mode = self.op.mode;
        if mode == AddrMode::Immediate {
            let v = self.fetch_operand(bus);
            f(&mut self.state, v);
            self.finish();
            return;
        }
        if self.step <= address_ticks(mode) {
            if let Some(v) = self.address_step(bus) {
                // Without a carry into the high byte the fixup read was the real one.
                if !self.crossed {
                    f(&mut self.state, v);
                    self.finish();
                }
            }
            return;
        }
        let v = bus.read(self.addr);
        f(&mut self.state, v);
        self.finish();
    }

    fn write_step<B: CpuBus>(&mut self, bus: &mut B, f: WriteOp) {
        if self.step <= address_ticks(self.op.mode) {
            self.address_step(bus);
            return;
        }
        let high = self.store_high();
        let v = f(&mut self.state, high);
        bus.write(self.addr, v);
        self.finish();
    }

    fn modify_step<B: CpuBus>(&mut self, bus: &mut B, f: ModifyOp) {
        let mode = self.op.mode;
        if mode == AddrMode::Accumulator {
            bus.read(self.state.pc);
            let a = self.state.a;
            self.state.a = f(&mut self.state, a);
            self.finish();
            return;
        }
        let ticks = address_ticks(mode);
        if self.step <= ticks {
            self.address_step(bus);
            return;
        }
        match self.step - ticks {
            1 => self.data = bus.read(self.addr),
            2 => {
                // Dummy write of the unmodified value.
                bus.write(self.addr, self.data);
                self.data = f(&mut self.state, self.data);
            }
            _ => {
                bus.write(self.addr, self.data);
                self.finish();
            }
        }
    }

    fn branch_step<B: CpuBus>(&mut self, bus: &mut B, cond: BranchCond) {
        match self.step {
            1 => {
                self.data = self.fetch_operand(bus);
                if !cond(&self.state) {
                    self.finish();
                }
            }
            2 => {
                bus.read(self.state.pc);
                let pc = self.state.pc;
                let target = pc.wrapping_add(self.data as i8 as u16);
                if (target & 0xFF00) == (pc & 0xFF00) {
                    self.state.pc = target;
                    self.finish();
                } else {
                    self.state.pc = uncorrected_address(pc, target);
                    self.addr = target;
                }
            }
            _ => {
                bus.read(self.state.pc);
                self.state.pc = self.addr;
                self.finish();
            }
        }
    }

    fn control_step<B: CpuBus>(&mut self, bus: &mut B, c: Control) {
        match c {
            Control::Brk => self.brk_step(bus),
            Control::Jsr => self.jsr_step(bus),
            Control::Rts => self.rts_step(bus),
            Control::Rti => self.rti_step(bus),
            Control::JmpAbsolute => {
                if self.step == 1 {
                    self.data = self.fetch_operand(bus);
                } else {
                    let hi = self.fetch_operand(bus) as u16;
                    self.state.pc = (hi << 8) | self.data as u16;
                    self.finish();
                }
            }
            Control::JmpIndirect => match self.step {
                1 => self.addr = self.fetch_operand(bus) as u16,
                2 => self.addr |= (self.fetch_operand(bus) as u16) << 8,
                3 => self.data = bus.read(self.addr),
                _ => {
                    let hi = bus.read(indirect_high_pointer(self.addr)) as u16;
                    self.state.pc = (hi << 8) | self.data as u16;
                    self.finish();
                }
            },
            Control::Pha | Control::Php => {
                if self.step == 1 {
                    bus.read(self.state.pc);
                } else {
                    let v = if c == Control::Pha {
                        self.state.a
                    } else {
                        self.state.compose_status_for_push(true)
                    };
                    let addr = self.state.push_addr();
                    bus.write(addr, v);
                    self.finish();
                }
            }
            Control::Pla | Control::Plp => match self.step {
                1 => {
                    bus.read(self.state.pc);
                }
                2 => {
                    bus.read(self.state.stack_addr());
                }
                _ => {
                    let addr = self.state.pull_addr();
                    let v = bus.read(addr);
                    if c == Control::Pla {
                        self.state.a = v;
                        self.state.update_zn(v);
                    } else {
                        self.state.restore_status(v);
                    }
                    self.finish();
                }
            },
        }
    }

    fn brk_step<B: CpuBus>(&mut self, bus: &mut B) {
        match self.step {
            1 => {
                // Padding byte is read and skipped.
                self.fetch_operand(bus);
            }
            2 => {
                if self.nmi_request {
                    self.nmi_request = false;
                    self.vector = NMI_VECTOR;
                    trace!(pc = format_args!("{:#06X}", self.state.pc), "brk hijacked by nmi");
                } else {
                    self.vector = IRQ_VECTOR;
                }
                self.push_interrupt_frame(bus, true);
            }
            3 | 4 => self.push_interrupt_frame(bus, true),
            _ => self.load_vector(bus),
        }
    }

    fn jsr_step<B: CpuBus>(&mut self, bus: &mut B) {
        match self.step {
            1 => self.data = self.fetch_operand(bus),
            2 => {
                bus.read(self.state.stack_addr());
            }
            3 => {
                let addr = self.state.push_addr();
                bus.write(addr, (self.state.pc >> 8) as u8);
            }
            4 => {
                let addr = self.state.push_addr();
                bus.write(addr, self.state.pc as u8);
            }
            _ => {
                let hi = bus.read(self.state.pc) as u16;
                self.state.pc = (hi << 8) | self.data as u16;
                self.finish();
            }
        }
    }

    fn rts_step<B: CpuBus>(&mut self, bus: &mut B) {
        match self.step {
            1 => {
                bus.read(self.state.pc);
            }
            2 => {
                bus.read(self.state.stack_addr());
            }
            3 => {
                let addr = self.state.pull_addr();
                self.data = bus.read(addr);
            }
            4 => {
                let addr = self.state.pull_addr();
                let hi = bus.read(addr) as u16;
                self.state.pc = (hi << 8) | self.data as u16;
            }
            _ => {
                bus.read(self.state.pc);
                self.state.advance_pc(1);
                self.finish();
            }
        }
    }

    fn rti_step<B: CpuBus>(&mut self, bus: &mut B) {
        match self.step {
            1 => {
                bus.read(self.state.pc);
            }
            2 => {
                bus.read(self.state.stack_addr());
            }
            3 => {
                let addr = self.state.pull_addr();
                let p = bus.read(addr);
                self.state.restore_status(p);
            }
            4 => {
                let addr = self.state.pull_addr();
                self.data = bus.read(addr);
            }
            _ => {
                let addr = self.state.pull_addr();
                let hi = bus.read(addr) as u16;
                self.state.pc = (hi << 8) | self.data as u16;
                if self.interrupt_depth == 0 {
                    warn!(
                        pc = format_args!("{:#06X}", self.state.pc),
                        "RTI with no interrupt in flight"
                    );
                } else {
                    self.interrupt_depth -= 1;
                }
                self.finish();
            }
        }
    }
}

/// Ticks spent forming the effective address, counting the page-fixup tick
/// of indexed modes.
const fn address_ticks(mode: AddrMode) -> u8 {
    match mode {
        AddrMode::ZeroPage => 1,
        AddrMode::ZeroPageX | AddrMode::ZeroPageY | AddrMode::Absolute => 2,
        AddrMode::AbsoluteX | AddrMode::AbsoluteY => 3,
        AddrMode::IndirectX | AddrMode::IndirectY => 4,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::state::{BREAK, CARRY, UNUSED};
    use crate::cpu::table::OPCODES;
    use crate::test_utils::{Access, FlatBus};

    fn boot(origin: u16, program: &[u8]) -> (Cpu, FlatBus) {
        let mut bus = FlatBus::with_program(origin, program);
        let mut cpu = Cpu::new();
        cpu.power_on(&mut bus);
        bus.log.clear();
        (cpu, bus)
    }

    #[test]
    fn power_on_loads_reset_vector() {
        let (cpu, _) = boot(0x8123, &[0xEA]);
        assert_eq!(cpu.pc(), 0x8123);
        assert_eq!(cpu.state().sp(), 0xFD);
        assert!(cpu.instruction_complete());
    }

    #[test]
    fn every_tick_is_one_bus_access() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xEE, 0x00, 0x03]); // INC $0300
        for n in 1..=6 {
            cpu.tick(&mut bus);
            assert_eq!(bus.log.len(), n);
        }
        assert!(cpu.instruction_complete());
        assert_eq!(bus.mem[0x0300], 1);
    }

    #[test]
    fn legal_opcode_ticks_match_descriptor_without_page_cross() {
        for op in OPCODES.iter().filter(|o| !o.illegal) {
            let mut program = vec![op.opcode, 0x10, 0x03];
            program.truncate(op.size as usize);
            let (mut cpu, mut bus) = boot(0x0200, &program);
            // (zp),Y and (zp,X) pointers land on $0400.
            bus.mem[0x10] = 0x00;
            bus.mem[0x11] = 0x04;
            bus.set_vector(IRQ_VECTOR, 0x0600);
            let expected = match op.kind {
                // Offset $10 stays in page $02: taken costs one extra tick.
                OpKind::Branch(cond) => op.cycles as u32 + cond(cpu.state()) as u32,
                _ => op.cycles as u32,
            };
            let ticks = cpu.step(&mut bus);
            assert_eq!(ticks, expected, "{} {:#04X} ({:?})", op.mnemonic, op.opcode, op.mode);
        }
    }

    #[test]
    fn indexed_read_pays_for_page_cross_only() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xBD, 0xF0, 0x02, 0xBD, 0x00, 0x03]);
        cpu.state_mut().set_x(0x20);
        bus.mem[0x0310] = 0x42;
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(cpu.state().a(), 0x42);
        assert_eq!(bus.reads(), vec![0x0200, 0x0201, 0x0202, 0x0210, 0x0310]);
        assert_eq!(cpu.step(&mut bus), 4);
    }

    #[test]
    fn indexed_write_always_pays_fixup_tick() {
        let (mut cpu, mut bus) = boot(0x0200, &[0x9D, 0x00, 0x03]); // STA $0300,X
        cpu.state_mut().set_a(0x77);
        cpu.state_mut().set_x(0x01);
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(bus.writes(), vec![(0x0301, 0x77)]);
        assert_eq!(bus.reads()[3], 0x0301, "dummy read before the store");
    }

    #[test]
    fn indirect_y_page_cross_adds_a_tick() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xB1, 0x40]); // LDA ($40),Y
        bus.mem[0x40] = 0xFF;
        bus.mem[0x41] = 0x03;
        bus.mem[0x0400] = 0x99;
        cpu.state_mut().set_y(0x01);
        assert_eq!(cpu.step(&mut bus), 6);
        assert_eq!(cpu.state().a(), 0x99);
        assert_eq!(bus.reads()[4], 0x0300);
    }

    #[test]
    fn indexed_indirect_pointer_wraps_in_zero_page() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xA1, 0xFE]); // LDA ($FE,X)
        cpu.state_mut().set_x(0x01);
        bus.mem[0xFF] = 0x34;
        bus.mem[0x00] = 0x12;
        bus.mem[0x1234] = 0x5A;
        assert_eq!(cpu.step(&mut bus), 6);
        assert_eq!(cpu.state().a(), 0x5A);
    }

    #[test]
    fn zero_page_indexed_wraps_and_dummy_reads_base() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xB5, 0xF0]); // LDA $F0,X
        cpu.state_mut().set_x(0x20);
        bus.mem[0x0010] = 0x3C;
        assert_eq!(cpu.step(&mut bus), 4);
        assert_eq!(cpu.state().a(), 0x3C);
        assert_eq!(bus.reads(), vec![0x0200, 0x0201, 0x00F0, 0x0010]);
    }

    #[test]
    fn rmw_writes_old_value_then_new() {
        let (mut cpu, mut bus) = boot(0x0200, &[0x06, 0x20]); // ASL $20
        bus.mem[0x20] = 0x81;
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(bus.writes(), vec![(0x0020, 0x81), (0x0020, 0x02)]);
        assert!(cpu.state().is_flag_set(CARRY));
    }

    #[test]
    fn branch_taken_within_page_costs_one_tick() {
        // BCC sits at $00EE so PC is $00F0 once the offset is fetched.
        let (mut cpu, mut bus) = boot(0x00EE, &[0x90, 0x04]);
        assert_eq!(cpu.step(&mut bus), 3);
        assert_eq!(cpu.pc(), 0x00F4);
    }

    #[test]
    fn branch_taken_across_page_costs_two_ticks() {
        let (mut cpu, mut bus) = boot(0x00FC, &[0x90, 0x04]);
        assert_eq!(cpu.step(&mut bus), 4);
        assert_eq!(cpu.pc(), 0x0102);
        assert_eq!(bus.reads(), vec![0x00FC, 0x00FD, 0x00FE, 0x0002]);
    }

    #[test]
    fn branch_not_taken_costs_nothing_extra() {
        let (mut cpu, mut bus) = boot(0x00EE, &[0x90, 0x04]);
        cpu.state_mut().assign_flag(CARRY, true);
        assert_eq!(cpu.step(&mut bus), 2);
        assert_eq!(cpu.pc(), 0x00F0);
    }

    #[test]
    fn jmp_indirect_high_byte_wraps_within_page() {
        let (mut cpu, mut bus) = boot(0x0400, &[0x6C, 0xFF, 0x02]);
        bus.mem[0x02FF] = 0x34;
        bus.mem[0x0200] = 0x12;
        bus.mem[0x0300] = 0x56;
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(cpu.pc(), 0x1234);
    }

    #[test]
    fn jsr_and_rts_round_trip() {
        let (mut cpu, mut bus) = boot(0x0200, &[0x20, 0x00, 0x03]);
        bus.mem[0x0300] = 0x60; // RTS
        assert_eq!(cpu.step(&mut bus), 6);
        assert_eq!(cpu.pc(), 0x0300);
        assert_eq!(bus.mem[0x01FD], 0x02);
        assert_eq!(bus.mem[0x01FC], 0x02);
        assert_eq!(cpu.step(&mut bus), 6);
        assert_eq!(cpu.pc(), 0x0203);
        assert_eq!(cpu.state().sp(), 0xFD);
    }

    #[test]
    fn stack_push_and_pull() {
        // LDA #$80; PHA; LDA #$00; PLA; PHP; PLP
        let (mut cpu, mut bus) = boot(0x0200, &[0xA9, 0x80, 0x48, 0xA9, 0x00, 0x68, 0x08, 0x28]);
        cpu.step(&mut bus);
        assert_eq!(cpu.step(&mut bus), 3);
        cpu.step(&mut bus);
        assert_eq!(cpu.step(&mut bus), 4);
        assert_eq!(cpu.state().a(), 0x80);
        assert!(cpu.state().is_flag_set(crate::cpu::state::NEGATIVE));
        cpu.step(&mut bus);
        assert_ne!(bus.mem[0x01FD] & BREAK, 0, "PHP pushes B set");
        cpu.step(&mut bus);
        assert_eq!(cpu.state().status() & BREAK, 0, "PLP never latches B");
    }

    #[test]
    fn nmi_entry_takes_seven_ticks_and_pushes_b_clear() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xEA]);
        bus.set_vector(NMI_VECTOR, 0x0500);
        cpu.state_mut().assign_flag(CARRY, true);
        cpu.enqueue_nmi();
        assert_eq!(cpu.step(&mut bus), 7);
        assert_eq!(cpu.pc(), 0x0500);
        assert!(!cpu.nmi_pending());
        assert_eq!(bus.mem[0x01FD], 0x02);
        assert_eq!(bus.mem[0x01FC], 0x00);
        let pushed = bus.mem[0x01FB];
        assert_eq!(pushed & BREAK, 0);
        assert_ne!(pushed & UNUSED, 0);
        assert_ne!(pushed & CARRY, 0);
        assert!(cpu.state().is_flag_set(IRQ_DISABLE));
        assert_eq!(&bus.reads()[..2], &[0x0200, 0x0200]);
    }

    #[test]
    fn irq_respects_interrupt_disable() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xEA, 0x58, 0xEA]); // NOP; CLI; NOP
        bus.set_vector(IRQ_VECTOR, 0x0600);
        bus.irq = true;
        assert_eq!(cpu.step(&mut bus), 2, "masked: NOP runs");
        assert_eq!(cpu.step(&mut bus), 2, "CLI");
        assert_eq!(cpu.step(&mut bus), 7, "line asserted and I clear");
        assert_eq!(cpu.pc(), 0x0600);
        assert_eq!(bus.mem[0x01FB] & BREAK, 0);
    }

    #[test]
    fn enqueued_irq_is_taken_once() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xEA]);
        bus.set_vector(IRQ_VECTOR, 0x0600);
        bus.mem[0x0600] = 0xEA;
        cpu.state_mut().assign_flag(IRQ_DISABLE, false);
        cpu.enqueue_irq();
        assert_eq!(cpu.step(&mut bus), 7);
        assert!(!cpu.irq_pending());
        assert_eq!(cpu.step(&mut bus), 2);
    }

    #[test]
    fn requests_during_entry_are_ignored() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xEA]);
        bus.set_vector(NMI_VECTOR, 0x0500);
        bus.mem[0x0500] = 0xEA;
        cpu.enqueue_nmi();
        cpu.tick(&mut bus);
        cpu.tick(&mut bus);
        cpu.enqueue_nmi();
        assert!(!cpu.nmi_pending());
        while !cpu.instruction_complete() {
            cpu.tick(&mut bus);
        }
        assert_eq!(cpu.step(&mut bus), 2, "NOP, not a second entry");
    }

    #[test]
    fn brk_pushes_b_set_and_uses_irq_vector() {
        let (mut cpu, mut bus) = boot(0x0200, &[0x00, 0xFF]);
        bus.set_vector(IRQ_VECTOR, 0x0600);
        assert_eq!(cpu.step(&mut bus), 7);
        assert_eq!(cpu.pc(), 0x0600);
        assert_eq!(bus.mem[0x01FD], 0x02);
        assert_eq!(bus.mem[0x01FC], 0x02, "return skips the padding byte");
        assert_ne!(bus.mem[0x01FB] & BREAK, 0);
    }

    #[test]
    fn brk_is_hijacked_by_pending_nmi() {
        let (mut cpu, mut bus) = boot(0x0200, &[0x00, 0xFF]);
        bus.set_vector(IRQ_VECTOR, 0x0600);
        bus.set_vector(NMI_VECTOR, 0x0500);
        cpu.tick(&mut bus);
        cpu.tick(&mut bus);
        cpu.enqueue_nmi();
        while !cpu.instruction_complete() {
            cpu.tick(&mut bus);
        }
        assert_eq!(cpu.pc(), 0x0500);
        assert!(!cpu.nmi_pending());
        assert_ne!(bus.mem[0x01FB] & BREAK, 0, "pushed P still carries B");
    }

    #[test]
    fn rti_returns_from_interrupt() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xEA]);
        bus.set_vector(NMI_VECTOR, 0x0500);
        bus.mem[0x0500] = 0x40; // RTI
        cpu.enqueue_nmi();
        cpu.step(&mut bus);
        assert_eq!(cpu.step(&mut bus), 6);
        assert_eq!(cpu.pc(), 0x0200);
        assert_eq!(cpu.state().sp(), 0xFD);
    }

    #[test]
    fn rti_without_interrupt_keeps_running() {
        let (mut cpu, mut bus) = boot(0x0200, &[0x40]);
        cpu.state_mut().set_sp(0xFA);
        bus.mem[0x01FB] = CARRY;
        bus.mem[0x01FC] = 0x00;
        bus.mem[0x01FD] = 0x03;
        assert_eq!(cpu.step(&mut bus), 6);
        assert_eq!(cpu.pc(), 0x0300);
        assert!(cpu.state().is_flag_set(CARRY));
    }

    #[test]
    fn jam_halts_and_reads_ffff_until_reset() {
        let (mut cpu, mut bus) = boot(0x0200, &[0x02]);
        cpu.step(&mut bus);
        assert!(cpu.is_jammed());
        bus.log.clear();
        cpu.enqueue_nmi();
        for _ in 0..4 {
            cpu.tick(&mut bus);
        }
        assert_eq!(bus.log, vec![Access::Read(0xFFFF); 4]);
        cpu.reset(&mut bus);
        assert!(!cpu.is_jammed());
        assert_eq!(cpu.pc(), 0x0200);
    }

    #[test]
    fn reset_discards_instruction_in_flight() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xAD, 0x00, 0x03]);
        cpu.tick(&mut bus);
        cpu.tick(&mut bus);
        assert_eq!(cpu.phase(), Phase::Execute);
        cpu.reset(&mut bus);
        assert_eq!(cpu.phase(), Phase::Fetch);
        assert_eq!(cpu.pc(), 0x0200);
        assert_eq!(cpu.step(&mut bus), 4);
    }

    #[test]
    fn reset_restores_power_on_registers() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xEA]);
        let powered = *cpu.state();
        {
            let s = cpu.state_mut();
            s.set_a(0x11);
            s.set_x(0x22);
            s.set_y(0x33);
            s.set_sp(0x40);
            s.set_status(0xC3);
        }
        cpu.enqueue_nmi();
        cpu.reset(&mut bus);
        assert_eq!(cpu.state(), &powered);
        assert_eq!(
            (cpu.state().a(), cpu.state().x(), cpu.state().y()),
            (0x00, 0x00, 0x00)
        );
        assert_eq!(cpu.state().sp(), 0xFD);
        assert_eq!(cpu.state().status(), 0x24);
        assert!(!cpu.nmi_pending());
    }

    #[test]
    fn warm_reset_keeps_registers_and_drops_sp() {
        let (mut cpu, mut bus) = boot(0x0200, &[0xEA]);
        cpu.state_mut().set_a(0x11);
        cpu.state_mut().set_x(0x22);
        cpu.warm_reset(&mut bus);
        assert_eq!(cpu.state().a(), 0x11);
        assert_eq!(cpu.state().x(), 0x22);
        assert_eq!(cpu.state().sp(), 0xFA);
        assert!(cpu.state().is_flag_set(IRQ_DISABLE));
        assert_eq!(cpu.pc(), 0x0200);
    }

    #[test]
    fn unstable_store_masks_with_high_byte() {
        let (mut cpu, mut bus) = boot(0x0200, &[0x9E, 0x00, 0x03]); // SHX $0300,Y
        cpu.state_mut().set_x(0xFF);
        cpu.state_mut().set_y(0x05);
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(bus.writes(), vec![(0x0305, 0x04)]);
    }
}
