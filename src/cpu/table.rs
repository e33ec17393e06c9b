/*!
table.rs - Compile-time opcode descriptor table.

Design
------
- `OPCODES: [Opcode; 256]` is a `static` produced by a `const fn`, so the
  table costs nothing at startup and cannot drift at runtime.
- Each descriptor carries the mnemonic, addressing mode, operation kind
  (with its handler from `execute.rs`), base cycle count, size, and the
  illegal/unstable markers used by the disassembler and tests.
- Base cycles are derived from (mode, kind) rather than typed per row, so
  a row cannot disagree with the microcode that executes it. Page-cross
  and branch penalties are not included.
*/

use crate::cpu::addressing::AddrMode::{self, *};
use crate::cpu::execute::{self as ex, BranchCond, ImpliedOp, ModifyOp, ReadOp, WriteOp};

/// Instructions with bespoke microcode (stack and control transfer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Brk,
    Jsr,
    Rts,
    Rti,
    JmpAbsolute,
    JmpIndirect,
    Pha,
    Php,
    Pla,
    Plp,
}

/// Operation kind plus the handler the microcode calls.
#[derive(Debug, Clone, Copy)]
pub enum OpKind {
    Read(ReadOp),
    Write(WriteOp),
    Modify(ModifyOp),
    Implied(ImpliedOp),
    Branch(BranchCond),
    Control(Control),
    Jam,
}

/// Operation class without the handler, for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    Read,
    ReadModifyWrite,
    Write,
    Implied,
    Branch,
    Control,
    Jam,
}

#[derive(Debug, Clone, Copy)]
pub struct Opcode {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub mode: AddrMode,
    pub kind: OpKind,
    pub cycles: u8,
    pub size: u8,
    pub illegal: bool,
    pub unstable: bool,
}

impl Opcode {
    const fn new(mnemonic: &'static str, mode: AddrMode, kind: OpKind) -> Self {
        Self {
            opcode: 0,
            mnemonic,
            mode,
            kind,
            cycles: base_cycles(mode, kind),
            size: 1 + mode.operand_len(),
            illegal: false,
            unstable: false,
        }
    }

    const fn illegal(mut self) -> Self {
        self.illegal = true;
        self
    }

    const fn unstable(mut self) -> Self {
        self.illegal = true;
        self.unstable = true;
        self
    }

    pub fn class(&self) -> OpClass {
        match self.kind {
            OpKind::Read(_) => OpClass::Read,
            OpKind::Write(_) => OpClass::Write,
            OpKind::Modify(_) => OpClass::ReadModifyWrite,
            OpKind::Implied(_) => OpClass::Implied,
            OpKind::Branch(_) => OpClass::Branch,
            OpKind::Control(_) => OpClass::Control,
            OpKind::Jam => OpClass::Jam,
        }
    }

    /// False only for JAM, which has no operation to run.
    pub fn has_handler(&self) -> bool {
        !matches!(self.kind, OpKind::Jam)
    }
}

const fn base_cycles(mode: AddrMode, kind: OpKind) -> u8 {
    match kind {
        OpKind::Implied(_) | OpKind::Branch(_) | OpKind::Jam => 2,
        OpKind::Control(c) => match c {
            Control::Brk => 7,
            Control::Jsr | Control::Rts | Control::Rti => 6,
            Control::JmpAbsolute => 3,
            Control::JmpIndirect => 5,
            Control::Pha | Control::Php => 3,
            Control::Pla | Control::Plp => 4,
        },
        OpKind::Read(_) => match mode {
            ZeroPage => 3,
            ZeroPageX | ZeroPageY | Absolute | AbsoluteX | AbsoluteY => 4,
            IndirectX => 6,
            IndirectY => 5,
            _ => 2,
        },
        OpKind::Write(_) => match mode {
            ZeroPage => 3,
            ZeroPageX | ZeroPageY | Absolute => 4,
            AbsoluteX | AbsoluteY => 5,
            IndirectX | IndirectY => 6,
            _ => 2,
        },
        OpKind::Modify(_) => match mode {
            ZeroPage => 5,
            ZeroPageX | Absolute => 6,
            AbsoluteX | AbsoluteY => 7,
            IndirectX | IndirectY => 8,
            _ => 2,
        },
    }
}

const fn read(m: &'static str, mode: AddrMode, f: ReadOp) -> Opcode {
    Opcode::new(m, mode, OpKind::Read(f))
}

const fn write(m: &'static str, mode: AddrMode, f: WriteOp) -> Opcode {
    Opcode::new(m, mode, OpKind::Write(f))
}

const fn modify(m: &'static str, mode: AddrMode, f: ModifyOp) -> Opcode {
    Opcode::new(m, mode, OpKind::Modify(f))
}

const fn implied(m: &'static str, f: ImpliedOp) -> Opcode {
    Opcode::new(m, Implied, OpKind::Implied(f))
}

const fn branch(m: &'static str, f: BranchCond) -> Opcode {
    Opcode::new(m, Relative, OpKind::Branch(f))
}

const fn control(m: &'static str, mode: AddrMode, c: Control) -> Opcode {
    Opcode::new(m, mode, OpKind::Control(c))
}

const JAM: Opcode = Opcode::new("JAM", Implied, OpKind::Jam).illegal();

const fn nop(mode: AddrMode) -> Opcode {
    match mode {
        Implied => implied("NOP", ex::nop).illegal(),
        _ => read("NOP", mode, ex::nop_read).illegal(),
    }
}

const fn describe(op: u8) -> Opcode {
    match op {
        // 0x00 - 0x1F
        0x00 => control("BRK", Implied, Control::Brk),
        0x01 => read("ORA", IndirectX, ex::ora),
        0x03 => modify("SLO", IndirectX, ex::slo).illegal(),
        0x04 => nop(ZeroPage),
        0x05 => read("ORA", ZeroPage, ex::ora),
        0x06 => modify("ASL", ZeroPage, ex::asl),
        0x07 => modify("SLO", ZeroPage, ex::slo).illegal(),
        0x08 => control("PHP", Implied, Control::Php),
        0x09 => read("ORA", Immediate, ex::ora),
        0x0A => modify("ASL", Accumulator, ex::asl),
        0x0B => read("ANC", Immediate, ex::anc).unstable(),
        0x0C => nop(Absolute),
        0x0D => read("ORA", Absolute, ex::ora),
        0x0E => modify("ASL", Absolute, ex::asl),
        0x0F => modify("SLO", Absolute, ex::slo).illegal(),
        0x10 => branch("BPL", ex::bpl),
        0x11 => read("ORA", IndirectY, ex::ora),
        0x13 => modify("SLO", IndirectY, ex::slo).illegal(),
        0x14 => nop(ZeroPageX),
        0x15 => read("ORA", ZeroPageX, ex::ora),
        0x16 => modify("ASL", ZeroPageX, ex::asl),
        0x17 => modify("SLO", ZeroPageX, ex::slo).illegal(),
        0x18 => implied("CLC", ex::clc),
        0x19 => read("ORA", AbsoluteY, ex::ora),
        0x1A => nop(Implied),
        0x1B => modify("SLO", AbsoluteY, ex::slo).illegal(),
        0x1C => nop(AbsoluteX),
        0x1D => read("ORA", AbsoluteX, ex::ora),
        0x1E => modify("ASL", AbsoluteX, ex::asl),
        0x1F => modify("SLO", AbsoluteX, ex::slo).illegal(),

        // 0x20 - 0x3F
        0x20 => control("JSR", Absolute, Control::Jsr),
        0x21 => read("AND", IndirectX, ex::and),
        0x23 => modify("RLA", IndirectX, ex::rla).illegal(),
        0x24 => read("BIT", ZeroPage, ex::bit),
        0x25 => read("AND", ZeroPage, ex::and),
        0x26 => modify("ROL", ZeroPage, ex::rol),
        0x27 => modify("RLA", ZeroPage, ex::rla).illegal(),
        0x28 => control("PLP", Implied, Control::Plp),
        0x29 => read("AND", Immediate, ex::and),
        0x2A => modify("ROL", Accumulator, ex::rol),
        0x2B => read("ANC", Immediate, ex::anc).unstable(),
        0x2C => read("BIT", Absolute, ex::bit),
        0x2D => read("AND", Absolute, ex::and),
        0x2E => modify("ROL", Absolute, ex::rol),
        0x2F => modify("RLA", Absolute, ex::rla).illegal(),
        0x30 => branch("BMI", ex::bmi),
        0x31 => read("AND", IndirectY, ex::and),
        0x33 => modify("RLA", IndirectY, ex::rla).illegal(),
        0x34 => nop(ZeroPageX),
        0x35 => read("AND", ZeroPageX, ex::and),
        0x36 => modify("ROL", ZeroPageX, ex::rol),
        0x37 => modify("RLA", ZeroPageX, ex::rla).illegal(),
        0x38 => implied("SEC", ex::sec),
        0x39 => read("AND", AbsoluteY, ex::and),
        0x3A => nop(Implied),
        0x3B => modify("RLA", AbsoluteY, ex::rla).illegal(),
        0x3C => nop(AbsoluteX),
        0x3D => read("AND", AbsoluteX, ex::and),
        0x3E => modify("ROL", AbsoluteX, ex::rol),
        0x3F => modify("RLA", AbsoluteX, ex::rla).illegal(),

        // 0x40 - 0x5F
        0x40 => control("RTI", Implied, Control::Rti),
        0x41 => read("EOR", IndirectX, ex::eor),
        0x43 => modify("SRE", IndirectX, ex::sre).illegal(),
        0x44 => nop(ZeroPage),
        0x45 => read("EOR", ZeroPage, ex::eor),
        0x46 => modify("LSR", ZeroPage, ex::lsr),
        0x47 => modify("SRE", ZeroPage, ex::sre).illegal(),
        0x48 => control("PHA", Implied, Control::Pha),
        0x49 => read("EOR", Immediate, ex::eor),
        0x4A => modify("LSR", Accumulator, ex::lsr),
        0x4B => read("ALR", Immediate, ex::alr).unstable(),
        0x4C => control("JMP", Absolute, Control::JmpAbsolute),
        0x4D => read("EOR", Absolute, ex::eor),
        0x4E => modify("LSR", Absolute, ex::lsr),
        0x4F => modify("SRE", Absolute, ex::sre).illegal(),
        0x50 => branch("BVC", ex::bvc),
        0x51 => read("EOR", IndirectY, ex::eor),
        0x53 => modify("SRE", IndirectY, ex::sre).illegal(),
        0x54 => nop(ZeroPageX),
        0x55 => read("EOR", ZeroPageX, ex::eor),
        0x56 => modify("LSR", ZeroPageX, ex::lsr),
        0x57 => modify("SRE", ZeroPageX, ex::sre).illegal(),
        0x58 => implied("CLI", ex::cli),
        0x59 => read("EOR", AbsoluteY, ex::eor),
        0x5A => nop(Implied),
        0x5B => modify("SRE", AbsoluteY, ex::sre).illegal(),
        0x5C => nop(AbsoluteX),
        0x5D => read("EOR", AbsoluteX, ex::eor),
        0x5E => modify("LSR", AbsoluteX, ex::lsr),
        0x5F => modify("SRE", AbsoluteX, ex::sre).illegal(),

        // 0x60 - 0x7F
        0x60 => control("RTS", Implied, Control::Rts),
        0x61 => read("ADC", IndirectX, ex::adc),
        0x63 => modify("RRA", IndirectX, ex::rra).illegal(),
        0x64 => nop(ZeroPage),
        0x65 => read("ADC", ZeroPage, ex::adc),
        0x66 => modify("ROR", ZeroPage, ex::ror),
        0x67 => modify("RRA", ZeroPage, ex::rra).illegal(),
        0x68 => control("PLA", Implied, Control::Pla),
        0x69 => read("ADC", Immediate, ex::adc),
        0x6A => modify("ROR", Accumulator, ex::ror),
        0x6B => read("ARR", Immediate, ex::arr).unstable(),
        0x6C => control("JMP", Indirect, Control::JmpIndirect),
        0x6D => read("ADC", Absolute, ex::adc),
        0x6E => modify("ROR", Absolute, ex::ror),
        0x6F => modify("RRA", Absolute, ex::rra).illegal(),
        0x70 => branch("BVS", ex::bvs),
        0x71 => read("ADC", IndirectY, ex::adc),
        0x73 => modify("RRA", IndirectY, ex::rra).illegal(),
        0x74 => nop(ZeroPageX),
        0x75 => read("ADC", ZeroPageX, ex::adc),
        0x76 => modify("ROR", ZeroPageX, ex::ror),
        0x77 => modify("RRA", ZeroPageX, ex::rra).illegal(),
        0x78 => implied("SEI", ex::sei),
        0x79 => read("ADC", AbsoluteY, ex::adc),
        0x7A => nop(Implied),
        0x7B => modify("RRA", AbsoluteY, ex::rra).illegal(),
        0x7C => nop(AbsoluteX),
        0x7D => read("ADC", AbsoluteX, ex::adc),
        0x7E => modify("ROR", AbsoluteX, ex::ror),
        0x7F => modify("RRA", AbsoluteX, ex::rra).illegal(),

        // 0x80 - 0x9F
        0x80 => nop(Immediate),
        0x81 => write("STA", IndirectX, ex::sta),
        0x82 => nop(Immediate),
        0x83 => write("SAX", IndirectX, ex::sax).illegal(),
        0x84 => write("STY", ZeroPage, ex::sty),
        0x85 => write("STA", ZeroPage, ex::sta),
        0x86 => write("STX", ZeroPage, ex::stx),
        0x87 => write("SAX", ZeroPage, ex::sax).illegal(),
        0x88 => implied("DEY", ex::dey),
        0x89 => nop(Immediate),
        0x8A => implied("TXA", ex::txa),
        0x8B => read("XAA", Immediate, ex::xaa).unstable(),
        0x8C => write("STY", Absolute, ex::sty),
        0x8D => write("STA", Absolute, ex::sta),
        0x8E => write("STX", Absolute, ex::stx),
        0x8F => write("SAX", Absolute, ex::sax).illegal(),
        0x90 => branch("BCC", ex::bcc),
        0x91 => write("STA", IndirectY, ex::sta),
        0x93 => write("AHX", IndirectY, ex::ahx).unstable(),
        0x94 => write("STY", ZeroPageX, ex::sty),
        0x95 => write("STA", ZeroPageX, ex::sta),
        0x96 => write("STX", ZeroPageY, ex::stx),
        0x97 => write("SAX", ZeroPageY, ex::sax).illegal(),
        0x98 => implied("TYA", ex::tya),
        0x99 => write("STA", AbsoluteY, ex::sta),
        0x9A => implied("TXS", ex::txs),
        0x9B => write("TAS", AbsoluteY, ex::tas).unstable(),
        0x9C => write("SHY", AbsoluteX, ex::shy).unstable(),
        0x9D => write("STA", AbsoluteX, ex::sta),
        0x9E => write("SHX", AbsoluteY, ex::shx).unstable(),
        0x9F => write("AHX", AbsoluteY, ex::ahx).unstable(),

        // 0xA0 - 0xBF
        0xA0 => read("LDY", Immediate, ex::ldy),
        0xA1 => read("LDA", IndirectX, ex::lda),
        0xA2 => read("LDX", Immediate, ex::ldx),
        0xA3 => read("LAX", IndirectX, ex::lax).illegal(),
        0xA4 => read("LDY", ZeroPage, ex::ldy),
        0xA5 => read("LDA", ZeroPage, ex::lda),
        0xA6 => read("LDX", ZeroPage, ex::ldx),
        0xA7 => read("LAX", ZeroPage, ex::lax).illegal(),
        0xA8 => implied("TAY", ex::tay),
        0xA9 => read("LDA", Immediate, ex::lda),
        0xAA => implied("TAX", ex::tax),
        0xAB => read("LXA", Immediate, ex::lxa).unstable(),
        0xAC => read("LDY", Absolute, ex::ldy),
        0xAD => read("LDA", Absolute, ex::lda),
        0xAE => read("LDX", Absolute, ex::ldx),
        0xAF => read("LAX", Absolute, ex::lax).illegal(),
        0xB0 => branch("BCS", ex::bcs),
        0xB1 => read("LDA", IndirectY, ex::lda),
        0xB3 => read("LAX", IndirectY, ex::lax).illegal(),
        0xB4 => read("LDY", ZeroPageX, ex::ldy),
        0xB5 => read("LDA", ZeroPageX, ex::lda),
        0xB6 => read("LDX", ZeroPageY, ex::ldx),
        0xB7 => read("LAX", ZeroPageY, ex::lax).illegal(),
        0xB8 => implied("CLV", ex::clv),
        0xB9 => read("LDA", AbsoluteY, ex::lda),
        0xBA => implied("TSX", ex::tsx),
        0xBB => read("LAS", AbsoluteY, ex::las).unstable(),
        0xBC => read("LDY", AbsoluteX, ex::ldy),
        0xBD => read("LDA", AbsoluteX, ex::lda),
        0xBE => read("LDX", AbsoluteY, ex::ldx),
        0xBF => read("LAX", AbsoluteY, ex::lax).illegal(),

        // 0xC0 - 0xDF
        0xC0 => read("CPY", Immediate, ex::cpy),
        0xC1 => read("CMP", IndirectX, ex::cmp),
        0xC2 => nop(Immediate),
        0xC3 => modify("DCP", IndirectX, ex::dcp).illegal(),
        0xC4 => read("CPY", ZeroPage, ex::cpy),
        0xC5 => read("CMP", ZeroPage, ex::cmp),
        0xC6 => modify("DEC", ZeroPage, ex::dec),
        0xC7 => modify("DCP", ZeroPage, ex::dcp).illegal(),
        0xC8 => implied("INY", ex::iny),
        0xC9 => read("CMP", Immediate, ex::cmp),
        0xCA => implied("DEX", ex::dex),
        0xCB => read("AXS", Immediate, ex::axs).unstable(),
        0xCC => read("CPY", Absolute, ex::cpy),
        0xCD => read("CMP", Absolute, ex::cmp),
        0xCE => modify("DEC", Absolute, ex::dec),
        0xCF => modify("DCP", Absolute, ex::dcp).illegal(),
        0xD0 => branch("BNE", ex::bne),
        0xD1 => read("CMP", IndirectY, ex::cmp),
        0xD3 => modify("DCP", IndirectY, ex::dcp).illegal(),
        0xD4 => nop(ZeroPageX),
        0xD5 => read("CMP", ZeroPageX, ex::cmp),
        0xD6 => modify("DEC", ZeroPageX, ex::dec),
        0xD7 => modify("DCP", ZeroPageX, ex::dcp).illegal(),
        0xD8 => implied("CLD", ex::cld),
        0xD9 => read("CMP", AbsoluteY, ex::cmp),
        0xDA => nop(Implied),
        0xDB => modify("DCP", AbsoluteY, ex::dcp).illegal(),
        0xDC => nop(AbsoluteX),
        0xDD => read("CMP", AbsoluteX, ex::cmp),
        0xDE => modify("DEC", AbsoluteX, ex::dec),
        0xDF => modify("DCP", AbsoluteX, ex::dcp).illegal(),

        // 0xE0 - 0xFF
        0xE0 => read("CPX", Immediate, ex::cpx),
        0xE1 => read("SBC", IndirectX, ex::sbc),
        0xE2 => nop(Immediate),
        0xE3 => modify("ISB", IndirectX, ex::isb).illegal(),
        0xE4 => read("CPX", ZeroPage, ex::cpx),
        0xE5 => read("SBC", ZeroPage, ex::sbc),
        0xE6 => modify("INC", ZeroPage, ex::inc),
        0xE7 => modify("ISB", ZeroPage, ex::isb).illegal(),
        0xE8 => implied("INX", ex::inx),
        0xE9 => read("SBC", Immediate, ex::sbc),
        0xEA => implied("NOP", ex::nop),
        0xEB => read("SBC", Immediate, ex::sbc).illegal(),
        0xEC => read("CPX", Absolute, ex::cpx),
        0xED => read("SBC", Absolute, ex::sbc),
        0xEE => modify("INC", Absolute, ex::inc),
        0xEF => modify("ISB", Absolute, ex::isb).illegal(),
        0xF0 => branch("BEQ", ex::beq),
        0xF1 => read("SBC", IndirectY, ex::sbc),
        0xF3 => modify("ISB", IndirectY, ex::isb).illegal(),
        0xF4 => nop(ZeroPageX),
        0xF5 => read("SBC", ZeroPageX, ex::sbc),
        0xF6 => modify("INC", ZeroPageX, ex::inc),
        0xF7 => modify("ISB", ZeroPageX, ex::isb).illegal(),
        0xF8 => implied("SED", ex::sed),
        0xF9 => read("SBC", AbsoluteY, ex::sbc),
        0xFA => nop(Implied),
        0xFB => modify("ISB", AbsoluteY, ex::isb).illegal(),
        0xFC => nop(AbsoluteX),
        0xFD => read("SBC", AbsoluteX, ex::sbc),
        0xFE => modify("INC", AbsoluteX, ex::inc),
        0xFF => modify("ISB", AbsoluteX, ex::isb).illegal(),

        0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2 | 0xF2 => JAM,
    }
}

const fn build_table() -> [Opcode; 256] {
    let mut table = [JAM; 256];
    let mut i = 0;
    while i < 256 {
        let mut entry = describe(i as u8);
        entry.opcode = i as u8;
        table[i] = entry;
        i += 1;
    }
    table
}

pub static OPCODES: [Opcode; 256] = build_table();

/// Descriptor for an opcode byte.
#[inline]
pub fn lookup(opcode: u8) -> &'static Opcode {
    &OPCODES[opcode as usize]
}
