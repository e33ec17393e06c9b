/*!
addressing.rs - 6502 addressing modes.

Overview
========
`AddrMode` names how an instruction forms its operand. The microcode in
`cpu::core` walks a mode one bus access per tick; this module only carries
the static facts about each mode (operand length, whether an index is
applied after the base address is known, operand text for disassembly).

Hardware quirks the microcode reproduces per mode
=================================================
- ZeroPageX/Y: dummy read of the unindexed zero-page address; the sum wraps
  inside page zero.
- AbsoluteX/Y, IndirectY: dummy read at the address formed with the
  uncorrected high byte. Reads skip the extra tick when no page is crossed;
  writes and read-modify-writes always pay it.
- IndirectX: dummy read of the pointer, pointer wraps inside page zero.
- Indirect (JMP only): the high byte is fetched from the start of the same
  page when the pointer's low byte is $FF.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddrMode {
    /// Operand bytes following the opcode.
    pub const fn operand_len(self) -> u8 {
        match self {
            AddrMode::Implied | AddrMode::Accumulator => 0,
            AddrMode::Immediate
            | AddrMode::ZeroPage
            | AddrMode::ZeroPageX
            | AddrMode::ZeroPageY
            | AddrMode::IndirectX
            | AddrMode::IndirectY
            | AddrMode::Relative => 1,
            AddrMode::Absolute
            | AddrMode::AbsoluteX
            | AddrMode::AbsoluteY
            | AddrMode::Indirect => 2,
        }
    }

    /// True for modes whose final address may cross a page after indexing.
    pub const fn is_indexed_absolute(self) -> bool {
        matches!(
            self,
            AddrMode::AbsoluteX | AddrMode::AbsoluteY | AddrMode::IndirectY
        )
    }

    /// Operand text in conventional assembler syntax. `operand` holds the raw
    /// little-endian operand bytes; `next_pc` is the address after the
    /// instruction (used to resolve relative branches).
    pub fn format_operand(self, operand: &[u8], next_pc: u16) -> String {
        let b0 = operand.first().copied().unwrap_or(0);
        let word = u16::from_le_bytes([b0, operand.get(1).copied().unwrap_or(0)]);
        match self {
            AddrMode::Implied => String::new(),
            AddrMode::Accumulator => "A".to_string(),
            AddrMode::Immediate => format!("#${b0:02X}"),
            AddrMode::ZeroPage => format!("${b0:02X}"),
            AddrMode::ZeroPageX => format!("${b0:02X},X"),
            AddrMode::ZeroPageY => format!("${b0:02X},Y"),
            AddrMode::Absolute => format!("${word:04X}"),
            AddrMode::AbsoluteX => format!("${word:04X},X"),
            AddrMode::AbsoluteY => format!("${word:04X},Y"),
            AddrMode::Indirect => format!("(${word:04X})"),
            AddrMode::IndirectX => format!("(${b0:02X},X)"),
            AddrMode::IndirectY => format!("(${b0:02X}),Y"),
            AddrMode::Relative => {
                let target = next_pc.wrapping_add(b0 as i8 as u16);
                format!("${target:04X}")
            }
        }
    }
}

/// Add an index to a base address. Returns the result and whether the high
/// byte changed.
#[inline]
pub(crate) fn index_address(base: u16, index: u8) -> (u16, bool) {
    let addr = base.wrapping_add(index as u16);
    (addr, (addr & 0xFF00) != (base & 0xFF00))
}

/// The address the 6502 drives before fixing up a carry into the high byte.
#[inline]
pub(crate) fn uncorrected_address(base: u16, indexed: u16) -> u16 {
    (base & 0xFF00) | (indexed & 0x00FF)
}

/// Second byte of a JMP ($xxxx) pointer: the low byte wraps within the page.
#[inline]
pub(crate) fn indirect_high_pointer(ptr: u16) -> u16 {
    (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)
}
