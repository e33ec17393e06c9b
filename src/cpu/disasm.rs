//! Opcode-table driven disassembler.
//!
//! Line format: `ADDR  B0 B1 B2 *MNE OPERAND`, where `*` marks an
//! undocumented opcode. Bytes past the end of the input are shown as `??`
//! and the operand is left out.

use std::fmt;

use crate::bus::CpuBus;
use crate::cpu::table::{Opcode, lookup};

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub addr: u16,
    pub bytes: Vec<u8>,
    pub size: u8,
    pub mnemonic: &'static str,
    pub operand: String,
    pub illegal: bool,
}

impl Line {
    fn decode(addr: u16, op: &Opcode, bytes: Vec<u8>) -> Self {
        let complete = bytes.len() == op.size as usize;
        let operand = if complete {
            op.mode
                .format_operand(&bytes[1..], addr.wrapping_add(op.size as u16))
        } else {
            String::new()
        };
        Self {
            addr,
            bytes,
            size: op.size,
            mnemonic: op.mnemonic,
            operand,
            illegal: op.illegal,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}  ", self.addr)?;
        for i in 0..3 {
            match self.bytes.get(i) {
                Some(b) => write!(f, "{b:02X} ")?,
                None if i < self.size as usize => write!(f, "?? ")?,
                None => write!(f, "   ")?,
            }
        }
        let marker = if self.illegal { '*' } else { ' ' };
        write!(f, "{marker}{}", self.mnemonic)?;
        if !self.operand.is_empty() {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}

/// Decode `bytes` as code loaded at `base`, one line per instruction.
pub fn disassemble(bytes: &[u8], base: u16) -> Vec<String> {
    let mut lines = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let op = lookup(bytes[offset]);
        let end = (offset + op.size as usize).min(bytes.len());
        let addr = base.wrapping_add(offset as u16);
        lines.push(Line::decode(addr, op, bytes[offset..end].to_vec()).to_string());
        offset += op.size as usize;
    }
    lines
}

/// Decode `count` instructions starting at `start` using unclocked peeks.
pub fn disassemble_bus<B: CpuBus + ?Sized>(bus: &B, start: u16, count: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(count);
    let mut addr = start;
    for _ in 0..count {
        let op = lookup(bus.peek(addr));
        let bytes = (0..op.size as u16)
            .map(|i| bus.peek(addr.wrapping_add(i)))
            .collect();
        lines.push(Line::decode(addr, op, bytes).to_string());
        addr = addr.wrapping_add(op.size as u16);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FlatBus;

    #[test]
    fn formats_legal_and_illegal_lines() {
        let lines = disassemble(&[0xA9, 0x10, 0x8D, 0x00, 0x20, 0xA7, 0x44, 0xEA], 0x8000);
        assert_eq!(
            lines,
            vec![
                "8000  A9 10     LDA #$10",
                "8002  8D 00 20  STA $2000",
                "8005  A7 44    *LAX $44",
                "8007  EA        NOP",
            ]
        );
    }

    #[test]
    fn branch_operand_shows_target() {
        let lines = disassemble(&[0xD0, 0xFE], 0xC000);
        assert_eq!(lines, vec!["C000  D0 FE     BNE $C000"]);
    }

    #[test]
    fn truncated_instruction_marks_missing_bytes() {
        let lines = disassemble(&[0x4C, 0x00], 0x8000);
        assert_eq!(lines, vec!["8000  4C 00 ??  JMP"]);
    }

    #[test]
    fn bus_disassembly_does_not_clock_the_bus() {
        let bus = FlatBus::with_program(0x0600, &[0x6C, 0xFF, 0x02, 0x02]);
        let lines = disassemble_bus(&bus, 0x0600, 2);
        assert_eq!(lines[0], "0600  6C FF 02  JMP ($02FF)");
        assert_eq!(lines[1], "0603  02       *JAM");
        assert!(bus.log.is_empty());
    }
}
