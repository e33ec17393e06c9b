/*!
state.rs - 6502 architectural state (registers + flags) and inline helpers.

Overview
========
`CpuState` owns every programmer-visible register. It holds no bus, no
microcode position, and no interrupt bookkeeping; those live in
`cpu::core`. Operation handlers in `execute.rs` take `&mut CpuState`
and nothing else, which keeps them pure and directly testable.

Status Register Bit Layout
==========================
Bit: 7 6 5 4 3 2 1 0
     N V 1 B D I Z C
  N = NEGATIVE
  V = OVERFLOW
  1 = UNUSED (always reads as 1)
  B = BREAK (only meaningful in a pushed copy: set by BRK/PHP, clear for IRQ/NMI)
  D = DECIMAL (stored, never consulted by the 2A03 ALU)
  I = IRQ_DISABLE
  Z = ZERO
  C = CARRY
*/

/// Processor status flag bit masks.
pub const CARRY: u8 = 0b0000_0001;
pub const ZERO: u8 = 0b0000_0010;
pub const IRQ_DISABLE: u8 = 0b0000_0100;
pub const DECIMAL: u8 = 0b0000_1000;
pub const BREAK: u8 = 0b0001_0000;
pub const UNUSED: u8 = 0b0010_0000;
pub const OVERFLOW: u8 = 0b0100_0000;
pub const NEGATIVE: u8 = 0b1000_0000;

/// Base address of the hardware stack page.
pub const STACK_PAGE: u16 = 0x0100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
}

impl Default for CpuState {
    fn default() -> Self {
        // Post-reset values: SP=$FD, IRQs masked, bit 5 set.
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0x0000,
            status: IRQ_DISABLE | UNUSED,
        }
    }
}

impl CpuState {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------
    #[inline]
    pub fn a(&self) -> u8 {
        self.a
    }
    #[inline]
    pub fn x(&self) -> u8 {
        self.x
    }
    #[inline]
    pub fn y(&self) -> u8 {
        self.y
    }
    #[inline]
    pub fn sp(&self) -> u8 {
        self.sp
    }
    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc
    }
    #[inline]
    pub fn status(&self) -> u8 {
        self.status
    }

    #[inline]
    pub fn set_a(&mut self, v: u8) {
        self.a = v;
    }
    #[inline]
    pub fn set_x(&mut self, v: u8) {
        self.x = v;
    }
    #[inline]
    pub fn set_y(&mut self, v: u8) {
        self.y = v;
    }
    #[inline]
    pub fn set_sp(&mut self, v: u8) {
        self.sp = v;
    }
    #[inline]
    pub fn set_pc(&mut self, v: u16) {
        self.pc = v;
    }
    #[inline]
    pub fn set_status(&mut self, v: u8) {
        self.status = v;
    }

    /// Advance PC by `delta` (wrapping at 16 bits).
    #[inline]
    pub fn advance_pc(&mut self, delta: u16) {
        self.pc = self.pc.wrapping_add(delta);
    }

    // ---------------------------------------------------------------------
    // Flag Operations
    // ---------------------------------------------------------------------

    #[inline]
    pub fn is_flag_set(&self, mask: u8) -> bool {
        (self.status & mask) != 0
    }

    #[inline]
    pub fn assign_flag(&mut self, mask: u8, value: bool) {
        if value {
            self.status |= mask;
        } else {
            self.status &= !mask;
        }
    }

    /// ZERO + NEGATIVE from a result byte.
    #[inline]
    pub fn update_zn(&mut self, result: u8) {
        self.assign_flag(ZERO, result == 0);
        self.assign_flag(NEGATIVE, (result & 0x80) != 0);
    }

    /// Status byte as pushed to the stack. UNUSED is forced on; BREAK follows
    /// `set_break` (BRK/PHP push it set, IRQ/NMI push it clear).
    pub fn compose_status_for_push(&self, set_break: bool) -> u8 {
        let v = self.status | UNUSED;
        if set_break { v | BREAK } else { v & !BREAK }
    }

    /// Status byte pulled by PLP/RTI: BREAK is not a real latch, UNUSED reads 1.
    #[inline]
    pub fn restore_status(&mut self, pulled: u8) {
        self.status = (pulled | UNUSED) & !BREAK;
    }

    // ---------------------------------------------------------------------
    // Stack pointer
    // ---------------------------------------------------------------------
    //
    // Push: write at $0100|SP, then SP -= 1.
    // Pull: SP += 1, then read at $0100|SP.
    // The bus access itself is issued by the microcode; these only produce
    // the address and move SP.

    /// Address for the next push, decrementing SP.
    #[inline]
    pub fn push_addr(&mut self) -> u16 {
        let addr = STACK_PAGE | self.sp as u16;
        self.sp = self.sp.wrapping_sub(1);
        addr
    }

    /// Address for the next pull, incrementing SP first.
    #[inline]
    pub fn pull_addr(&mut self) -> u16 {
        self.sp = self.sp.wrapping_add(1);
        STACK_PAGE | self.sp as u16
    }

    /// Current top-of-stack address without moving SP (dummy reads).
    #[inline]
    pub fn stack_addr(&self) -> u16 {
        STACK_PAGE | self.sp as u16
    }
}
