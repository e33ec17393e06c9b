/*!
execute.rs - 6502 operation semantics (ALU, flags, transfers, RMW transforms)

Purpose
=======
Every handler referenced from the opcode table lives here. Handlers touch
only `CpuState`; the bus traffic around them (operand reads, dummy writes,
the final store) is issued by the microcode in `cpu::core`, one access per
tick. That split lets a single ALU routine serve every addressing mode.

Handler shapes
==============
```text
    read    fn(&mut CpuState, operand)          LDA, ADC, CMP, LAX ...
    write   fn(&mut CpuState, high_plus_one) -> value to store
    modify  fn(&mut CpuState, old) -> new       ASL, INC, SLO, DCP ...
    implied fn(&mut CpuState)                   TAX, CLC, INX ...
    branch  fn(&CpuState) -> taken
```

`high_plus_one` is the high byte of the unindexed base address plus one;
only the SHX/SHY/AHX/TAS group looks at it.

Arithmetic
==========
ADC is binary only (the 2A03 has no decimal mode). SBC is ADC of the ones'
complement, so carry means "no borrow".
*/

use crate::cpu::state::{CARRY, CpuState, DECIMAL, IRQ_DISABLE, NEGATIVE, OVERFLOW, ZERO};

pub type ReadOp = fn(&mut CpuState, u8);
pub type WriteOp = fn(&mut CpuState, u8) -> u8;
pub type ModifyOp = fn(&mut CpuState, u8) -> u8;
pub type ImpliedOp = fn(&mut CpuState);
pub type BranchCond = fn(&CpuState) -> bool;

// Magic constant ORed into A by the unstable XAA/LXA opcodes.
const UNSTABLE_MAGIC: u8 = 0xEE;

// ---------------------------------------------------------------------------
// Loads
// ---------------------------------------------------------------------------

pub(crate) fn lda(cpu: &mut CpuState, v: u8) {
    cpu.set_a(v);
    cpu.update_zn(v);
}

pub(crate) fn ldx(cpu: &mut CpuState, v: u8) {
    cpu.set_x(v);
    cpu.update_zn(v);
}

pub(crate) fn ldy(cpu: &mut CpuState, v: u8) {
    cpu.set_y(v);
    cpu.update_zn(v);
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

pub(crate) fn sta(cpu: &mut CpuState, _high: u8) -> u8 {
    cpu.a()
}

pub(crate) fn stx(cpu: &mut CpuState, _high: u8) -> u8 {
    cpu.x()
}

pub(crate) fn sty(cpu: &mut CpuState, _high: u8) -> u8 {
    cpu.y()
}

// ---------------------------------------------------------------------------
// Transfers / register increments
// ---------------------------------------------------------------------------

pub(crate) fn tax(cpu: &mut CpuState) {
    let v = cpu.a();
    ldx(cpu, v);
}

pub(crate) fn tay(cpu: &mut CpuState) {
    let v = cpu.a();
    ldy(cpu, v);
}

pub(crate) fn txa(cpu: &mut CpuState) {
    let v = cpu.x();
    lda(cpu, v);
}

pub(crate) fn tya(cpu: &mut CpuState) {
    let v = cpu.y();
    lda(cpu, v);
}

pub(crate) fn tsx(cpu: &mut CpuState) {
    let v = cpu.sp();
    ldx(cpu, v);
}

/// TXS does not touch flags.
pub(crate) fn txs(cpu: &mut CpuState) {
    cpu.set_sp(cpu.x());
}

pub(crate) fn inx(cpu: &mut CpuState) {
    let v = cpu.x().wrapping_add(1);
    ldx(cpu, v);
}

pub(crate) fn iny(cpu: &mut CpuState) {
    let v = cpu.y().wrapping_add(1);
    ldy(cpu, v);
}

pub(crate) fn dex(cpu: &mut CpuState) {
    let v = cpu.x().wrapping_sub(1);
    ldx(cpu, v);
}

pub(crate) fn dey(cpu: &mut CpuState) {
    let v = cpu.y().wrapping_sub(1);
    ldy(cpu, v);
}

// ---------------------------------------------------------------------------
// Flag instructions
// ---------------------------------------------------------------------------

pub(crate) fn clc(cpu: &mut CpuState) {
    cpu.assign_flag(CARRY, false);
}

pub(crate) fn sec(cpu: &mut CpuState) {
    cpu.assign_flag(CARRY, true);
}

pub(crate) fn cli(cpu: &mut CpuState) {
    cpu.assign_flag(IRQ_DISABLE, false);
}

pub(crate) fn sei(cpu: &mut CpuState) {
    cpu.assign_flag(IRQ_DISABLE, true);
}

pub(crate) fn clv(cpu: &mut CpuState) {
    cpu.assign_flag(OVERFLOW, false);
}

pub(crate) fn cld(cpu: &mut CpuState) {
    cpu.assign_flag(DECIMAL, false);
}

pub(crate) fn sed(cpu: &mut CpuState) {
    cpu.assign_flag(DECIMAL, true);
}

pub(crate) fn nop(_cpu: &mut CpuState) {}

/// Multi-byte NOPs still perform their operand read.
pub(crate) fn nop_read(_cpu: &mut CpuState, _v: u8) {}

// ---------------------------------------------------------------------------
// Logical / Bit
// ---------------------------------------------------------------------------

pub(crate) fn and(cpu: &mut CpuState, v: u8) {
    let r = cpu.a() & v;
    lda(cpu, r);
}

pub(crate) fn ora(cpu: &mut CpuState, v: u8) {
    let r = cpu.a() | v;
    lda(cpu, r);
}

pub(crate) fn eor(cpu: &mut CpuState, v: u8) {
    let r = cpu.a() ^ v;
    lda(cpu, r);
}

pub(crate) fn bit(cpu: &mut CpuState, v: u8) {
    cpu.assign_flag(ZERO, (cpu.a() & v) == 0);
    cpu.assign_flag(NEGATIVE, (v & 0x80) != 0);
    cpu.assign_flag(OVERFLOW, (v & 0x40) != 0);
}

// ---------------------------------------------------------------------------
// ADC / SBC / Compare
// ---------------------------------------------------------------------------

pub(crate) fn adc(cpu: &mut CpuState, v: u8) {
    let a = cpu.a();
    let sum = a as u16 + v as u16 + cpu.is_flag_set(CARRY) as u16;
    let result = sum as u8;
    cpu.assign_flag(CARRY, sum > 0xFF);
    // Overflow: operands agree in sign and the result does not.
    cpu.assign_flag(OVERFLOW, (!(a ^ v) & (a ^ result) & 0x80) != 0);
    lda(cpu, result);
}

pub(crate) fn sbc(cpu: &mut CpuState, v: u8) {
    adc(cpu, !v);
}

fn compare(cpu: &mut CpuState, reg: u8, v: u8) {
    cpu.assign_flag(CARRY, reg >= v);
    cpu.update_zn(reg.wrapping_sub(v));
}

pub(crate) fn cmp(cpu: &mut CpuState, v: u8) {
    let reg = cpu.a();
    compare(cpu, reg, v);
}

pub(crate) fn cpx(cpu: &mut CpuState, v: u8) {
    let reg = cpu.x();
    compare(cpu, reg, v);
}

pub(crate) fn cpy(cpu: &mut CpuState, v: u8) {
    let reg = cpu.y();
    compare(cpu, reg, v);
}

// ---------------------------------------------------------------------------
// Shifts / Rotates / INC / DEC (memory or accumulator)
// ---------------------------------------------------------------------------

pub(crate) fn asl(cpu: &mut CpuState, v: u8) -> u8 {
    let r = v << 1;
    cpu.assign_flag(CARRY, (v & 0x80) != 0);
    cpu.update_zn(r);
    r
}

pub(crate) fn lsr(cpu: &mut CpuState, v: u8) -> u8 {
    let r = v >> 1;
    cpu.assign_flag(CARRY, (v & 0x01) != 0);
    cpu.update_zn(r);
    r
}

pub(crate) fn rol(cpu: &mut CpuState, v: u8) -> u8 {
    let r = (v << 1) | cpu.is_flag_set(CARRY) as u8;
    cpu.assign_flag(CARRY, (v & 0x80) != 0);
    cpu.update_zn(r);
    r
}

pub(crate) fn ror(cpu: &mut CpuState, v: u8) -> u8 {
    let r = (v >> 1) | ((cpu.is_flag_set(CARRY) as u8) << 7);
    cpu.assign_flag(CARRY, (v & 0x01) != 0);
    cpu.update_zn(r);
    r
}

pub(crate) fn inc(cpu: &mut CpuState, v: u8) -> u8 {
    let r = v.wrapping_add(1);
    cpu.update_zn(r);
    r
}

pub(crate) fn dec(cpu: &mut CpuState, v: u8) -> u8 {
    let r = v.wrapping_sub(1);
    cpu.update_zn(r);
    r
}

// ---------------------------------------------------------------------------
// Branch conditions
// ---------------------------------------------------------------------------

pub(crate) fn bpl(cpu: &CpuState) -> bool {
    !cpu.is_flag_set(NEGATIVE)
}

pub(crate) fn bmi(cpu: &CpuState) -> bool {
    cpu.is_flag_set(NEGATIVE)
}

pub(crate) fn bvc(cpu: &CpuState) -> bool {
    !cpu.is_flag_set(OVERFLOW)
}

pub(crate) fn bvs(cpu: &CpuState) -> bool {
    cpu.is_flag_set(OVERFLOW)
}

pub(crate) fn bcc(cpu: &CpuState) -> bool {
    !cpu.is_flag_set(CARRY)
}

pub(crate) fn bcs(cpu: &CpuState) -> bool {
    cpu.is_flag_set(CARRY)
}

pub(crate) fn bne(cpu: &CpuState) -> bool {
    !cpu.is_flag_set(ZERO)
}

pub(crate) fn beq(cpu: &CpuState) -> bool {
    cpu.is_flag_set(ZERO)
}

// ---------------------------------------------------------------------------
// Undocumented: stable combined operations
// ---------------------------------------------------------------------------

pub(crate) fn lax(cpu: &mut CpuState, v: u8) {
    lda(cpu, v);
    cpu.set_x(v);
}

pub(crate) fn sax(cpu: &mut CpuState, _high: u8) -> u8 {
    cpu.a() & cpu.x()
}

pub(crate) fn slo(cpu: &mut CpuState, v: u8) -> u8 {
    let r = asl(cpu, v);
    ora(cpu, r);
    r
}

pub(crate) fn rla(cpu: &mut CpuState, v: u8) -> u8 {
    let r = rol(cpu, v);
    and(cpu, r);
    r
}

pub(crate) fn sre(cpu: &mut CpuState, v: u8) -> u8 {
    let r = lsr(cpu, v);
    eor(cpu, r);
    r
}

pub(crate) fn rra(cpu: &mut CpuState, v: u8) -> u8 {
    let r = ror(cpu, v);
    adc(cpu, r);
    r
}

pub(crate) fn dcp(cpu: &mut CpuState, v: u8) -> u8 {
    let r = v.wrapping_sub(1);
    cmp(cpu, r);
    r
}

pub(crate) fn isb(cpu: &mut CpuState, v: u8) -> u8 {
    let r = v.wrapping_add(1);
    sbc(cpu, r);
    r
}

// ---------------------------------------------------------------------------
// Undocumented: unstable group
// ---------------------------------------------------------------------------

pub(crate) fn anc(cpu: &mut CpuState, v: u8) {
    and(cpu, v);
    cpu.assign_flag(CARRY, cpu.is_flag_set(NEGATIVE));
}

pub(crate) fn alr(cpu: &mut CpuState, v: u8) {
    let masked = cpu.a() & v;
    let r = lsr(cpu, masked);
    cpu.set_a(r);
}

pub(crate) fn arr(cpu: &mut CpuState, v: u8) {
    let r = ((cpu.a() & v) >> 1) | ((cpu.is_flag_set(CARRY) as u8) << 7);
    lda(cpu, r);
    let bit6 = (r >> 6) & 1;
    let bit5 = (r >> 5) & 1;
    cpu.assign_flag(CARRY, bit6 != 0);
    cpu.assign_flag(OVERFLOW, (bit6 ^ bit5) != 0);
}

pub(crate) fn xaa(cpu: &mut CpuState, v: u8) {
    let r = (cpu.a() | UNSTABLE_MAGIC) & cpu.x() & v;
    lda(cpu, r);
}

pub(crate) fn lxa(cpu: &mut CpuState, v: u8) {
    let r = (cpu.a() | UNSTABLE_MAGIC) & v;
    lax(cpu, r);
}

/// AXS (a.k.a. SBX): X = (A & X) - operand, without borrow in.
pub(crate) fn axs(cpu: &mut CpuState, v: u8) {
    let t = cpu.a() & cpu.x();
    cpu.assign_flag(CARRY, t >= v);
    ldx(cpu, t.wrapping_sub(v));
}

pub(crate) fn las(cpu: &mut CpuState, v: u8) {
    let t = v & cpu.sp();
    cpu.set_sp(t);
    lax(cpu, t);
}

pub(crate) fn shy(cpu: &mut CpuState, high: u8) -> u8 {
    cpu.y() & high
}

pub(crate) fn shx(cpu: &mut CpuState, high: u8) -> u8 {
    cpu.x() & high
}

pub(crate) fn ahx(cpu: &mut CpuState, high: u8) -> u8 {
    cpu.a() & cpu.x() & high
}

pub(crate) fn tas(cpu: &mut CpuState, high: u8) -> u8 {
    cpu.set_sp(cpu.a() & cpu.x());
    cpu.sp() & high
}
