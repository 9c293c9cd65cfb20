//! The registry of MIPS32 Release-6 basic instructions. Every mnemonic is one
//! `static Instruction`, each with its own encoding template and `execute` function; there is
//! no shared base class or dynamic dispatch.
//!
//! Opcode/funct values below follow the real MIPS32 assignment wherever an instruction has a
//! direct pre-R6 ancestor (`add`, `addiu`, `lw`, `beq`, `jal`, ...). The handful of true R6
//! additions that share a single opcode with sibling sub-opcodes on real silicon (`mul`/`muh`,
//! `addiupc`/`aluipc`/`auipc`, the compact branches) are each given their own opcode here
//! instead of packing a sub-field, since this simulator never needs to recover an `Instruction`
//! from a raw opcode — `write_instruction`/`read_instruction` store and retrieve
//! the already-resolved `&'static Instruction` directly, so opcode reuse carries no ambiguity
//! risk, only an accuracy trade-off against real hardware we call out here once.

use super::{EncodingTemplate, ExecResult, Family, Field, Instruction, OperandKind, OperandShape, OperandValues};
use crate::cpu::Cpu;
use crate::exception::MipsException;
use mips_util::detect_overflow;

const fn r_type(funct: u32) -> [Field; 6] {
    [
        Field::Const { value: 0, lo: 26, hi: 31 },
        Field::Rs { lo: 21, hi: 25 },
        Field::Rt { lo: 16, hi: 20 },
        Field::Rd { lo: 11, hi: 15 },
        Field::Shamt { lo: 6, hi: 10 },
        Field::Const { value: funct, lo: 0, hi: 5 },
    ]
}

const fn align_type(funct: u32) -> [Field; 6] {
    [
        Field::Const { value: 0, lo: 26, hi: 31 },
        Field::Rs { lo: 21, hi: 25 },
        Field::Rt { lo: 16, hi: 20 },
        Field::Rd { lo: 11, hi: 15 },
        Field::Bp { lo: 6, hi: 7 },
        Field::Const { value: funct, lo: 0, hi: 5 },
    ]
}

const fn shamt_type(funct: u32) -> [Field; 6] {
    [
        Field::Const { value: 0, lo: 26, hi: 31 },
        Field::Const { value: 0, lo: 21, hi: 25 },
        Field::Rt { lo: 16, hi: 20 },
        Field::Rd { lo: 11, hi: 15 },
        Field::Shamt { lo: 6, hi: 10 },
        Field::Const { value: funct, lo: 0, hi: 5 },
    ]
}

const fn i_type(opcode: u32) -> [Field; 4] {
    [
        Field::Const { value: opcode, lo: 26, hi: 31 },
        Field::Rs { lo: 21, hi: 25 },
        Field::Rt { lo: 16, hi: 20 },
        Field::Immediate { lo: 0, hi: 15 },
    ]
}

const fn j_type(opcode: u32) -> [Field; 2] {
    [
        Field::Const { value: opcode, lo: 26, hi: 31 },
        Field::Target { lo: 0, hi: 25 },
    ]
}

// ---------------------------------------------------------------------------------------------
// Operand shapes
// ---------------------------------------------------------------------------------------------

const SHAPE_RRR: OperandShape = &[OperandKind::Register, OperandKind::Register, OperandKind::Register];
const SHAPE_RRI: OperandShape = &[OperandKind::Register, OperandKind::Register, OperandKind::Immediate];
const SHAPE_RI: OperandShape = &[OperandKind::Register, OperandKind::Immediate];
const SHAPE_RR: OperandShape = &[OperandKind::Register, OperandKind::Register];
const SHAPE_LOADSTORE: OperandShape = &[OperandKind::Register, OperandKind::Offset, OperandKind::Register];
const SHAPE_BRANCH: OperandShape = &[OperandKind::Register, OperandKind::Register, OperandKind::Immediate];
const SHAPE_BRANCH1: OperandShape = &[OperandKind::Register, OperandKind::Immediate];
const SHAPE_JUMP: OperandShape = &[OperandKind::Target];
const SHAPE_R: OperandShape = &[OperandKind::Register];
const SHAPE_OFFSET: OperandShape = &[OperandKind::Immediate];
const SHAPE_NONE: OperandShape = &[];
const SHAPE_ALIGN: OperandShape = &[
    OperandKind::Register,
    OperandKind::Register,
    OperandKind::Register,
    OperandKind::Immediate,
];

// ---------------------------------------------------------------------------------------------
// Shared arithmetic/logic helpers
// ---------------------------------------------------------------------------------------------

fn gpr_i32(cpu: &Cpu, addr: u32) -> i32 {
    cpu.gpr.read_integer(addr, false) as u32 as i32
}

fn gpr_u32(cpu: &Cpu, addr: u32) -> u32 {
    cpu.gpr.read_integer(addr, false) as u32
}

fn write(cpu: &mut Cpu, addr: u32, value: u32) {
    cpu.gpr.write_integer(addr, value as u64);
}

/// `zero_extend` picks whether the low 16 bits of `ops.immediate` are treated as signed
/// (loads/stores, `addi*`) or zero-extended (`andi`/`ori`/`xori`) — both readings mask to the
/// same 16 declared bits, only the extension differs.
fn imm16(ops: OperandValues, zero_extend: bool) -> i64 {
    if zero_extend {
        (ops.immediate as i32 as u32 & 0xFFFF) as i64
    } else {
        ops.immediate
    }
}

fn arith_rrr(cpu: &mut Cpu, ops: OperandValues, subtract: bool, trap_overflow: bool) -> ExecResult {
    let rs = gpr_i32(cpu, ops.rs);
    let rt = gpr_i32(cpu, ops.rt);
    let result = if subtract { rs.wrapping_sub(rt) } else { rs.wrapping_add(rt) };
    if trap_overflow && detect_overflow(rs, rt, result, subtract) {
        return Err(MipsException::ArithmeticOverflow);
    }
    write(cpu, ops.rd, result as u32);
    Ok(None)
}

fn arith_rri(cpu: &mut Cpu, ops: OperandValues, trap_overflow: bool) -> ExecResult {
    let rs = gpr_i32(cpu, ops.rs);
    let imm = imm16(ops, false) as i32;
    let result = rs.wrapping_add(imm);
    if trap_overflow && detect_overflow(rs, imm, result, false) {
        return Err(MipsException::ArithmeticOverflow);
    }
    write(cpu, ops.rt, result as u32);
    Ok(None)
}

fn logic_rrr(cpu: &mut Cpu, ops: OperandValues, f: fn(u32, u32) -> u32) -> ExecResult {
    let rs = gpr_u32(cpu, ops.rs);
    let rt = gpr_u32(cpu, ops.rt);
    write(cpu, ops.rd, f(rs, rt));
    Ok(None)
}

fn logic_rri(cpu: &mut Cpu, ops: OperandValues, f: fn(u32, u32) -> u32) -> ExecResult {
    let rs = gpr_u32(cpu, ops.rs);
    let imm = imm16(ops, true) as u32;
    write(cpu, ops.rt, f(rs, imm));
    Ok(None)
}

fn load(cpu: &mut Cpu, ops: OperandValues, n: u32, signed: bool) -> ExecResult {
    let base = gpr_u32(cpu, ops.rs);
    let addr = base.wrapping_add(ops.immediate as i32 as u32);
    let value = cpu.mem_read(addr, n, signed, false)?;
    write(cpu, ops.rt, value as u32);
    Ok(None)
}

fn store(cpu: &mut Cpu, ops: OperandValues, n: u32) -> ExecResult {
    let base = gpr_u32(cpu, ops.rs);
    let addr = base.wrapping_add(ops.immediate as i32 as u32);
    let value = cpu.gpr.read_integer(ops.rt, false);
    cpu.mem_write(addr, value, n, false)?;
    Ok(None)
}

/// Delayed branch target: `own_addr + 4 + sign_extend(offset << 2)`.
fn branch_target(own_addr: u32, ops: OperandValues) -> u32 {
    own_addr
        .wrapping_add(4)
        .wrapping_add((ops.immediate << 2) as i32 as u32)
}

fn branch_if(cpu: &mut Cpu, ops: OperandValues, own_addr: u32, taken: bool) -> ExecResult {
    Ok(if taken { Some(branch_target(own_addr, ops)) } else { None })
}

// ---------------------------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------------------------

fn exec_add(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    arith_rrr(cpu, ops, false, true)
}
fn exec_addu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    arith_rrr(cpu, ops, false, false)
}
fn exec_sub(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    arith_rrr(cpu, ops, true, true)
}
fn exec_subu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    arith_rrr(cpu, ops, true, false)
}
fn exec_addi(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    arith_rri(cpu, ops, true)
}
fn exec_addiu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    arith_rri(cpu, ops, false)
}

fn exec_addiupc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    // Spec names the destination field `rs` for this one instruction.
    let offset = (ops.immediate << 2) as i32 as u32;
    write(cpu, ops.rs, pc.wrapping_add(offset));
    Ok(None)
}

fn exec_aluipc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    let upper = (ops.immediate << 16) as i32 as u32;
    write(cpu, ops.rs, !0x0000_FFFFu32 & pc.wrapping_add(upper));
    Ok(None)
}

fn exec_auipc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    let upper = (ops.immediate << 16) as i32 as u32;
    write(cpu, ops.rs, pc.wrapping_add(upper));
    Ok(None)
}

fn exec_aui(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let rs = gpr_u32(cpu, ops.rs);
    let upper = (ops.immediate << 16) as i32 as u32;
    write(cpu, ops.rt, rs.wrapping_add(upper));
    Ok(None)
}

fn exec_mul(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let product = gpr_i32(cpu, ops.rs) as i64 * gpr_i32(cpu, ops.rt) as i64;
    write(cpu, ops.rd, product as u32);
    Ok(None)
}
fn exec_muh(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let product = gpr_i32(cpu, ops.rs) as i64 * gpr_i32(cpu, ops.rt) as i64;
    write(cpu, ops.rd, (product >> 32) as u32);
    Ok(None)
}
fn exec_mulu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let product = gpr_u32(cpu, ops.rs) as u64 * gpr_u32(cpu, ops.rt) as u64;
    write(cpu, ops.rd, product as u32);
    Ok(None)
}
fn exec_muhu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let product = gpr_u32(cpu, ops.rs) as u64 * gpr_u32(cpu, ops.rt) as u64;
    write(cpu, ops.rd, (product >> 32) as u32);
    Ok(None)
}

/// Division by zero is UNPREDICTABLE per MIPS32r6; this implementation raises `DivideByZero`
/// rather than silently producing a zero result.
fn exec_div(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let (rs, rt) = (gpr_i32(cpu, ops.rs), gpr_i32(cpu, ops.rt));
    if rt == 0 {
        return Err(MipsException::DivideByZero);
    }
    write(cpu, ops.rd, rs.wrapping_div(rt) as u32);
    Ok(None)
}
fn exec_mod(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let (rs, rt) = (gpr_i32(cpu, ops.rs), gpr_i32(cpu, ops.rt));
    if rt == 0 {
        return Err(MipsException::DivideByZero);
    }
    write(cpu, ops.rd, rs.wrapping_rem(rt) as u32);
    Ok(None)
}
fn exec_divu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let (rs, rt) = (gpr_u32(cpu, ops.rs), gpr_u32(cpu, ops.rt));
    if rt == 0 {
        return Err(MipsException::DivideByZero);
    }
    write(cpu, ops.rd, rs / rt);
    Ok(None)
}
fn exec_modu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let (rs, rt) = (gpr_u32(cpu, ops.rs), gpr_u32(cpu, ops.rt));
    if rt == 0 {
        return Err(MipsException::DivideByZero);
    }
    write(cpu, ops.rd, rs % rt);
    Ok(None)
}

// ---------------------------------------------------------------------------------------------
// Logical
// ---------------------------------------------------------------------------------------------

fn exec_and(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    logic_rrr(cpu, ops, |a, b| a & b)
}
fn exec_or(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    logic_rrr(cpu, ops, |a, b| a | b)
}
fn exec_xor(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    logic_rrr(cpu, ops, |a, b| a ^ b)
}
fn exec_nor(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    logic_rrr(cpu, ops, |a, b| !(a | b))
}
fn exec_andi(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    logic_rri(cpu, ops, |a, b| a & b)
}
fn exec_ori(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    logic_rri(cpu, ops, |a, b| a | b)
}
fn exec_xori(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    logic_rri(cpu, ops, |a, b| a ^ b)
}
fn exec_lui(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    write(cpu, ops.rt, (ops.immediate << 16) as i32 as u32);
    Ok(None)
}

fn exec_align(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let (rs, rt, bp) = (gpr_u32(cpu, ops.rs), gpr_u32(cpu, ops.rt), ops.bp & 0x3);
    let result = if bp == 0 {
        rs
    } else {
        (rt << (8 * bp)) | (rs >> (32 - 8 * bp))
    };
    write(cpu, ops.rd, result);
    Ok(None)
}

// ---------------------------------------------------------------------------------------------
// Shifts
// ---------------------------------------------------------------------------------------------

fn exec_sll(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    write(cpu, ops.rd, gpr_u32(cpu, ops.rt) << (ops.shamt & 0x1F));
    Ok(None)
}
fn exec_srl(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    write(cpu, ops.rd, gpr_u32(cpu, ops.rt) >> (ops.shamt & 0x1F));
    Ok(None)
}
fn exec_sra(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let value = gpr_i32(cpu, ops.rt);
    write(cpu, ops.rd, (value >> (ops.shamt & 0x1F)) as u32);
    Ok(None)
}
fn exec_sllv(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let shift = gpr_u32(cpu, ops.rs) & 0x1F;
    write(cpu, ops.rd, gpr_u32(cpu, ops.rt) << shift);
    Ok(None)
}
fn exec_srlv(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let shift = gpr_u32(cpu, ops.rs) & 0x1F;
    write(cpu, ops.rd, gpr_u32(cpu, ops.rt) >> shift);
    Ok(None)
}
fn exec_srav(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let shift = gpr_u32(cpu, ops.rs) & 0x1F;
    write(cpu, ops.rd, (gpr_i32(cpu, ops.rt) >> shift) as u32);
    Ok(None)
}

// ---------------------------------------------------------------------------------------------
// Comparisons
// ---------------------------------------------------------------------------------------------

fn exec_slt(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let result = gpr_i32(cpu, ops.rs) < gpr_i32(cpu, ops.rt);
    write(cpu, ops.rd, result as u32);
    Ok(None)
}
fn exec_sltu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let result = gpr_u32(cpu, ops.rs) < gpr_u32(cpu, ops.rt);
    write(cpu, ops.rd, result as u32);
    Ok(None)
}
fn exec_slti(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let result = (gpr_i32(cpu, ops.rs) as i64) < ops.immediate;
    write(cpu, ops.rt, result as u32);
    Ok(None)
}
fn exec_sltiu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    let result = gpr_u32(cpu, ops.rs) < (ops.immediate as i32 as u32);
    write(cpu, ops.rt, result as u32);
    Ok(None)
}

// ---------------------------------------------------------------------------------------------
// Loads / stores
// ---------------------------------------------------------------------------------------------

fn exec_lb(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    load(cpu, ops, 1, true)
}
fn exec_lbu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    load(cpu, ops, 1, false)
}
fn exec_lh(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    load(cpu, ops, 2, true)
}
fn exec_lhu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    load(cpu, ops, 2, false)
}
fn exec_lw(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    load(cpu, ops, 4, true)
}
fn exec_sb(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    store(cpu, ops, 1)
}
fn exec_sh(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    store(cpu, ops, 2)
}
fn exec_sw(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    store(cpu, ops, 4)
}

// ---------------------------------------------------------------------------------------------
// Branches (delayed)
// ---------------------------------------------------------------------------------------------

fn exec_beq(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) == gpr_i32(cpu, ops.rt))
}
fn exec_bne(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) != gpr_i32(cpu, ops.rt))
}
fn exec_blez(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) <= 0)
}
fn exec_bgtz(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) > 0)
}
fn exec_bltz(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) < 0)
}
fn exec_bgez(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) >= 0)
}

// ---------------------------------------------------------------------------------------------
// Compact branches (no delay slot)
// ---------------------------------------------------------------------------------------------

fn exec_beqc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) == gpr_i32(cpu, ops.rt))
}
fn exec_bnec(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) != gpr_i32(cpu, ops.rt))
}
fn exec_blezc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) <= 0)
}
fn exec_bgtzc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) > 0)
}
fn exec_bltzc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) < 0)
}
fn exec_bgezc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) >= 0)
}
fn exec_beqzc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) == 0)
}
fn exec_bnezc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    branch_if(cpu, ops, pc, gpr_i32(cpu, ops.rs) != 0)
}

fn exec_bc(_cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    Ok(Some(branch_target(pc, ops)))
}

fn exec_balc(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    let ra = cpu.gpr.index_of_name("ra").expect("$ra always present");
    write(cpu, ra, pc.wrapping_add(4));
    Ok(Some(branch_target(pc, ops)))
}

// ---------------------------------------------------------------------------------------------
// Jumps (delayed) and compact jumps
// ---------------------------------------------------------------------------------------------

/// PC-region jump target: low bits from the encoded field, high four bits from the address of
/// the delay slot instruction.
fn jump_region_target(own_addr: u32, ops: OperandValues) -> u32 {
    let region = own_addr.wrapping_add(4) & 0xF000_0000;
    region | (ops.target << 2)
}

fn exec_j(_cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    Ok(Some(jump_region_target(pc, ops)))
}

fn exec_jal(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    let link = if cpu.config.delay_slots { pc.wrapping_add(8) } else { pc.wrapping_add(4) };
    let ra = cpu.gpr.index_of_name("ra").expect("$ra always present");
    write(cpu, ra, link);
    Ok(Some(jump_region_target(pc, ops)))
}

fn exec_jr(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    Ok(Some(gpr_u32(cpu, ops.rs)))
}

fn exec_jalr(cpu: &mut Cpu, ops: OperandValues, pc: u32) -> ExecResult {
    let link = if cpu.config.delay_slots { pc.wrapping_add(8) } else { pc.wrapping_add(4) };
    let target = gpr_u32(cpu, ops.rs);
    write(cpu, ops.rd, link);
    Ok(Some(target))
}

// ---------------------------------------------------------------------------------------------
// System / trap / move
// ---------------------------------------------------------------------------------------------

fn exec_syscall(cpu: &mut Cpu, _ops: OperandValues, _pc: u32) -> ExecResult {
    let v0 = cpu.gpr.index_of_name("v0").expect("$v0 always present");
    let code = cpu.gpr.read_integer(v0, false) as u32;
    Err(MipsException::Syscall(code))
}

fn exec_break(_cpu: &mut Cpu, _ops: OperandValues, _pc: u32) -> ExecResult {
    Err(MipsException::Break)
}

fn trap_if(cond: bool) -> ExecResult {
    if cond {
        Err(MipsException::Trap)
    } else {
        Ok(None)
    }
}

fn exec_teq(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    trap_if(gpr_i32(cpu, ops.rs) == gpr_i32(cpu, ops.rt))
}
fn exec_tne(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    trap_if(gpr_i32(cpu, ops.rs) != gpr_i32(cpu, ops.rt))
}
fn exec_tlt(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    trap_if(gpr_i32(cpu, ops.rs) < gpr_i32(cpu, ops.rt))
}
fn exec_tltu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    trap_if(gpr_u32(cpu, ops.rs) < gpr_u32(cpu, ops.rt))
}
fn exec_tge(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    trap_if(gpr_i32(cpu, ops.rs) >= gpr_i32(cpu, ops.rt))
}
fn exec_tgeu(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    trap_if(gpr_u32(cpu, ops.rs) >= gpr_u32(cpu, ops.rt))
}

fn exec_nop(_cpu: &mut Cpu, _ops: OperandValues, _pc: u32) -> ExecResult {
    Ok(None)
}

fn exec_movz(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    if gpr_u32(cpu, ops.rt) == 0 {
        write(cpu, ops.rd, gpr_u32(cpu, ops.rs));
    }
    Ok(None)
}
fn exec_movn(cpu: &mut Cpu, ops: OperandValues, _pc: u32) -> ExecResult {
    if gpr_u32(cpu, ops.rt) != 0 {
        write(cpu, ops.rd, gpr_u32(cpu, ops.rs));
    }
    Ok(None)
}

// ---------------------------------------------------------------------------------------------
// The registry
// ---------------------------------------------------------------------------------------------

macro_rules! instr {
    ($name:ident, $mnemonic:literal, $operands:expr, $desc:literal, $fields:expr, $family:expr,
     $delay:literal, $deprecated:literal, $ct:literal, $exec:ident) => {
        pub static $name: Instruction = Instruction {
            mnemonic: $mnemonic,
            operands: $operands,
            description: $desc,
            encoding: EncodingTemplate(&$fields),
            family: $family,
            has_delay_slot: $delay,
            is_deprecated: $deprecated,
            is_control_transfer: $ct,
            execute: $exec,
        };
    };
}

instr!(ADD, "add", SHAPE_RRR, "Add with overflow trap.", r_type(0x20), Family::Basic, false, false, false, exec_add);
instr!(ADDU, "addu", SHAPE_RRR, "Add, no overflow trap.", r_type(0x21), Family::Basic, false, false, false, exec_addu);
instr!(SUB, "sub", SHAPE_RRR, "Subtract with overflow trap.", r_type(0x22), Family::Basic, false, false, false, exec_sub);
instr!(SUBU, "subu", SHAPE_RRR, "Subtract, no overflow trap.", r_type(0x23), Family::Basic, false, false, false, exec_subu);
instr!(ADDI, "addi", SHAPE_RRI, "Add immediate with overflow trap.", i_type(0x08), Family::Basic, false, false, false, exec_addi);
instr!(ADDIU, "addiu", SHAPE_RRI, "Add immediate, no overflow trap.", i_type(0x09), Family::Basic, false, false, false, exec_addiu);
instr!(
    ADDIUPC, "addiupc", SHAPE_RI, "PC-relative add immediate (19-bit shifted offset).",
    i_type(0x3B), Family::Basic, false, false, false, exec_addiupc
);
instr!(
    ALUIPC, "aluipc", SHAPE_RI, "Aligned PC-relative upper immediate.",
    i_type(0x3C), Family::Basic, false, false, false, exec_aluipc
);
instr!(
    AUIPC, "auipc", SHAPE_RI, "PC-relative add upper immediate.",
    i_type(0x3D), Family::Basic, false, false, false, exec_auipc
);
instr!(AUI, "aui", SHAPE_RRI, "Add upper immediate to a register.", i_type(0x1D), Family::Basic, false, false, false, exec_aui);
instr!(MUL, "mul", SHAPE_RRR, "Signed multiply, low word.", r_type(0x18), Family::Basic, false, false, false, exec_mul);
instr!(MUH, "muh", SHAPE_RRR, "Signed multiply, high word.", r_type(0x19), Family::Basic, false, false, false, exec_muh);
instr!(MULU, "mulu", SHAPE_RRR, "Unsigned multiply, low word.", r_type(0x1C), Family::Basic, false, false, false, exec_mulu);
instr!(MUHU, "muhu", SHAPE_RRR, "Unsigned multiply, high word.", r_type(0x1D), Family::Basic, false, false, false, exec_muhu);
instr!(DIV, "div", SHAPE_RRR, "Signed divide, quotient.", r_type(0x1A), Family::Basic, false, false, false, exec_div);
instr!(MOD, "mod", SHAPE_RRR, "Signed divide, remainder.", r_type(0x1E), Family::Basic, false, false, false, exec_mod);
instr!(DIVU, "divu", SHAPE_RRR, "Unsigned divide, quotient.", r_type(0x1B), Family::Basic, false, false, false, exec_divu);
instr!(MODU, "modu", SHAPE_RRR, "Unsigned divide, remainder.", r_type(0x1F), Family::Basic, false, false, false, exec_modu);

instr!(AND, "and", SHAPE_RRR, "Bitwise AND.", r_type(0x24), Family::Basic, false, false, false, exec_and);
instr!(OR, "or", SHAPE_RRR, "Bitwise OR.", r_type(0x25), Family::Basic, false, false, false, exec_or);
instr!(XOR, "xor", SHAPE_RRR, "Bitwise XOR.", r_type(0x26), Family::Basic, false, false, false, exec_xor);
instr!(NOR, "nor", SHAPE_RRR, "Bitwise NOR.", r_type(0x27), Family::Basic, false, false, false, exec_nor);
instr!(ANDI, "andi", SHAPE_RRI, "Bitwise AND, zero-extended immediate.", i_type(0x0C), Family::Basic, false, false, false, exec_andi);
instr!(ORI, "ori", SHAPE_RRI, "Bitwise OR, zero-extended immediate.", i_type(0x0D), Family::Basic, false, false, false, exec_ori);
instr!(XORI, "xori", SHAPE_RRI, "Bitwise XOR, zero-extended immediate.", i_type(0x0E), Family::Basic, false, false, false, exec_xori);
instr!(LUI, "lui", SHAPE_RI, "Load upper immediate.", i_type(0x0F), Family::Basic, false, false, false, exec_lui);
instr!(
    ALIGN, "align", SHAPE_ALIGN, "Concatenate and byte-align two registers.",
    align_type(0x1F), Family::Basic, false, false, false, exec_align
);

instr!(SLL, "sll", SHAPE_RRI, "Shift left logical (fixed amount).", shamt_type(0x00), Family::Basic, false, false, false, exec_sll);
instr!(SRL, "srl", SHAPE_RRI, "Shift right logical (fixed amount).", shamt_type(0x02), Family::Basic, false, false, false, exec_srl);
instr!(SRA, "sra", SHAPE_RRI, "Shift right arithmetic (fixed amount).", shamt_type(0x03), Family::Basic, false, false, false, exec_sra);
instr!(SLLV, "sllv", SHAPE_RRR, "Shift left logical (register amount).", r_type(0x04), Family::Basic, false, false, false, exec_sllv);
instr!(SRLV, "srlv", SHAPE_RRR, "Shift right logical (register amount).", r_type(0x06), Family::Basic, false, false, false, exec_srlv);
instr!(SRAV, "srav", SHAPE_RRR, "Shift right arithmetic (register amount).", r_type(0x07), Family::Basic, false, false, false, exec_srav);

instr!(SLT, "slt", SHAPE_RRR, "Set on less-than, signed.", r_type(0x2A), Family::Basic, false, false, false, exec_slt);
instr!(SLTU, "sltu", SHAPE_RRR, "Set on less-than, unsigned.", r_type(0x2B), Family::Basic, false, false, false, exec_sltu);
instr!(SLTI, "slti", SHAPE_RRI, "Set on less-than immediate, signed.", i_type(0x0A), Family::Basic, false, false, false, exec_slti);
instr!(SLTIU, "sltiu", SHAPE_RRI, "Set on less-than immediate, unsigned.", i_type(0x0B), Family::Basic, false, false, false, exec_sltiu);

instr!(LB, "lb", SHAPE_LOADSTORE, "Load byte, sign-extended.", i_type(0x20), Family::Basic, false, false, false, exec_lb);
instr!(LBU, "lbu", SHAPE_LOADSTORE, "Load byte, zero-extended.", i_type(0x24), Family::Basic, false, false, false, exec_lbu);
instr!(LH, "lh", SHAPE_LOADSTORE, "Load halfword, sign-extended.", i_type(0x21), Family::Basic, false, false, false, exec_lh);
instr!(LHU, "lhu", SHAPE_LOADSTORE, "Load halfword, zero-extended.", i_type(0x25), Family::Basic, false, false, false, exec_lhu);
instr!(LW, "lw", SHAPE_LOADSTORE, "Load word.", i_type(0x23), Family::Basic, false, false, false, exec_lw);
instr!(SB, "sb", SHAPE_LOADSTORE, "Store byte.", i_type(0x28), Family::Basic, false, false, false, exec_sb);
instr!(SH, "sh", SHAPE_LOADSTORE, "Store halfword.", i_type(0x29), Family::Basic, false, false, false, exec_sh);
instr!(SW, "sw", SHAPE_LOADSTORE, "Store word.", i_type(0x2B), Family::Basic, false, false, false, exec_sw);

instr!(BEQ, "beq", SHAPE_BRANCH, "Branch if equal (delayed).", i_type(0x04), Family::Branch, true, false, true, exec_beq);
instr!(BNE, "bne", SHAPE_BRANCH, "Branch if not equal (delayed).", i_type(0x05), Family::Branch, true, false, true, exec_bne);
instr!(BLEZ, "blez", SHAPE_BRANCH1, "Branch if <= 0 (delayed).", i_type(0x06), Family::Branch, true, false, true, exec_blez);
instr!(BGTZ, "bgtz", SHAPE_BRANCH1, "Branch if > 0 (delayed).", i_type(0x07), Family::Branch, true, false, true, exec_bgtz);
instr!(BLTZ, "bltz", SHAPE_BRANCH1, "Branch if < 0 (delayed).", i_type(0x11), Family::Branch, true, false, true, exec_bltz);
instr!(BGEZ, "bgez", SHAPE_BRANCH1, "Branch if >= 0 (delayed).", i_type(0x12), Family::Branch, true, false, true, exec_bgez);

instr!(BEQC, "beqc", SHAPE_BRANCH, "Compact branch if equal.", i_type(0x38), Family::CompactBranch, false, false, true, exec_beqc);
instr!(BNEC, "bnec", SHAPE_BRANCH, "Compact branch if not equal.", i_type(0x39), Family::CompactBranch, false, false, true, exec_bnec);
instr!(BLEZC, "blezc", SHAPE_BRANCH1, "Compact branch if <= 0.", i_type(0x16), Family::CompactBranch, false, false, true, exec_blezc);
instr!(BGTZC, "bgtzc", SHAPE_BRANCH1, "Compact branch if > 0.", i_type(0x17), Family::CompactBranch, false, false, true, exec_bgtzc);
instr!(BLTZC, "bltzc", SHAPE_BRANCH1, "Compact branch if < 0.", i_type(0x13), Family::CompactBranch, false, false, true, exec_bltzc);
instr!(BGEZC, "bgezc", SHAPE_BRANCH1, "Compact branch if >= 0.", i_type(0x14), Family::CompactBranch, false, false, true, exec_bgezc);
instr!(BEQZC, "beqzc", SHAPE_BRANCH1, "Compact branch if zero.", i_type(0x36), Family::CompactBranch, false, false, true, exec_beqzc);
instr!(BNEZC, "bnezc", SHAPE_BRANCH1, "Compact branch if nonzero.", i_type(0x3E), Family::CompactBranch, false, false, true, exec_bnezc);
instr!(BC, "bc", SHAPE_OFFSET, "Unconditional compact branch.", i_type(0x32), Family::CompactBranch, false, false, true, exec_bc);
instr!(BALC, "balc", SHAPE_OFFSET, "Compact branch-and-link.", i_type(0x3A), Family::CompactBranch, false, false, true, exec_balc);

instr!(J, "j", SHAPE_JUMP, "Unconditional jump (delayed).", j_type(0x02), Family::Jump, true, false, true, exec_j);
instr!(JAL, "jal", SHAPE_JUMP, "Jump and link (delayed).", j_type(0x03), Family::Jump, true, false, true, exec_jal);
instr!(JR, "jr", SHAPE_R, "Jump register (delayed).", r_type(0x08), Family::Basic, true, true, true, exec_jr);
instr!(JALR, "jalr", SHAPE_RR, "Jump and link register (delayed).", r_type(0x09), Family::Basic, true, false, true, exec_jalr);

instr!(SYSCALL, "syscall", SHAPE_NONE, "System call; service code in $v0.", r_type(0x0C), Family::Basic, false, false, false, exec_syscall);
instr!(BREAK, "break", SHAPE_NONE, "Debugger breakpoint trap.", r_type(0x0D), Family::Basic, false, false, false, exec_break);
instr!(TEQ, "teq", SHAPE_RR, "Trap if equal.", r_type(0x34), Family::Basic, false, false, false, exec_teq);
instr!(TNE, "tne", SHAPE_RR, "Trap if not equal.", r_type(0x36), Family::Basic, false, false, false, exec_tne);
instr!(TLT, "tlt", SHAPE_RR, "Trap if less than, signed.", r_type(0x32), Family::Basic, false, false, false, exec_tlt);
instr!(TLTU, "tltu", SHAPE_RR, "Trap if less than, unsigned.", r_type(0x33), Family::Basic, false, false, false, exec_tltu);
instr!(TGE, "tge", SHAPE_RR, "Trap if greater-or-equal, signed.", r_type(0x30), Family::Basic, false, false, false, exec_tge);
instr!(TGEU, "tgeu", SHAPE_RR, "Trap if greater-or-equal, unsigned.", r_type(0x31), Family::Basic, false, false, false, exec_tgeu);

instr!(NOP, "nop", SHAPE_NONE, "No operation.", shamt_type(0x00), Family::Basic, false, false, false, exec_nop);
instr!(MOVZ, "movz", SHAPE_RRR, "Conditional move if zero.", r_type(0x0A), Family::Basic, false, false, false, exec_movz);
instr!(MOVN, "movn", SHAPE_RRR, "Conditional move if nonzero.", r_type(0x0B), Family::Basic, false, false, false, exec_movn);

/// Every basic instruction, registered once at `Isa::new()`.
pub static ALL: &[&Instruction] = &[
    &ADD, &ADDU, &SUB, &SUBU, &ADDI, &ADDIU, &ADDIUPC, &ALUIPC, &AUIPC, &AUI,
    &MUL, &MUH, &MULU, &MUHU, &DIV, &MOD, &DIVU, &MODU,
    &AND, &OR, &XOR, &NOR, &ANDI, &ORI, &XORI, &LUI, &ALIGN,
    &SLL, &SRL, &SRA, &SLLV, &SRLV, &SRAV,
    &SLT, &SLTU, &SLTI, &SLTIU,
    &LB, &LBU, &LH, &LHU, &LW, &SB, &SH, &SW,
    &BEQ, &BNE, &BLEZ, &BGTZ, &BLTZ, &BGEZ,
    &BEQC, &BNEC, &BLEZC, &BGTZC, &BLTZC, &BGEZC, &BEQZC, &BNEZC, &BC, &BALC,
    &J, &JAL, &JR, &JALR,
    &SYSCALL, &BREAK, &TEQ, &TNE, &TLT, &TLTU, &TGE, &TGEU,
    &NOP, &MOVZ, &MOVN,
];

#[cfg(test)]
mod test {
    use super::*;
    use crate::isa::Isa;

    fn at(cpu: &mut Cpu, name: &str, value: u64) {
        let addr = cpu.gpr.index_of_name(name).unwrap();
        cpu.gpr.write_integer(addr, value);
    }

    fn get(cpu: &Cpu, name: &str) -> u64 {
        cpu.gpr.read_integer(cpu.gpr.index_of_name(name).unwrap(), false)
    }

    #[test]
    fn isa_registers_all_basic_instructions() {
        let isa = Isa::new();
        for i in ALL {
            assert!(isa.contains(i.mnemonic), "missing {}", i.mnemonic);
        }
    }

    #[test]
    fn add_overflow_raises_and_leaves_rd_unchanged() {
        let mut cpu = Cpu::new();
        at(&mut cpu, "t1", 0x7FFF_FFFF);
        at(&mut cpu, "t2", 1);
        let ops = OperandValues {
            rd: cpu.gpr.index_of_name("t3").unwrap(),
            rs: cpu.gpr.index_of_name("t1").unwrap(),
            rt: cpu.gpr.index_of_name("t2").unwrap(),
            ..Default::default()
        };
        let err = exec_add(&mut cpu, ops, 0).unwrap_err();
        assert_eq!(err, MipsException::ArithmeticOverflow);
        assert_eq!(get(&cpu, "t3"), 0);
    }

    #[test]
    fn addu_wraps_without_raising() {
        let mut cpu = Cpu::new();
        at(&mut cpu, "t1", 0x7FFF_FFFF);
        at(&mut cpu, "t2", 1);
        let ops = OperandValues {
            rd: cpu.gpr.index_of_name("t3").unwrap(),
            rs: cpu.gpr.index_of_name("t1").unwrap(),
            rt: cpu.gpr.index_of_name("t2").unwrap(),
            ..Default::default()
        };
        exec_addu(&mut cpu, ops, 0).unwrap();
        assert_eq!(get(&cpu, "t3"), 0x8000_0000);
    }

    #[test]
    fn bne_taken_targets_pc_plus_4_plus_offset() {
        let mut cpu = Cpu::new();
        at(&mut cpu, "t0", 1);
        let ops = OperandValues {
            rs: cpu.gpr.index_of_name("t0").unwrap(),
            rt: 0,
            immediate: -2,
            ..Default::default()
        };
        let target = exec_bne(&mut cpu, ops, 0x0040_0010).unwrap();
        assert_eq!(target, Some(0x0040_0010u32.wrapping_add(4).wrapping_sub(8)));
    }

    #[test]
    fn jal_links_pc_plus_8_with_delay_slots_enabled() {
        let mut cpu = Cpu::new();
        cpu.config.delay_slots = true;
        let ops = OperandValues { target: 0x0010_0100, ..Default::default() };
        exec_jal(&mut cpu, ops, 0x0040_0100).unwrap();
        assert_eq!(get(&cpu, "ra"), 0x0040_0108);
    }

    #[test]
    fn jal_links_pc_plus_4_with_delay_slots_disabled() {
        let mut cpu = Cpu::new();
        cpu.config.delay_slots = false;
        let ops = OperandValues { target: 0x0010_0100, ..Default::default() };
        exec_jal(&mut cpu, ops, 0x0040_0100).unwrap();
        assert_eq!(get(&cpu, "ra"), 0x0040_0104);
    }

    #[test]
    fn div_by_zero_raises() {
        let mut cpu = Cpu::new();
        at(&mut cpu, "t1", 10);
        let ops = OperandValues {
            rd: cpu.gpr.index_of_name("t2").unwrap(),
            rs: cpu.gpr.index_of_name("t1").unwrap(),
            rt: 0,
            ..Default::default()
        };
        assert_eq!(exec_div(&mut cpu, ops, 0).unwrap_err(), MipsException::DivideByZero);
    }

    #[test]
    fn align_reconstructs_bytes_across_two_registers() {
        let mut cpu = Cpu::new();
        at(&mut cpu, "t0", 0xAABBCCDD);
        at(&mut cpu, "t1", 0x11223344);
        let ops = OperandValues {
            rd: cpu.gpr.index_of_name("t2").unwrap(),
            rs: cpu.gpr.index_of_name("t0").unwrap(),
            rt: cpu.gpr.index_of_name("t1").unwrap(),
            bp: 1,
            ..Default::default()
        };
        exec_align(&mut cpu, ops, 0).unwrap();
        // bp=1: (rt << 8) | (rs >> 24)
        assert_eq!(get(&cpu, "t2"), 0x223344AA);
    }
}
