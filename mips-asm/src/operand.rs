//! Binds a statement's raw tokens onto an [`Instruction`]'s declared operand shape
//!. `mips-core`'s `OperandShape` says how many
//! operands an instruction takes and what *kind* of token each accepts; it does not say which
//! field of `OperandValues` a given position writes to (that lives only inside each
//! instruction's hand-written executor). Rather than thread a parallel metadata field through
//! every one of `basic.rs`'s ~70 `instr!` declarations, the assembler keeps its own small
//! per-mnemonic slot-order table here — this is the same split real assemblers draw between
//! "the machine's encoding" and "the assembler's syntax convention" for that encoding.

use crate::error::AssembleError;
use crate::token::{Token, TokenType};
use mips_core::isa::{OperandKind, OperandShape, OperandValues};

/// Which `OperandValues` field a textual operand position binds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Rd,
    Rs,
    Rt,
    Shamt,
    Imm,
    Target,
    Bp,
}

/// One resolved operand, after register names are looked up and immediate-like tokens are
/// reduced to a single value-or-label form.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedOperand {
    Register(u32),
    Immediate(i64),
    Label(String),
}

/// Per-mnemonic textual operand order, in the same order `match_instruction` walks the
/// instruction's `OperandShape`. Covers every basic mnemonic in
/// `mips-core::isa::basic`.
pub fn slot_order(mnemonic: &str) -> &'static [Slot] {
    use Slot::*;
    match mnemonic {
        "add" | "addu" | "sub" | "subu" | "mul" | "muh" | "mulu" | "muhu" | "div" | "mod"
        | "divu" | "modu" | "and" | "or" | "xor" | "nor" | "slt" | "sltu" | "movz" | "movn" => {
            &[Rd, Rs, Rt]
        }
        "addi" | "addiu" | "andi" | "ori" | "xori" | "slti" | "sltiu" | "aui" => &[Rt, Rs, Imm],
        "addiupc" | "aluipc" | "auipc" => &[Rs, Imm],
        "lui" => &[Rt, Imm],
        "align" => &[Rd, Rs, Rt, Bp],
        "sll" | "srl" | "sra" => &[Rd, Rt, Shamt],
        "sllv" | "srlv" | "srav" => &[Rd, Rt, Rs],
        "lb" | "lbu" | "lh" | "lhu" | "lw" | "sb" | "sh" | "sw" => &[Rt, Imm, Rs],
        "beq" | "bne" | "beqc" | "bnec" => &[Rs, Rt, Imm],
        "blez" | "bgtz" | "bltz" | "bgez" | "blezc" | "bgtzc" | "bltzc" | "bgezc" | "beqzc"
        | "bnezc" => &[Rs, Imm],
        "bc" | "balc" => &[Imm],
        "j" | "jal" => &[Target],
        "jr" => &[Rs],
        "jalr" => &[Rd, Rs],
        "syscall" | "break" | "nop" => &[],
        "teq" | "tne" | "tlt" | "tltu" | "tge" | "tgeu" => &[Rs, Rt],
        _ => &[],
    }
}

/// Expected textual shape of a pseudo-instruction, for statement matching before expansion
/// (`mips-core::isa::pseudo::PseudoInstruction` carries no shape of its own — see module note).
pub fn pseudo_shape(mnemonic: &str) -> OperandShape {
    use OperandKind::*;
    const RI: &[OperandKind] = &[Register, Immediate];
    const RR: &[OperandKind] = &[Register, Register];
    const RRI: &[OperandKind] = &[Register, Register, Immediate];
    const R: &[OperandKind] = &[Register];
    const I: &[OperandKind] = &[Immediate];
    const NONE: &[OperandKind] = &[];
    match mnemonic {
        "li" | "la" => RI,
        "move" | "not" | "neg" => RR,
        "subi" | "blt" | "bgt" | "ble" | "bge" | "bgtu" | "bleu" => RRI,
        "b" | "bal" => I,
        "push" | "pop" => R,
        "nop" => NONE,
        _ => NONE,
    }
}

pub fn is_pseudo(mnemonic: &str) -> bool {
    mips_core::isa::pseudo::by_mnemonic(mnemonic).is_some()
}

/// Parses the tokens following a mnemonic/pseudo-mnemonic against `shape`, collapsing the
/// load/store `offset ( rs )` pattern into its two logical operands.
pub fn parse_operands(
    tokens: &[Token],
    shape: OperandShape,
    resolve_register: &dyn Fn(&Token) -> Option<u32>,
) -> Result<Vec<ResolvedOperand>, AssembleError> {
    let mut result = Vec::with_capacity(shape.len());
    let mut pos = 0;
    let mut prev_was_offset = false;

    for (i, kind) in shape.iter().enumerate() {
        if i > 0 {
            if prev_was_offset {
                // load/store `rt, offset ( rs )`: the base register is parenthesized, not
                // comma-separated, directly after the offset.
                pos = expect_and_advance(tokens, pos, TokenType::LeftParen)?;
            } else {
                pos = expect_comma(tokens, pos)?;
            }
        }
        match kind {
            OperandKind::Register => {
                let tok = token_at(tokens, pos)?;
                let addr = resolve_register(tok).ok_or_else(|| unexpected(tok, "a register"))?;
                result.push(ResolvedOperand::Register(addr));
                pos += 1;
                if prev_was_offset {
                    pos = expect_and_advance(tokens, pos, TokenType::RightParen)?;
                }
            }
            OperandKind::Target | OperandKind::Immediate => {
                let tok = token_at(tokens, pos)?;
                result.push(immediate_like(tok)?);
                pos += 1;
            }
            OperandKind::Offset => {
                let tok = token_at(tokens, pos)?;
                result.push(immediate_like(tok)?);
                pos += 1;
            }
        }
        prev_was_offset = *kind == OperandKind::Offset;
    }

    if pos != tokens.len() {
        return Err(unexpected(&tokens[pos], "end of statement"));
    }

    Ok(result)
}

fn token_at<'a>(tokens: &'a [Token], pos: usize) -> Result<&'a Token, AssembleError> {
    tokens.get(pos).ok_or_else(|| AssembleError::SyntaxError {
        location: tokens.last().map(|t| t.location.clone()).unwrap_or_else(missing_location),
        summary: "unexpected end of statement".to_owned(),
    })
}

fn missing_location() -> crate::token::SourceLocation {
    crate::token::SourceLocation {
        file: std::rc::Rc::new(String::new()),
        line: 0,
        line_offset: 0,
        file_offset: 0,
    }
}

fn expect(tokens: &[Token], pos: usize, kind: TokenType) -> Result<(), AssembleError> {
    let tok = token_at(tokens, pos)?;
    if tok.kind != kind {
        return Err(unexpected(tok, kind_name(kind)));
    }
    Ok(())
}

fn expect_comma(tokens: &[Token], pos: usize) -> Result<usize, AssembleError> {
    expect(tokens, pos, TokenType::Comma)?;
    Ok(pos + 1)
}

fn expect_and_advance(tokens: &[Token], pos: usize, kind: TokenType) -> Result<usize, AssembleError> {
    expect(tokens, pos, kind)?;
    Ok(pos + 1)
}

fn immediate_like(tok: &Token) -> Result<ResolvedOperand, AssembleError> {
    match tok.kind {
        TokenType::Immediate | TokenType::Char => {
            Ok(ResolvedOperand::Immediate(tok.int_value().expect("immediate-like token carries a value")))
        }
        TokenType::Label => Ok(ResolvedOperand::Label(tok.raw_text.clone())),
        _ => Err(unexpected(tok, "an immediate, character, or label")),
    }
}

fn unexpected(tok: &Token, expected: &'static str) -> AssembleError {
    AssembleError::UnexpectedToken { location: tok.location.clone(), got: tok.kind, expected }
}

fn kind_name(kind: TokenType) -> &'static str {
    match kind {
        TokenType::Comma => "`,`",
        TokenType::LeftParen => "`(`",
        TokenType::RightParen => "`)`",
        _ => "a token",
    }
}

/// Writes resolved operands into an [`OperandValues`] according to `slots`, leaving unresolved
/// labels to the caller (encoding happens only once every symbol is known). Immediate operands
/// are masked to the field width by `EncodingTemplate::assemble` itself, so this just needs to
/// place the raw resolved value in the right field.
pub fn bind(slots: &[Slot], values: &[i64]) -> OperandValues {
    let mut ops = OperandValues::default();
    for (&slot, &v) in slots.iter().zip(values.iter()) {
        match slot {
            Slot::Rd => ops.rd = v as u32,
            Slot::Rs => ops.rs = v as u32,
            Slot::Rt => ops.rt = v as u32,
            Slot::Shamt => ops.shamt = v as u32,
            Slot::Imm => ops.immediate = v,
            Slot::Target => ops.target = v as u32,
            Slot::Bp => ops.bp = v as u32,
        }
    }
    ops
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::token::tokenize;

    fn is_mnemonic(s: &str) -> bool {
        s == "lw"
    }

    #[test]
    fn parses_load_store_offset_register_pattern() {
        let tokens = tokenize("lw $t0, 4($sp)", "t.s", &is_mnemonic);
        // Drop the leading mnemonic token, as lib.rs would before calling parse_operands.
        let operand_tokens = &tokens[1..];
        let shape: OperandShape = &[OperandKind::Register, OperandKind::Offset, OperandKind::Register];
        let resolved = parse_operands(operand_tokens, shape, &|t| if t.raw_text == "$t0" { Some(8) } else { Some(29) })
            .unwrap();
        assert_eq!(
            resolved,
            vec![ResolvedOperand::Register(8), ResolvedOperand::Immediate(4), ResolvedOperand::Register(29)]
        );
    }

    #[test]
    fn bind_places_values_in_declared_fields() {
        let ops = bind(&[Slot::Rd, Slot::Rs, Slot::Rt], &[3, 5, 7]);
        assert_eq!((ops.rd, ops.rs, ops.rt), (3, 5, 7));
    }
}
