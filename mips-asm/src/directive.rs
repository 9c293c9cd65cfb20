//! Directive execution: segment switches, data emission, and the
//! symbol-table bookkeeping a label attached to a directive or instruction needs.

use crate::context::{Context, SegmentKind};
use crate::error::AssembleError;
use crate::token::{ParsedValue, SourceLocation, Token, TokenType};
use mips_core::cpu::Cpu;
use mips_core::segment::AccessLevel;

/// Binds `label` to the address the current segment's pointer is sitting at right now, in the
/// statement's own file's local table.
pub fn define_label(ctx: &mut Context, file: &str, label: &Token) -> Result<(), AssembleError> {
    let addr = ctx.peek_address();
    ctx.local_for(file)
        .define(&label.raw_text, addr, label.location.clone())
        .map_err(|_| AssembleError::SymbolAlreadyExists {
            location: label.location.clone(),
            name: label.raw_text.clone(),
        })
}

/// Writes directive data into `cpu.memory` with the assembler's own, PC-independent privilege —
/// it is not bound by the `AccessLevel` a running program's `$pc` would imply (see DESIGN.md:
/// "assemble-time memory access").
const ASSEMBLER_PRIVILEGE: AccessLevel = AccessLevel::All;

fn directive_name(tok: &Token) -> &str {
    tok.raw_text.strip_prefix('.').unwrap_or(&tok.raw_text)
}

fn expect_immediate(tok: &Token) -> Result<i64, AssembleError> {
    match tok.kind {
        TokenType::Immediate | TokenType::Char => Ok(tok.int_value().unwrap()),
        _ => Err(AssembleError::UnexpectedToken {
            location: tok.location.clone(),
            got: tok.kind,
            expected: "an immediate",
        }),
    }
}

fn expect_label(tok: &Token) -> Result<&str, AssembleError> {
    match tok.kind {
        TokenType::Label => Ok(&tok.raw_text),
        _ => Err(AssembleError::UnexpectedToken {
            location: tok.location.clone(),
            got: tok.kind,
            expected: "a label",
        }),
    }
}

/// Splits `tokens` on `Comma`, rejecting a trailing/leading/doubled comma.
fn comma_separated(tokens: &[Token], location: &SourceLocation) -> Result<Vec<&Token>, AssembleError> {
    let mut items = Vec::new();
    let mut expect_item = true;
    for tok in tokens {
        if expect_item {
            if tok.kind == TokenType::Comma {
                return Err(AssembleError::UnexpectedToken {
                    location: tok.location.clone(),
                    got: tok.kind,
                    expected: "a value",
                });
            }
            items.push(tok);
            expect_item = false;
        } else {
            if tok.kind != TokenType::Comma {
                return Err(AssembleError::UnexpectedToken {
                    location: tok.location.clone(),
                    got: tok.kind,
                    expected: "`,`",
                });
            }
            expect_item = true;
        }
    }
    if expect_item {
        return Err(AssembleError::SyntaxError {
            location: location.clone(),
            summary: "expected a value after `,`".to_owned(),
        });
    }
    Ok(items)
}

fn emit_bytes(ctx: &mut Context, cpu: &mut Cpu, bytes: &[u8], location: &SourceLocation) -> Result<(), AssembleError> {
    for &b in bytes {
        let addr = ctx.data_pointer(location, ".byte")?;
        cpu.memory
            .write_bytes(addr, b as u64, 1, false, ASSEMBLER_PRIVILEGE)
            .map_err(|_| AssembleError::SyntaxError { location: location.clone(), summary: "data write failed".to_owned() })?;
        ctx.advance_data_pointer(1);
    }
    Ok(())
}

fn emit_sized(ctx: &mut Context, cpu: &mut Cpu, tokens: &[Token], size: u32, directive: &str, location: &SourceLocation) -> Result<(), AssembleError> {
    for tok in comma_separated(tokens, location)? {
        let v = expect_immediate(tok)?;
        let addr = ctx.data_pointer(location, directive)?;
        cpu.memory
            .write_bytes(addr, v as u64, size, false, ASSEMBLER_PRIVILEGE)
            .map_err(|_| AssembleError::SyntaxError { location: location.clone(), summary: "data write failed".to_owned() })?;
        ctx.advance_data_pointer(size);
    }
    Ok(())
}

/// Dispatches one directive statement. `operand_tokens` is everything after the directive token
/// itself. Returns `Ok(true)` once handled, or `Ok(false)` for `.include` (which the caller
/// re-enters the tokenize/assemble pipeline for, since it isn't a single data write).
pub fn execute(
    ctx: &mut Context,
    cpu: &mut Cpu,
    directive: &Token,
    operand_tokens: &[Token],
) -> Result<bool, AssembleError> {
    let name = directive_name(directive);
    match name {
        "text" => {
            ctx.segment = SegmentKind::Text;
            Ok(true)
        }
        "ktext" => {
            ctx.segment = SegmentKind::KText;
            Ok(true)
        }
        "data" => {
            ctx.segment = SegmentKind::Data;
            Ok(true)
        }
        "kdata" => {
            ctx.segment = SegmentKind::KData;
            Ok(true)
        }
        "align" => {
            let tok = operand_tokens.first().ok_or_else(|| AssembleError::SyntaxError {
                location: directive.location.clone(),
                summary: "`.align` expects a power of two".to_owned(),
            })?;
            let power = expect_immediate(tok)?;
            if !(0..=3).contains(&power) {
                return Err(AssembleError::SyntaxError {
                    location: tok.location.clone(),
                    summary: "`.align` expects n in 0..=3".to_owned(),
                });
            }
            // Just a bounds check that we're in a data-like segment.
            ctx.data_pointer(&directive.location, ".align")?;
            ctx.align_data_pointer(power as u32);
            Ok(true)
        }
        "byte" => {
            for tok in comma_separated(operand_tokens, &directive.location)? {
                let v = expect_immediate(tok)?;
                emit_bytes(ctx, cpu, &[v as u8], &directive.location)?;
            }
            Ok(true)
        }
        "half" => {
            emit_sized(ctx, cpu, operand_tokens, 2, ".half", &directive.location)?;
            Ok(true)
        }
        "word" => {
            emit_sized(ctx, cpu, operand_tokens, 4, ".word", &directive.location)?;
            Ok(true)
        }
        "ascii" | "asciiz" => {
            let tok = operand_tokens.first().ok_or_else(|| AssembleError::SyntaxError {
                location: directive.location.clone(),
                summary: format!("`.{}` expects a string literal", name),
            })?;
            let mut bytes = match &tok.parsed_value {
                ParsedValue::Bytes(b) => b.clone(),
                _ => {
                    return Err(AssembleError::UnexpectedToken {
                        location: tok.location.clone(),
                        got: tok.kind,
                        expected: "a string literal",
                    })
                }
            };
            if name == "asciiz" {
                bytes.push(0);
            }
            emit_bytes(ctx, cpu, &bytes, &directive.location)?;
            Ok(true)
        }
        "space" => {
            let tok = operand_tokens.first().ok_or_else(|| AssembleError::SyntaxError {
                location: directive.location.clone(),
                summary: "`.space` expects a byte count".to_owned(),
            })?;
            let n = expect_immediate(tok)?;
            ctx.data_pointer(&directive.location, ".space")?;
            ctx.advance_data_pointer(n as u32);
            Ok(true)
        }
        "extern" => {
            let label_tok = operand_tokens.get(0).ok_or_else(|| AssembleError::SyntaxError {
                location: directive.location.clone(),
                summary: "`.extern` expects a label and a size".to_owned(),
            })?;
            let size_tok = operand_tokens.get(1).ok_or_else(|| AssembleError::SyntaxError {
                location: directive.location.clone(),
                summary: "`.extern` expects a label and a size".to_owned(),
            })?;
            let label_name = expect_label(label_tok)?.to_owned();
            let n = expect_immediate(size_tok)?;
            let addr = ctx.extern_pointer();
            ctx.globals
                .define(&label_name, addr, label_tok.location.clone())
                .map_err(|_| AssembleError::SymbolAlreadyExists {
                    location: label_tok.location.clone(),
                    name: label_name,
                })?;
            ctx.advance_extern_pointer(n as u32);
            Ok(true)
        }
        "globl" => {
            for tok in comma_separated(operand_tokens, &directive.location)? {
                let name = expect_label(tok)?.to_owned();
                ctx.globl_requests.push((name, tok.location.file.clone(), tok.location.clone()));
            }
            Ok(true)
        }
        "include" => Ok(false),
        other => Err(AssembleError::InvalidSegment {
            location: directive.location.clone(),
            directive: format!(".{}", other),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::token::tokenize;

    fn is_mnemonic(_: &str) -> bool {
        false
    }

    fn statement_tokens(src: &str) -> Vec<Token> {
        tokenize(src, "t.s", &is_mnemonic)
    }

    #[test]
    fn word_directive_writes_each_value_and_advances_pointer() {
        let mut ctx = Context::new();
        let mut cpu = Cpu::new();
        ctx.segment = SegmentKind::Data;
        let tokens = statement_tokens(".word 1, 2, 3");
        execute(&mut ctx, &mut cpu, &tokens[0], &tokens[1..]).unwrap();
        let base = mips_core::constants::DATA_LOWER;
        assert_eq!(cpu.memory.read_bytes(base, 4, false, false, AccessLevel::All).unwrap(), 1);
        assert_eq!(cpu.memory.read_bytes(base + 4, 4, false, false, AccessLevel::All).unwrap(), 2);
        assert_eq!(cpu.memory.read_bytes(base + 8, 4, false, false, AccessLevel::All).unwrap(), 3);
    }

    #[test]
    fn asciiz_appends_trailing_zero_byte() {
        let mut ctx = Context::new();
        let mut cpu = Cpu::new();
        ctx.segment = SegmentKind::Data;
        let tokens = statement_tokens(r#".asciiz "hi""#);
        execute(&mut ctx, &mut cpu, &tokens[0], &tokens[1..]).unwrap();
        let base = mips_core::constants::DATA_LOWER;
        assert_eq!(cpu.memory.read_bytes(base, 1, false, false, AccessLevel::All).unwrap(), b'h' as i64);
        assert_eq!(cpu.memory.read_bytes(base + 2, 1, false, false, AccessLevel::All).unwrap(), 0);
    }

    #[test]
    fn align_rejected_outside_data_segment() {
        let mut ctx = Context::new();
        let mut cpu = Cpu::new();
        ctx.segment = SegmentKind::Text;
        let tokens = statement_tokens(".align 2");
        let err = execute(&mut ctx, &mut cpu, &tokens[0], &tokens[1..]).unwrap_err();
        assert!(matches!(err, AssembleError::InvalidSegment { .. }));
    }

    #[test]
    fn globl_is_collected_not_applied_immediately() {
        let mut ctx = Context::new();
        let mut cpu = Cpu::new();
        let tokens = statement_tokens(".globl main");
        execute(&mut ctx, &mut cpu, &tokens[0], &tokens[1..]).unwrap();
        assert_eq!(ctx.globl_requests.len(), 1);
        assert_eq!(ctx.globl_requests[0].0, "main");
    }
}
