//! Second assembly pass: resolves every [`crate::operand::ResolvedOperand::Label`] against the
//! symbol tables and encodes each pending instruction into its final word.

use crate::context::{resolve_label_value, Context, SegmentKind};
use crate::error::AssembleError;
use crate::operand::{slot_order, ResolvedOperand};
use mips_core::cpu::Cpu;
use mips_core::isa::{DecodedInstruction, Instruction};

/// Resolves one already-matched instruction's operands to concrete `i64` values, substituting
/// any [`ResolvedOperand::Label`] with its address (or, for `lui`, the upper 16 bits of it — the
/// special case the `la` pseudo-instruction's `lui`/`ori` pair relies on; see DESIGN.md).
fn resolve_values(
    instruction: &'static Instruction,
    operands: &[ResolvedOperand],
    own_addr: u32,
    file: &str,
    ctx: &Context,
) -> Result<Vec<i64>, AssembleError> {
    operands
        .iter()
        .map(|op| match op {
            ResolvedOperand::Register(n) => Ok(*n as i64),
            ResolvedOperand::Immediate(v) => Ok(*v),
            ResolvedOperand::Label(name) => {
                let addr = ctx.resolve_symbol(file, name).ok_or_else(|| AssembleError::SymbolDoesNotExist {
                    location: crate::token::SourceLocation {
                        file: std::rc::Rc::new(file.to_owned()),
                        line: 0,
                        line_offset: 0,
                        file_offset: 0,
                    },
                    name: name.clone(),
                })?;
                if instruction.mnemonic == "lui" {
                    Ok(((addr >> 16) & 0xFFFF) as i64)
                } else {
                    Ok(resolve_label_value(instruction.family, addr, own_addr))
                }
            }
        })
        .collect()
}

/// Encodes every instruction `directive::run_statement` reserved a word for, now that every
/// label in the program is known. Writes each encoded
/// [`DecodedInstruction`] into `cpu.memory`'s text segments.
pub fn encode_pending(
    ctx: &Context,
    pending: &[crate::context::PendingInstruction],
    cpu: &mut Cpu,
) -> Result<(), AssembleError> {
    for p in pending {
        let slots = slot_order(p.instruction.mnemonic);
        let values = resolve_values(p.instruction, &p.operands, p.address, &p.file, ctx)?;
        let ops = crate::operand::bind(slots, &values);
        let decoded = DecodedInstruction { instruction: p.instruction, operands: ops };
        cpu.memory
            .write_instruction(p.address, decoded)
            .map_err(|_| AssembleError::InvalidSegment {
                location: p.location.clone(),
                directive: "instruction".to_owned(),
            })?;
    }
    Ok(())
}

pub fn segment_kind_of_addr(addr: u32) -> Option<SegmentKind> {
    use mips_core::constants::{KTEXT_LOWER, KTEXT_UPPER, TEXT_LOWER, TEXT_UPPER};
    if (TEXT_LOWER..=TEXT_UPPER).contains(&addr) {
        Some(SegmentKind::Text)
    } else if (KTEXT_LOWER..=KTEXT_UPPER).contains(&addr) {
        Some(SegmentKind::KText)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::Context;
    use crate::symbol::SymbolTable;
    use crate::token::SourceLocation;
    use mips_core::isa::{basic, Family};
    use std::rc::Rc;

    fn loc() -> SourceLocation {
        SourceLocation { file: Rc::new("t.s".into()), line: 1, line_offset: 0, file_offset: 0 }
    }

    #[test]
    fn lui_label_operand_resolves_to_upper_sixteen_bits() {
        let mut ctx = Context::new();
        ctx.globals.define("target", 0x0040_1234, loc()).unwrap();
        let values = resolve_values(&basic::LUI, &[ResolvedOperand::Label("target".into())], 0, "t.s", &ctx).unwrap();
        assert_eq!(values[0], 0x0040);
    }

    #[test]
    fn ori_label_operand_resolves_to_full_address_truncated_by_assemble() {
        let mut ctx = Context::new();
        ctx.globals.define("target", 0x0040_1234, loc()).unwrap();
        let values = resolve_values(&basic::ORI, &[ResolvedOperand::Register(8), ResolvedOperand::Register(8), ResolvedOperand::Label("target".into())], 0, "t.s", &ctx)
            .unwrap();
        assert_eq!(values[2], 0x0040_1234);
    }

    #[test]
    fn branch_label_resolves_relative_to_its_own_address() {
        let mut ctx = Context::new();
        ctx.globals.define("loop", 0x0040_0000, loc()).unwrap();
        let values = resolve_values(&basic::BEQ, &[ResolvedOperand::Register(0), ResolvedOperand::Register(0), ResolvedOperand::Label("loop".into())], 0x0040_0008, "t.s", &ctx)
            .unwrap();
        assert_eq!(values[2], (0x0040_0000i64 - 0x0040_0008 - 4) >> 2);
        assert_eq!(resolve_label_value(Family::Branch, 0x0040_0000, 0x0040_0008), values[2]);
    }

    #[test]
    fn unresolved_label_is_symbol_does_not_exist() {
        let ctx = Context::new();
        let err = resolve_values(&basic::ORI, &[ResolvedOperand::Label("nowhere".into())], 0, "t.s", &ctx).unwrap_err();
        assert!(matches!(err, AssembleError::SymbolDoesNotExist { .. }));
    }
}
