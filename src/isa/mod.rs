mod encoding;
pub mod basic;
pub mod pseudo;

pub use encoding::{EncodingTemplate, Field, OperandValues};

use crate::cpu::Cpu;
use crate::exception::MipsException;
use std::collections::HashMap;

/// Token-type categories an operand position accepts. `mips-asm` maps its own
/// `Token` enum onto these when matching a statement against the ISA.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum OperandKind {
    Register,
    /// Accepts any of {Immediate, Char, Label}.
    Immediate,
    /// `offset ( rs )` load/store addressing.
    Offset,
    Target,
}

pub type OperandShape = &'static [OperandKind];

/// How the assembler resolves a label operand into this instruction's encoded field.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Family {
    /// Plain R/I/J encodings with no label-relative computation.
    Basic,
    /// `(label_addr - own_addr - 4) >> 2`, has a delay slot.
    Branch,
    /// Same offset formula, no delay slot.
    CompactBranch,
    /// `label_addr >> 2`, upper bits from the delay slot's PC region, has a delay slot.
    Jump,
    /// Signed immediate added to a GPR, no delay slot.
    CompactJump,
}

/// The outcome of one instruction executor: `Ok(None)` for ordinary fall-through (the engine
/// advances the PC the usual `+4`), `Ok(Some(target))` when the instruction unconditionally or
/// conditionally transfers control to `target`, or `Err` when it raised a MIPS exception for
/// the engine to handle.
pub type ExecResult = Result<Option<u32>, MipsException>;

/// A single ISA opcode: mnemonic, operand shape, encoding, and behavior.
///
/// Instructions are held as records carrying function values rather than as subclasses of some
/// abstract instruction type — `execute` closes over nothing; it receives the CPU,
/// the already-resolved operand values, and the instruction's own address (needed by
/// PC-relative instructions and by branch/jump target arithmetic).
pub struct Instruction {
    pub mnemonic: &'static str,
    pub operands: OperandShape,
    pub description: &'static str,
    pub encoding: EncodingTemplate,
    pub family: Family,
    /// Whether the word after this instruction executes before a taken (or, with delay slots
    /// enabled, always-executed) control transfer commits.
    pub has_delay_slot: bool,
    pub is_deprecated: bool,
    /// Whether this instruction ever transfers control (branches and jumps, delayed or
    /// compact). Placing one of these in another instruction's delay slot is a
    /// `ReservedInstruction`, regardless of whether it carries
    /// its own delay slot.
    pub is_control_transfer: bool,
    pub execute: fn(&mut Cpu, OperandValues, u32) -> ExecResult,
}

/// The minimal form of a matched-and-encoded instruction statement stored in text memory for
/// execution: a pointer to its static ISA record plus its resolved operands. The richer,
/// token-level `Statement` used during assembly lives in `mips-asm`; by the time a
/// program is ready to run, only this resolved form is needed.
#[derive(Clone, Copy)]
pub struct DecodedInstruction {
    pub instruction: &'static Instruction,
    pub operands: OperandValues,
}

/// The ISA registry: an indexed collection of basic instructions, built once.
pub struct Isa {
    by_mnemonic: HashMap<&'static str, Vec<&'static Instruction>>,
}

impl Isa {
    pub fn new() -> Self {
        let mut by_mnemonic: HashMap<&'static str, Vec<&'static Instruction>> = HashMap::new();
        for instr in basic::ALL.iter() {
            by_mnemonic.entry(instr.mnemonic).or_default().push(instr);
        }
        Isa { by_mnemonic }
    }

    /// All overloads registered under `mnemonic`, in registration order — `match_instruction`
    /// picks the first whose operand shape matches the statement's tokens.
    pub fn overloads(&self, mnemonic: &str) -> &[&'static Instruction] {
        self.by_mnemonic
            .get(mnemonic)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, mnemonic: &str) -> bool {
        self.by_mnemonic.contains_key(mnemonic)
    }

    /// Recovers the registered instruction (and its operand values) a raw encoded word came
    /// from, for loading a persisted `.mex` program back into a fresh [`Cpu`]'s text memory
    /// (mips-exe stores plain words, not `DecodedInstruction`s). Tries every registered basic
    /// instruction's template in registration order and keeps the first whose `Const` fields
    /// round-trip: decoding then re-assembling the word must reproduce it exactly, the same
    /// round-trip law every `EncodingTemplate` is already required to satisfy.
    pub fn decode(&self, word: u32) -> Option<(&'static Instruction, OperandValues)> {
        basic::ALL.iter().find_map(|instr| {
            let ops = instr.encoding.decode(word);
            if instr.encoding.assemble(&ops) == word {
                Some((*instr, ops))
            } else {
                None
            }
        })
    }
}

impl Default for Isa {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn isa_registers_every_basic_instruction_under_its_mnemonic() {
        let isa = Isa::new();
        assert!(isa.contains("add"));
        assert!(isa.contains("syscall"));
        assert!(isa.contains("beq"));
        assert!(!isa.contains("not-a-real-mnemonic"));
    }

    #[test]
    fn decode_recovers_the_instruction_a_word_was_assembled_from() {
        let isa = Isa::new();
        let ops = OperandValues { rd: 8, rs: 9, rt: 10, ..Default::default() };
        let word = basic::ADD.encoding.assemble(&ops);
        let (instr, decoded) = isa.decode(word).expect("add word should decode");
        assert_eq!(instr.mnemonic, "add");
        assert_eq!((decoded.rd, decoded.rs, decoded.rt), (8, 9, 10));
    }
}
