/// Resolved operand values for one instruction, used both to assemble an encoded word and to
/// decode one back.
///
/// Unused fields for a given instruction are left at their zero default; which fields are
/// meaningful is entirely determined by the instruction's [`EncodingTemplate`].
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct OperandValues {
    pub rd: u32,
    pub rs: u32,
    pub rt: u32,
    pub shamt: u32,
    /// Shared by "immediate" and "offset" operand shapes — they occupy the same encoding field
    /// in every instruction that has one.
    pub immediate: i64,
    pub target: u32,
    /// The 2-bit `bp` field used by `align`.
    pub bp: u32,
}

/// One field of a parameterized bit-string encoding template: a constant, or an
/// operand value, occupying the inclusive bit range `[lo, hi]` of the assembled word.
#[derive(Clone, Copy)]
pub enum Field {
    Const { value: u32, lo: u8, hi: u8 },
    Rs { lo: u8, hi: u8 },
    Rt { lo: u8, hi: u8 },
    Rd { lo: u8, hi: u8 },
    Shamt { lo: u8, hi: u8 },
    Immediate { lo: u8, hi: u8 },
    Target { lo: u8, hi: u8 },
    Bp { lo: u8, hi: u8 },
}

pub struct EncodingTemplate(pub &'static [Field]);

impl EncodingTemplate {
    /// Substitutes each declared field with its operand value, masked to the field's width,
    /// never raising on an oversized operand.
    pub fn assemble(&self, ops: &OperandValues) -> u32 {
        let mut word = 0u32;
        for field in self.0 {
            let (value, lo, hi) = match *field {
                Field::Const { value, lo, hi } => (value, lo, hi),
                Field::Rs { lo, hi } => (ops.rs, lo, hi),
                Field::Rt { lo, hi } => (ops.rt, lo, hi),
                Field::Rd { lo, hi } => (ops.rd, lo, hi),
                Field::Shamt { lo, hi } => (ops.shamt, lo, hi),
                Field::Immediate { lo, hi } => (ops.immediate as u32, lo, hi),
                Field::Target { lo, hi } => (ops.target, lo, hi),
                Field::Bp { lo, hi } => (ops.bp, lo, hi),
            };
            let width = (hi - lo + 1) as u32;
            let masked = mips_util::to_uint(value as u64, width) as u32;
            word |= masked << lo;
        }
        word
    }

    pub fn decode(&self, word: u32) -> OperandValues {
        let mut ops = OperandValues::default();
        for field in self.0 {
            match *field {
                Field::Const { .. } => {}
                Field::Rs { lo, hi } => ops.rs = bits(word, lo, hi),
                Field::Rt { lo, hi } => ops.rt = bits(word, lo, hi),
                Field::Rd { lo, hi } => ops.rd = bits(word, lo, hi),
                Field::Shamt { lo, hi } => ops.shamt = bits(word, lo, hi),
                Field::Immediate { lo, hi } => {
                    let width = (hi - lo + 1) as u32;
                    ops.immediate = mips_util::to_int(bits(word, lo, hi) as u64, width);
                }
                Field::Target { lo, hi } => ops.target = bits(word, lo, hi),
                Field::Bp { lo, hi } => ops.bp = bits(word, lo, hi),
            }
        }
        ops
    }
}

fn bits(word: u32, lo: u8, hi: u8) -> u32 {
    mips_util::get_bits(word as u64, lo as u32, hi as u32) as u32
}

#[cfg(test)]
mod test {
    use super::*;

    const R_TYPE: EncodingTemplate = EncodingTemplate(&[
        Field::Const { value: 0, lo: 26, hi: 31 },
        Field::Rs { lo: 21, hi: 25 },
        Field::Rt { lo: 16, hi: 20 },
        Field::Rd { lo: 11, hi: 15 },
        Field::Shamt { lo: 6, hi: 10 },
        Field::Const { value: 0x20, lo: 0, hi: 5 },
    ]);

    #[test]
    fn decode_of_assemble_round_trips() {
        let ops = OperandValues {
            rd: 3,
            rs: 5,
            rt: 7,
            ..Default::default()
        };
        let word = R_TYPE.assemble(&ops);
        let decoded = R_TYPE.decode(word);
        assert_eq!(decoded.rd, 3);
        assert_eq!(decoded.rs, 5);
        assert_eq!(decoded.rt, 7);
    }

    #[test]
    fn assemble_truncates_oversized_operand_without_panicking() {
        let ops = OperandValues {
            rd: 0xFF, // only 5 bits are addressable
            ..Default::default()
        };
        let word = R_TYPE.assemble(&ops);
        assert_eq!(R_TYPE.decode(word).rd, 0xFF & 0x1F);
    }
}
