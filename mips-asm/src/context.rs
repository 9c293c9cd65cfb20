//! Assembler context: the mutable state directive statements update as
//! they execute in source order — current segment, each segment's next-free pointer, the
//! symbol tables, and the list of instruction statements still awaiting encoding.

use crate::error::{AssembleError, AssembleWarning};
use crate::operand::ResolvedOperand;
use crate::symbol::SymbolTable;
use crate::token::SourceLocation;
use mips_core::constants::{DATA_LOWER, KDATA_LOWER, KTEXT_LOWER, TEXT_LOWER};
use mips_core::isa::{Family, Instruction};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    KText,
    Data,
    KData,
}

impl SegmentKind {
    pub fn is_text(self) -> bool {
        matches!(self, SegmentKind::Text | SegmentKind::KText)
    }

    pub fn memory_segment_name(self) -> &'static str {
        match self {
            SegmentKind::Text => "User Text",
            SegmentKind::KText => "Kernel Text",
            SegmentKind::Data => "User Data",
            SegmentKind::KData => "Kernel Data",
        }
    }
}

/// One instruction statement, reserved a word at `address` but not yet encoded.
pub struct PendingInstruction {
    pub address: u32,
    pub file: Rc<String>,
    pub instruction: &'static Instruction,
    pub operands: Vec<ResolvedOperand>,
    pub location: SourceLocation,
}

pub struct Context {
    pub segment: SegmentKind,
    text_ptr: u32,
    ktext_ptr: u32,
    data_ptr: u32,
    kdata_ptr: u32,

    pub globals: SymbolTable,
    pub locals: HashMap<String, SymbolTable>,
    pub pending: Vec<PendingInstruction>,
    pub globl_requests: Vec<(String, Rc<String>, SourceLocation)>,
    pub warnings: Vec<AssembleWarning>,
    pub include_stack: HashSet<std::path::PathBuf>,
}

impl Context {
    pub fn new() -> Self {
        Context {
            segment: SegmentKind::Text,
            text_ptr: TEXT_LOWER,
            ktext_ptr: KTEXT_LOWER,
            data_ptr: DATA_LOWER,
            kdata_ptr: KDATA_LOWER,
            globals: SymbolTable::new(),
            locals: HashMap::new(),
            pending: Vec::new(),
            globl_requests: Vec::new(),
            warnings: Vec::new(),
            include_stack: HashSet::new(),
        }
    }

    pub fn local_for(&mut self, file: &str) -> &mut SymbolTable {
        self.locals.entry(file.to_owned()).or_insert_with(SymbolTable::new)
    }

    /// Local-then-global lookup order.
    pub fn resolve_symbol(&self, file: &str, name: &str) -> Option<u32> {
        self.locals
            .get(file)
            .and_then(|t| t.get(name))
            .or_else(|| self.globals.get(name))
            .map(|s| s.address)
    }

    /// Current next-free pointer of the data/kdata segment currently selected, or an
    /// `InvalidSegment` error if the assembler isn't in one.
    pub fn data_pointer(&self, location: &SourceLocation, directive: &str) -> Result<u32, AssembleError> {
        match self.segment {
            SegmentKind::Data => Ok(self.data_ptr),
            SegmentKind::KData => Ok(self.kdata_ptr),
            _ => Err(AssembleError::InvalidSegment {
                location: location.clone(),
                directive: directive.to_owned(),
            }),
        }
    }

    /// `.extern` always allocates in the user data segment regardless of the segment currently
    /// selected.
    pub fn extern_pointer(&self) -> u32 {
        self.data_ptr
    }

    pub fn advance_extern_pointer(&mut self, n: u32) {
        self.data_ptr += n;
    }

    pub fn advance_data_pointer(&mut self, n: u32) {
        match self.segment {
            SegmentKind::Data => self.data_ptr += n,
            SegmentKind::KData => self.kdata_ptr += n,
            _ => unreachable!("advance_data_pointer called outside a data segment"),
        }
    }

    pub fn align_data_pointer(&mut self, power: u32) {
        let align = 1u32 << power;
        let mask = align - 1;
        match self.segment {
            SegmentKind::Data => self.data_ptr = (self.data_ptr + mask) & !mask,
            SegmentKind::KData => self.kdata_ptr = (self.kdata_ptr + mask) & !mask,
            _ => {}
        }
    }

    /// The address a label defined right now, in the current segment, would bind to — the next
    /// free text word or the current data pointer, without consuming either.
    pub fn peek_address(&self) -> u32 {
        match self.segment {
            SegmentKind::Text => self.text_ptr,
            SegmentKind::KText => self.ktext_ptr,
            SegmentKind::Data => self.data_ptr,
            SegmentKind::KData => self.kdata_ptr,
        }
    }

    /// Reserves the next word in the current text segment for an instruction statement,
    /// returning its resolved address.
    pub fn reserve_text_word(&mut self, location: &SourceLocation) -> Result<u32, AssembleError> {
        match self.segment {
            SegmentKind::Text => {
                let addr = self.text_ptr;
                self.text_ptr += 4;
                Ok(addr)
            }
            SegmentKind::KText => {
                let addr = self.ktext_ptr;
                self.ktext_ptr += 4;
                Ok(addr)
            }
            _ => Err(AssembleError::InvalidSegment {
                location: location.clone(),
                directive: "instruction".to_owned(),
            }),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// The label-relative resolution formula an instruction's [`Family`] implies.
pub fn resolve_label_value(family: Family, symbol_addr: u32, own_addr: u32) -> i64 {
    match family {
        Family::Basic | Family::CompactJump => symbol_addr as i64,
        Family::Branch | Family::CompactBranch => {
            ((symbol_addr as i64) - (own_addr as i64) - 4) >> 2
        }
        Family::Jump => (symbol_addr >> 2) as i64,
    }
}
