use std::collections::HashMap;

/// Who may read/write a segment's bytes.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum AccessLevel {
    User,
    Kernel,
    All,
}

impl AccessLevel {
    /// Whether a requester at `self` may touch a segment guarded at `guard`.
    pub fn permits(&self, guard: AccessLevel) -> bool {
        match guard {
            AccessLevel::All => true,
            AccessLevel::Kernel => matches!(self, AccessLevel::Kernel | AccessLevel::All),
            AccessLevel::User => matches!(self, AccessLevel::User | AccessLevel::All),
        }
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum GrowthDirection {
    Static,
    Up,
    Down,
}

/// A single contiguous, fixed-range region of the address space.
///
/// Written bytes live in a sparse map; any address never written reads as zero. Text segments
/// additionally carry a parallel map from address to decoded instruction, kept separate from the
/// byte map so the binary encoding and the decoded form can never disagree.
pub struct MemorySegment<Stmt> {
    pub name: &'static str,
    pub lower: u32,
    pub upper: u32,
    pub access: AccessLevel,
    pub growth: GrowthDirection,
    bytes: HashMap<u32, u8>,
    instructions: Option<HashMap<u32, Stmt>>,
    /// Next free offset for directive-driven allocation / heap growth.
    pub cursor: u32,
}

impl<Stmt> MemorySegment<Stmt> {
    pub fn new(
        name: &'static str,
        lower: u32,
        upper: u32,
        access: AccessLevel,
        growth: GrowthDirection,
        is_text: bool,
    ) -> Self {
        let cursor = match growth {
            GrowthDirection::Down => upper,
            _ => lower,
        };
        MemorySegment {
            name,
            lower,
            upper,
            access,
            growth,
            bytes: HashMap::new(),
            instructions: if is_text { Some(HashMap::new()) } else { None },
            cursor,
        }
    }

    pub fn contains(&self, addr: u32) -> bool {
        self.lower <= addr && addr <= self.upper
    }

    pub fn is_text(&self) -> bool {
        self.instructions.is_some()
    }

    /// Reads a single byte, returning `0` for any address never written (sparse-zero
    /// invariant).
    pub fn read_byte(&self, addr: u32) -> u8 {
        debug_assert!(self.contains(addr));
        *self.bytes.get(&addr).unwrap_or(&0)
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) {
        debug_assert!(self.contains(addr));
        self.bytes.insert(addr, value);
    }

    pub fn read_instruction(&self, addr: u32) -> Option<&Stmt> {
        self.instructions.as_ref().and_then(|m| m.get(&addr))
    }

    /// Returns `Err(())` if this segment has no instruction map (i.e. is not a text segment).
    pub fn write_instruction(&mut self, addr: u32, stmt: Stmt) -> Result<(), ()> {
        match &mut self.instructions {
            Some(m) => {
                m.insert(addr, stmt);
                Ok(())
            }
            None => Err(()),
        }
    }

    /// Iterates the segment word-by-word (4-byte groups starting at `lower`), producing
    /// `(address, word)` pairs — the shape consumed by the collaborator memory-dump interface.
    pub fn dump_words(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let lower = self.lower;
        let word_count = (self.upper - self.lower + 1) / 4;
        (0..word_count).map(move |i| {
            let addr = lower + i * 4;
            let mut word = 0u32;
            for j in 0..4 {
                word = (word << 8) | self.read_byte(addr + j) as u32;
            }
            (addr, word)
        })
    }

    /// The populated `(address, decoded statement)` pairs of a text segment's instruction map,
    /// or `None` for a non-text segment. Unlike [`dump_words`](Self::dump_words), this only
    /// visits addresses an instruction was actually written to, since text segments never
    /// populate the byte map their sibling data segments do.
    pub fn instructions_iter(&self) -> Option<impl Iterator<Item = (u32, &Stmt)>> {
        self.instructions.as_ref().map(|m| m.iter().map(|(&a, s)| (a, s)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unwritten_bytes_read_as_zero() {
        let seg: MemorySegment<()> =
            MemorySegment::new("Test", 0, 0xFF, AccessLevel::All, GrowthDirection::Static, false);
        assert_eq!(seg.read_byte(0x10), 0);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut seg: MemorySegment<()> =
            MemorySegment::new("Test", 0, 0xFF, AccessLevel::All, GrowthDirection::Static, false);
        seg.write_byte(4, 0xAB);
        assert_eq!(seg.read_byte(4), 0xAB);
        assert_eq!(seg.read_byte(5), 0);
    }

    #[test]
    fn access_level_permits_matches_guard() {
        assert!(AccessLevel::Kernel.permits(AccessLevel::All));
        assert!(AccessLevel::Kernel.permits(AccessLevel::Kernel));
        assert!(!AccessLevel::User.permits(AccessLevel::Kernel));
        assert!(AccessLevel::User.permits(AccessLevel::All));
    }

    #[test]
    fn non_text_segment_rejects_instruction_write() {
        let mut seg: MemorySegment<u32> =
            MemorySegment::new("Data", 0, 0xFF, AccessLevel::All, GrowthDirection::Static, false);
        assert!(seg.write_instruction(0, 1).is_err());
    }
}
