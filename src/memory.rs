use crate::constants::*;
use crate::exception::MipsException;
use crate::segment::{AccessLevel, GrowthDirection, MemorySegment};

/// The eight-segment MIPS32 address space. `Stmt` is the decoded-instruction type stored
/// alongside encoded text-segment words; `mips-core` is agnostic to what that type actually is
/// (it is defined by `mips-asm`), so the memory model is generic over it.
pub struct MipsMemory<Stmt> {
    segments: Vec<MemorySegment<Stmt>>,
}

impl<Stmt> MipsMemory<Stmt> {
    pub fn new() -> Self {
        let segments = vec![
            MemorySegment::new(
                "Reserved (low)",
                BOTTOM_RESERVED_LOWER,
                BOTTOM_RESERVED_UPPER,
                AccessLevel::Kernel,
                GrowthDirection::Static,
                false,
            ),
            MemorySegment::new(
                "User Text",
                TEXT_LOWER,
                TEXT_UPPER,
                AccessLevel::All,
                GrowthDirection::Static,
                true,
            ),
            MemorySegment::new(
                "User Data",
                DATA_LOWER,
                DATA_UPPER,
                AccessLevel::All,
                GrowthDirection::Static,
                false,
            ),
            MemorySegment::new(
                "Heap",
                HEAP_LOWER,
                HEAP_UPPER,
                AccessLevel::All,
                GrowthDirection::Up,
                false,
            ),
            MemorySegment::new(
                "Stack",
                STACK_LOWER,
                STACK_UPPER,
                AccessLevel::All,
                GrowthDirection::Down,
                false,
            ),
            MemorySegment::new(
                "Kernel Text",
                KTEXT_LOWER,
                KTEXT_UPPER,
                AccessLevel::Kernel,
                GrowthDirection::Static,
                true,
            ),
            MemorySegment::new(
                "Kernel Data",
                KDATA_LOWER,
                KDATA_UPPER,
                AccessLevel::Kernel,
                GrowthDirection::Static,
                false,
            ),
            MemorySegment::new(
                "MMIO",
                MMIO_LOWER,
                MMIO_UPPER,
                AccessLevel::Kernel,
                GrowthDirection::Static,
                false,
            ),
            MemorySegment::new(
                "Reserved (high)",
                TOP_RESERVED_LOWER,
                TOP_RESERVED_UPPER,
                AccessLevel::Kernel,
                GrowthDirection::Static,
                false,
            ),
        ];
        MipsMemory { segments }
    }

    pub fn segment_for(&self, addr: u32) -> Option<&MemorySegment<Stmt>> {
        self.segments.iter().find(|s| s.contains(addr))
    }

    pub fn segment_for_mut(&mut self, addr: u32) -> Option<&mut MemorySegment<Stmt>> {
        self.segments.iter_mut().find(|s| s.contains(addr))
    }

    pub fn segment_named(&self, name: &str) -> Option<&MemorySegment<Stmt>> {
        self.segments.iter().find(|s| s.name == name)
    }

    pub fn segment_named_mut(&mut self, name: &str) -> Option<&mut MemorySegment<Stmt>> {
        self.segments.iter_mut().find(|s| s.name == name)
    }

    pub fn segments(&self) -> impl Iterator<Item = &MemorySegment<Stmt>> {
        self.segments.iter()
    }

    /// Word-by-word `(address, word)` pairs for one named segment, for the collaborator
    /// memory-dump interface. `None` if no segment has that name.
    pub fn dump_segment(&self, name: &str) -> Option<Vec<(u32, u32)>> {
        self.segment_named(name).map(|s| s.dump_words().collect())
    }

    fn check_alignment(addr: u32, n: u32) -> Result<(), u32> {
        if n <= 1 {
            return Ok(());
        }
        if addr % n != 0 {
            return Err(addr);
        }
        Ok(())
    }

    /// Reads `n` bytes starting at `addr` (decrementing when `downward`), checking natural
    /// alignment and the requester's access level, and composing the result big-endian.
    pub fn read_bytes(
        &self,
        addr: u32,
        n: u32,
        signed: bool,
        downward: bool,
        requester: AccessLevel,
    ) -> Result<i64, MipsException> {
        Self::check_alignment(addr, n).map_err(MipsException::AddressLoad)?;

        let mut word: u64 = 0;
        for k in 0..n {
            let a = if downward {
                addr.wrapping_sub(k)
            } else {
                addr.wrapping_add(k)
            };
            let seg = self
                .segment_for(a)
                .ok_or(MipsException::AddressLoad(addr))?;
            if !requester.permits(seg.access) {
                return Err(MipsException::AddressLoad(addr));
            }
            word = (word << 8) | seg.read_byte(a) as u64;
        }
        Ok(mips_util::from_bytes(&mips_util::to_bytes(word, n), n * 8, signed))
    }

    /// Writes `n` bytes of `value` starting at `addr`, big-endian, with the same alignment and
    /// access checks as [`read_bytes`](Self::read_bytes).
    pub fn write_bytes(
        &mut self,
        addr: u32,
        value: u64,
        n: u32,
        downward: bool,
        requester: AccessLevel,
    ) -> Result<(), MipsException> {
        Self::check_alignment(addr, n).map_err(MipsException::AddressStore)?;

        let bytes = mips_util::to_bytes(value, n);
        for k in 0..n {
            let a = if downward {
                addr.wrapping_sub(k)
            } else {
                addr.wrapping_add(k)
            };
            let seg = self
                .segment_for_mut(a)
                .ok_or(MipsException::AddressStore(addr))?;
            if !requester.permits(seg.access) {
                return Err(MipsException::AddressStore(addr));
            }
            seg.write_byte(a, bytes[k as usize]);
        }
        Ok(())
    }

    /// Only the two text segments participate; any other target is an address-store error.
    pub fn write_instruction(&mut self, addr: u32, stmt: Stmt) -> Result<(), MipsException> {
        let seg = self
            .segment_for_mut(addr)
            .ok_or(MipsException::AddressStore(addr))?;
        seg.write_instruction(addr, stmt)
            .map_err(|_| MipsException::AddressStore(addr))
    }

    pub fn read_instruction(&self, addr: u32) -> Option<&Stmt> {
        self.segment_for(addr).and_then(|s| s.read_instruction(addr))
    }

    /// Advances the heap segment's cursor by `num_bytes`, rounded up to the next word, and
    /// returns the *old* cursor (the newly allocated block's base address). Rejects growth past
    /// the heap/stack boundary without moving the cursor.
    pub fn allocate_heap(&mut self, num_bytes: u32) -> Result<u32, MipsException> {
        let rounded = (num_bytes + 3) & !3;
        let seg = self
            .segment_named_mut("Heap")
            .expect("heap segment always present");
        let base = seg.cursor;
        let new_cursor = base
            .checked_add(rounded)
            .ok_or(MipsException::AddressStore(base))?;
        if new_cursor > seg.upper {
            return Err(MipsException::AddressStore(base));
        }
        seg.cursor = new_cursor;
        Ok(base)
    }
}

impl<Stmt> Default for MipsMemory<Stmt> {
    fn default() -> Self {
        Self::new()
    }
}

impl MipsMemory<crate::isa::DecodedInstruction> {
    /// Word-by-word `(address, encoded_word)` pairs for a text segment's populated instructions,
    /// re-assembled from each one's own `EncodingTemplate`.
    /// A text segment's byte map is never written to directly, so `dump_segment` alone would
    /// only ever report zeros here; `mips-cli`'s `.mex` export relies on this instead.
    pub fn dump_text(&self, name: &str) -> Option<Vec<(u32, u32)>> {
        let seg = self.segment_named(name)?;
        let mut words: Vec<(u32, u32)> = seg
            .instructions_iter()?
            .map(|(addr, d)| (addr, d.instruction.encoding.assemble(&d.operands)))
            .collect();
        words.sort_unstable_by_key(|&(addr, _)| addr);
        Some(words)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_then_read_round_trips_within_access_level() {
        let mut mem: MipsMemory<()> = MipsMemory::new();
        mem.write_bytes(0x1001_0000, 0xCAFEBABE, 4, false, AccessLevel::All)
            .unwrap();
        let v = mem
            .read_bytes(0x1001_0000, 4, false, false, AccessLevel::All)
            .unwrap();
        assert_eq!(v as u32, 0xCAFEBABE);
    }

    #[test]
    fn unaligned_word_access_raises_address_error() {
        let mem: MipsMemory<()> = MipsMemory::new();
        let err = mem
            .read_bytes(0x1001_0001, 4, false, false, AccessLevel::All)
            .unwrap_err();
        assert_eq!(err, MipsException::AddressLoad(0x1001_0001));
    }

    #[test]
    fn user_requester_cannot_touch_kernel_segment() {
        let mut mem: MipsMemory<()> = MipsMemory::new();
        let err = mem
            .write_bytes(KDATA_LOWER, 1, 1, false, AccessLevel::User)
            .unwrap_err();
        assert_eq!(err, MipsException::AddressStore(KDATA_LOWER));
    }

    #[test]
    fn unwritten_word_reads_as_zero() {
        let mem: MipsMemory<()> = MipsMemory::new();
        let v = mem
            .read_bytes(0x1002_0000, 4, false, false, AccessLevel::All)
            .unwrap();
        assert_eq!(v, 0);
    }

    #[test]
    fn heap_allocation_rounds_up_to_word_and_advances_cursor() {
        let mut mem: MipsMemory<()> = MipsMemory::new();
        let first = mem.allocate_heap(3).unwrap();
        let second = mem.allocate_heap(4).unwrap();
        assert_eq!(first, HEAP_LOWER);
        assert_eq!(second, HEAP_LOWER + 4);
    }

    #[test]
    fn heap_allocation_past_boundary_fails_without_moving_cursor() {
        let mut mem: MipsMemory<()> = MipsMemory::new();
        let before = mem.segment_named("Heap").unwrap().cursor;
        assert!(mem.allocate_heap(u32::MAX).is_err());
        assert_eq!(mem.segment_named("Heap").unwrap().cursor, before);
    }

    #[test]
    fn instruction_write_outside_text_segments_is_address_store_error() {
        let mut mem: MipsMemory<u32> = MipsMemory::new();
        let err = mem.write_instruction(DATA_LOWER, 0).unwrap_err();
        assert_eq!(err, MipsException::AddressStore(DATA_LOWER));
    }

    #[test]
    fn instruction_write_and_read_round_trip_in_text_segment() {
        let mut mem: MipsMemory<u32> = MipsMemory::new();
        mem.write_instruction(TEXT_LOWER, 0xAABBCCDD).unwrap();
        assert_eq!(mem.read_instruction(TEXT_LOWER), Some(&0xAABBCCDD));
    }

    #[test]
    fn dump_segment_reflects_a_prior_write() {
        let mut mem: MipsMemory<()> = MipsMemory::new();
        mem.write_bytes(DATA_LOWER, 0x11223344, 4, false, AccessLevel::All).unwrap();
        let words = mem.dump_segment("User Data").unwrap();
        assert_eq!(words[0], (DATA_LOWER, 0x11223344));
    }

    #[test]
    fn dump_segment_of_unknown_name_is_none() {
        let mem: MipsMemory<()> = MipsMemory::new();
        assert!(mem.dump_segment("Not A Segment").is_none());
    }

    #[test]
    fn dump_text_reassembles_each_populated_instruction_word() {
        use crate::isa::{basic, DecodedInstruction, OperandValues};

        let mut mem: MipsMemory<DecodedInstruction> = MipsMemory::new();
        let ops = OperandValues { rd: 8, rs: 9, rt: 10, ..Default::default() };
        let expected_word = basic::ADD.encoding.assemble(&ops);
        mem.write_instruction(TEXT_LOWER, DecodedInstruction { instruction: &basic::ADD, operands: ops }).unwrap();

        let words = mem.dump_text("User Text").unwrap();
        assert_eq!(words, vec![(TEXT_LOWER, expected_word)]);
    }
}
