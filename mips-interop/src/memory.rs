//! A per-segment, word-grouped memory-dump iterator for an embedding collaborator. A dump is
//! handed back as an opaque [`MemoryDump`] — a small owned buffer the C side reads through two
//! out-params and frees with a matching `destroy` call.

use std::ffi::CStr;
use std::os::raw::c_char;

use crate::result::MipsInteropResult;
use crate::util::{destroy, into_ptr};
use mips_core::Cpu;

pub struct MemoryDump {
    /// `[addr0, word0, addr1, word1, ...]`.
    data: Vec<u32>,
}

#[no_mangle]
pub unsafe extern "C" fn mips_memory_dump_segment(
    cpu: *const Cpu,
    name: *const c_char,
    dump: *mut *mut MemoryDump,
) -> MipsInteropResult {
    let name = match CStr::from_ptr(name).to_str() {
        Ok(n) => n,
        Err(_) => return MipsInteropResult::Utf8Error,
    };
    match (*cpu).memory.dump_segment(name) {
        Some(words) => {
            let data = words.into_iter().flat_map(|(a, w)| vec![a, w]).collect();
            *dump = into_ptr(MemoryDump { data });
            MipsInteropResult::Ok
        }
        None => MipsInteropResult::OutOfRange,
    }
}

/// Like [`mips_memory_dump_segment`], but for the two text segments: words are reassembled from
/// each segment's decoded-instruction map rather than read from its (always-empty) byte map,
/// since text segments are never written to byte-by-byte.
#[no_mangle]
pub unsafe extern "C" fn mips_memory_dump_text(
    cpu: *const Cpu,
    name: *const c_char,
    dump: *mut *mut MemoryDump,
) -> MipsInteropResult {
    let name = match CStr::from_ptr(name).to_str() {
        Ok(n) => n,
        Err(_) => return MipsInteropResult::Utf8Error,
    };
    match (*cpu).memory.dump_text(name) {
        Some(words) => {
            let data = words.into_iter().flat_map(|(a, w)| vec![a, w]).collect();
            *dump = into_ptr(MemoryDump { data });
            MipsInteropResult::Ok
        }
        None => MipsInteropResult::OutOfRange,
    }
}

#[no_mangle]
pub unsafe extern "C" fn mips_memory_dump_get_data(dump: *const MemoryDump, data: *mut *const u32, data_len: *mut usize) {
    *data = (*dump).data.as_ptr();
    *data_len = (*dump).data.len();
}

#[no_mangle]
pub unsafe extern "C" fn mips_memory_dump_destroy(dump: *mut MemoryDump) {
    destroy(dump);
}
