//! C FFI surface for an embedding desktop IDE/debugger: the GUI itself is out of scope for this
//! workspace, but the collaborator interface it would be built on is not — a CPU lifecycle, its
//! three register files, its memory segments, the assembler, and the `.mex` executable format,
//! all reachable from a C caller through opaque pointers and out-params.
//!
//! Every entry point returns a [`result::MipsInteropResult`] (or, where there is nothing that
//! can fail, the bare value) rather than panicking across the FFI boundary. None of these
//! functions are safe to call with a dangling or mistyped pointer; that obligation sits with
//! the caller.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

pub mod cpu;
pub mod exit_reason;
pub mod memory;
pub mod program;
pub mod register;
pub mod result;
pub mod util;

#[cfg(test)]
mod test;
