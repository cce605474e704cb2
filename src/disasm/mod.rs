//! Disassembly backend and the per-file disassembler session.
//!
//! Capstone decodes MIPS32, MIPS32R6 and MIPS64 in either byte order. A
//! `DisasmSession` pairs one decoder with the memory image of one binary.

pub mod capstone;
pub mod session;

pub use session::DisasmSession;

use crate::core::binary::Endianness;
use crate::core::disassembler::{Architecture, DisassemblerResult};

/// Build the decoder for a MIPS target.
pub fn for_arch(
    arch: Architecture,
    endianness: Endianness,
) -> DisassemblerResult<capstone::CapstoneDisassembler> {
    capstone::CapstoneDisassembler::new(arch, endianness)
}
