//! Disassembler trait and error types for instruction decoding.
//!
//! This module defines the Disassembler trait that provides a common interface
//! for disassembler backends. It also includes the error type for disassembly
//! operations and the MIPS architecture variants a backend can be built for.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::binary::Endianness;
use crate::core::instruction::Instruction;

/// Errors that can occur during disassembly operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DisassemblerError {
    /// Invalid instruction bytes
    InvalidInstruction(),
    /// Insufficient bytes for complete instruction
    InsufficientBytes(),
    /// Unsupported architecture for the selected backend
    UnsupportedArchitecture(),
    /// Internal disassembler error with message
    InternalError(String),
}

impl fmt::Display for DisassemblerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisassemblerError::InvalidInstruction() => write!(f, "InvalidInstruction"),
            DisassemblerError::InsufficientBytes() => write!(f, "InsufficientBytes"),
            DisassemblerError::UnsupportedArchitecture() => write!(f, "UnsupportedArchitecture"),
            DisassemblerError::InternalError(msg) => write!(f, "InternalError: {}", msg),
        }
    }
}

impl std::error::Error for DisassemblerError {}

/// Result type for disassembly operations
pub type DisassemblerResult<T> = Result<T, DisassemblerError>;

/// MIPS architecture variants the dataset builder decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    /// MIPS32 (also covers MIPS I-V and R2 encodings)
    MIPS,
    /// MIPS64
    MIPS64,
    /// MIPS32 Release 6 (reassigned opcodes)
    MIPS32R6,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::MIPS => write!(f, "mips"),
            Architecture::MIPS64 => write!(f, "mips64"),
            Architecture::MIPS32R6 => write!(f, "mips32r6"),
        }
    }
}

/// Core disassembler trait that provides a common interface for instruction decoding
pub trait Disassembler {
    /// Disassemble a single instruction at the given address
    ///
    /// # Arguments
    /// * `address` - The virtual address where the instruction is located
    /// * `bytes` - The raw bytes to disassemble
    fn disassemble_instruction(&self, address: u64, bytes: &[u8])
        -> DisassemblerResult<Instruction>;

    /// Get the maximum instruction length for this architecture in bytes
    fn max_instruction_length(&self) -> usize;

    /// Get the architecture this disassembler supports
    fn architecture(&self) -> Architecture;

    /// Get the endianness this disassembler uses
    fn endianness(&self) -> Endianness;

    /// Get a human-readable name for this disassembler
    fn name(&self) -> &str;
}
