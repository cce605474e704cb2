//! Core data types shared across the crate.
//!
//! Small, dependency-free types: byte order, the decoded instruction, and
//! the disassembler seam that backends implement.

pub mod binary;
pub mod disassembler;
pub mod instruction;
