//! Decoded instruction as reported by a disassembler backend.

use serde::{Deserialize, Serialize};

/// A single decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Mnemonic, e.g. `addiu`
    pub mnemonic: String,
    /// Operand text, e.g. `$sp, $sp, -0x20`; empty when there are none
    pub op_str: String,
}

impl Instruction {
    /// Assembly text: the mnemonic followed by the operands, if any.
    pub fn text(&self) -> String {
        if self.op_str.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.op_str)
        }
    }
}
