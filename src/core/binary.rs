//! Binary-level properties shared by the ELF loader and the disassembler.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The endianness of a binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    /// Little-endian byte order
    Little,
    /// Big-endian byte order
    Big,
}

impl From<object::Endianness> for Endianness {
    fn from(e: object::Endianness) -> Self {
        match e {
            object::Endianness::Little => Endianness::Little,
            object::Endianness::Big => Endianness::Big,
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => write!(f, "little"),
            Endianness::Big => write!(f, "big"),
        }
    }
}

impl Endianness {
    /// Decode an unsigned word of `bytes.len()` (4 or 8) bytes.
    pub fn read_uint(&self, bytes: &[u8]) -> u64 {
        let mut value = 0u64;
        match self {
            Endianness::Big => {
                for b in bytes {
                    value = (value << 8) | u64::from(*b);
                }
            }
            Endianness::Little => {
                for b in bytes.iter().rev() {
                    value = (value << 8) | u64::from(*b);
                }
            }
        }
        value
    }

    /// Encode the low `width` bytes of `value`.
    pub fn write_uint(&self, value: u64, width: usize) -> Vec<u8> {
        let le = value.to_le_bytes();
        let mut out = le[..width].to_vec();
        if matches!(self, Endianness::Big) {
            out.reverse();
        }
        out
    }
}
