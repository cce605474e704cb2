//! Error types for the dataset builder.
//!
//! Every failure that aborts a single binary is a `DatasetError`. The batch
//! driver turns these into per-file outcomes; they never stop a batch.

use crate::core::disassembler::DisassemblerError;
use thiserror::Error;

/// Main error type for dataset generation.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The input is not an ELF file the parser understands
    #[error("Invalid binary format: {0}")]
    InvalidFormat(String),

    /// ELF machine is not MIPS
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    /// No section carries SHF_ALLOC
    #[error("No section(s) in main memory.")]
    NoAllocatableSections,

    /// Input larger than the configured limit
    #[error("File size of {found} bytes exceeds the maximum allowed size of {limit} bytes")]
    FileTooLarge { limit: u64, found: u64 },

    /// Allocatable sections add up to more memory than the configured limit
    #[error("Mapped sections need {found} bytes, exceeding the limit of {limit} bytes")]
    ImageTooLarge { limit: u64, found: u64 },

    /// Relocation could not be applied to the memory image
    #[error("Relocation error at {address:#x}: {message}")]
    Relocation { address: u64, message: String },

    /// Disassembler engine could not be created
    #[error("Disassembler error: {0}")]
    Disassembler(#[from] DisassemblerError),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON configuration / manifest errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid user input (paths, options)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<object::read::Error> for DatasetError {
    fn from(err: object::read::Error) -> Self {
        DatasetError::InvalidFormat(err.to_string())
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(err: serde_json::Error) -> Self {
        DatasetError::Serialization(err.to_string())
    }
}

/// Result type alias for dataset operations
pub type Result<T> = std::result::Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DatasetError::InvalidFormat("Unknown magic bytes".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid binary format: Unknown magic bytes"
        );

        let err = DatasetError::Relocation {
            address: 0x400120,
            message: "outside image".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Relocation error at 0x400120: outside image"
        );
    }

    #[test]
    fn test_no_sections_message() {
        assert_eq!(
            DatasetError::NoAllocatableSections.to_string(),
            "No section(s) in main memory."
        );
    }

    #[test]
    fn test_disassembler_error_converts() {
        let err: DatasetError = DisassemblerError::UnsupportedArchitecture().into();
        assert!(matches!(err, DatasetError::Disassembler(_)));
        assert_eq!(err.to_string(), "Disassembler error: UnsupportedArchitecture");
    }
}
