//! ELF loading on top of the `object` crate.
//!
//! Parsing is fully delegated to `object`; this module only decides which
//! sections are mapped into memory, builds the memory image a disassembler
//! session reads from, and applies absolute relocations to it.

pub mod image;
pub mod relocations;
pub mod sections;

use crate::core::binary::Endianness;
use crate::core::disassembler::Architecture;
use crate::error::{DatasetError, Result};
use object::read::Object;
use tracing::debug;

pub use image::{MemoryImage, MemoryView, UNMAPPED_BYTE};
pub use sections::{allocatable_sections, MemorySection, SHF_ALLOC, SHF_EXECINSTR};

/// `e_flags` architecture-level field.
const EF_MIPS_ARCH: u32 = 0xf000_0000;
/// `e_flags` value for MIPS32 Release 6.
const EF_MIPS_ARCH_32R6: u32 = 0x9000_0000;
/// `e_flags` value for MIPS64 Release 6.
const EF_MIPS_ARCH_64R6: u32 = 0xa000_0000;

/// Decode target derived from the ELF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfTarget {
    pub architecture: Architecture,
    pub endianness: Endianness,
}

/// Parse `data` as an ELF file.
pub fn parse(data: &[u8]) -> Result<object::File<'_>> {
    let file = object::File::parse(data)?;
    if file.format() != object::BinaryFormat::Elf {
        return Err(DatasetError::InvalidFormat(format!(
            "expected ELF, found {:?}",
            file.format()
        )));
    }
    Ok(file)
}

/// Map the machine reported by `object` and the `e_flags` architecture
/// level onto a decode mode.
///
/// n32 objects are ELF32 but use the 64-bit ISA. 64-bit R6 has no dedicated
/// Capstone mode and decodes as MIPS64.
pub fn select_architecture(machine: object::Architecture, e_flags: u32) -> Result<Architecture> {
    let level = e_flags & EF_MIPS_ARCH;
    let architecture = match machine {
        object::Architecture::Mips64 | object::Architecture::Mips64_N32 => {
            if level == EF_MIPS_ARCH_64R6 {
                debug!("MIPS64 R6 has no dedicated decode mode, using MIPS64");
            }
            Architecture::MIPS64
        }
        object::Architecture::Mips if level == EF_MIPS_ARCH_32R6 => Architecture::MIPS32R6,
        object::Architecture::Mips => Architecture::MIPS,
        other => return Err(DatasetError::UnsupportedArchitecture(format!("{:?}", other))),
    };
    Ok(architecture)
}

/// Select the MIPS decode mode for an ELF file.
pub fn target_of(file: &object::File<'_>) -> Result<ElfTarget> {
    let e_flags = match file.flags() {
        object::FileFlags::Elf { e_flags, .. } => e_flags,
        _ => 0,
    };
    let target = ElfTarget {
        architecture: select_architecture(file.architecture(), e_flags)?,
        endianness: file.endianness().into(),
    };
    debug!(
        arch = %target.architecture,
        endian = %target.endianness,
        e_flags = format_args!("{:#x}", e_flags),
        "Selected decode target"
    );
    Ok(target)
}
