//! Selection of the sections that are mapped into memory at runtime.

use crate::config::STEP;
use crate::error::{DatasetError, Result};
use object::read::{Object, ObjectSection};
use object::{SectionFlags, SectionKind};
use tracing::{debug, trace};

/// Section occupies memory during execution.
pub const SHF_ALLOC: u64 = object::elf::SHF_ALLOC as u64;
/// Section contains executable machine instructions.
pub const SHF_EXECINSTR: u64 = object::elf::SHF_EXECINSTR as u64;

/// An allocatable section: header metadata only, bytes live in the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySection {
    /// Section header index
    pub index: usize,
    pub name: String,
    /// `sh_addr`
    pub address: u64,
    /// `sh_size`
    pub size: u64,
    /// `sh_flags`
    pub flags: u64,
    /// `SHT_NOBITS`: occupies memory but has no file contents
    pub nobits: bool,
}

impl MemorySection {
    pub fn is_executable(&self) -> bool {
        self.flags & SHF_EXECINSTR != 0
    }

    /// One past the last address of the section.
    pub fn end_address(&self) -> u64 {
        self.address.saturating_add(self.size)
    }

    /// `address + k * STEP` for every k that stays below the end address.
    pub fn sample_addresses(&self) -> impl Iterator<Item = u64> {
        (self.address..self.end_address()).step_by(STEP as usize)
    }

    /// Number of sampled addresses, `ceil(size / STEP)`.
    pub fn sample_count(&self) -> u64 {
        self.size.div_ceil(STEP)
    }
}

fn sh_flags(flags: SectionFlags) -> u64 {
    match flags {
        SectionFlags::Elf { sh_flags } => sh_flags,
        _ => 0,
    }
}

/// Collect the `SHF_ALLOC` sections of `file`, ordered by load address.
///
/// Sections sharing an address keep header order. A file without any
/// allocatable section is rejected.
pub fn allocatable_sections(file: &object::File<'_>) -> Result<Vec<MemorySection>> {
    let mut out = Vec::new();
    for section in file.sections() {
        let flags = sh_flags(section.flags());
        let name = section.name().unwrap_or("").to_string();
        if flags & SHF_ALLOC == 0 {
            trace!(section = %name, "Skipping non-allocated section");
            continue;
        }
        let nobits = matches!(
            section.kind(),
            SectionKind::UninitializedData | SectionKind::UninitializedTls
        );
        out.push(MemorySection {
            index: section.index().0,
            name,
            address: section.address(),
            size: section.size(),
            flags,
            nobits,
        });
    }

    if out.is_empty() {
        return Err(DatasetError::NoAllocatableSections);
    }
    out.sort_by_key(|s| s.address);

    debug!(count = out.len(), "Collected allocatable sections");
    Ok(out)
}
