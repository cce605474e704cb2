//! Application of absolute relocations to a memory image.
//!
//! Only absolute 32/64-bit relocations are applied (`S + A`). Everything
//! else, including the MIPS GOT-relative and REL32 kinds the dynamic linker
//! resolves, leaves the image untouched.

use crate::error::Result;
use crate::formats::elf::image::{MemoryImage, MemoryView};
use object::read::{Object, ObjectSection, ObjectSymbol, ObjectSymbolTable, Relocation};
use object::{RelocationKind, RelocationTarget, SymbolIndex};
use tracing::{debug, trace};

/// Counters from one relocation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelocationStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Where a relocation writes.
#[derive(Debug, Clone, Copy)]
enum Place {
    /// Offset into a section (section relocation tables)
    Section { index: usize, offset: u64 },
    /// Virtual address (dynamic relocation table)
    Address(u64),
}

fn absolute_width(reloc: &Relocation) -> Option<usize> {
    match (reloc.kind(), reloc.size()) {
        (RelocationKind::Absolute, 32) => Some(4),
        (RelocationKind::Absolute, 64) => Some(8),
        _ => None,
    }
}

fn symbol_value(file: &object::File<'_>, target: RelocationTarget, dynamic: bool) -> Option<u64> {
    match target {
        RelocationTarget::Symbol(SymbolIndex(idx)) => {
            if dynamic {
                let table = file.dynamic_symbol_table()?;
                table
                    .symbol_by_index(SymbolIndex(idx))
                    .ok()
                    .map(|s| s.address())
            } else {
                file.symbol_by_index(SymbolIndex(idx))
                    .ok()
                    .map(|s| s.address())
            }
        }
        RelocationTarget::Section(index) => file.section_by_index(index).ok().map(|s| s.address()),
        RelocationTarget::Absolute => Some(0),
        _ => None,
    }
}

fn apply_one(
    image: &mut MemoryImage,
    file: &object::File<'_>,
    place: Place,
    reloc: &Relocation,
    dynamic: bool,
) -> Result<bool> {
    let Some(width) = absolute_width(reloc) else {
        return Ok(false);
    };
    let Some(symbol) = symbol_value(file, reloc.target(), dynamic) else {
        return Ok(false);
    };
    let endian = image.endianness();

    let current = match place {
        Place::Section { index, offset } => match image.read_section(index, offset, width) {
            Some(bytes) => endian.read_uint(bytes),
            None => return Ok(false),
        },
        Place::Address(addr) => {
            if !image.is_mapped(addr) {
                return Ok(false);
            }
            image.read_uint(addr, width, endian)
        }
    };
    let addend = if reloc.has_implicit_addend() {
        current
    } else {
        reloc.addend() as u64
    };
    let value = symbol.wrapping_add(addend);
    let bytes = endian.write_uint(value, width);

    match place {
        Place::Section { index, offset } => image.patch_section(index, offset, &bytes)?,
        Place::Address(addr) => image.patch_at(addr, &bytes)?,
    }
    trace!(?place, value = format_args!("{:#x}", value), "Applied relocation");
    Ok(true)
}

/// Apply the section and dynamic relocations of `file` to `image`.
pub fn apply_relocations(file: &object::File<'_>, image: &mut MemoryImage) -> Result<RelocationStats> {
    let mut stats = RelocationStats::default();

    for section in file.sections() {
        let index = section.index().0;
        for (offset, reloc) in section.relocations() {
            let place = Place::Section { index, offset };
            if apply_one(image, file, place, &reloc, false)? {
                stats.applied += 1;
            } else {
                stats.skipped += 1;
            }
        }
    }

    if let Some(relocs) = file.dynamic_relocations() {
        for (addr, reloc) in relocs {
            if apply_one(image, file, Place::Address(addr), &reloc, true)? {
                stats.applied += 1;
            } else {
                stats.skipped += 1;
            }
        }
    }

    debug!(
        applied = stats.applied,
        skipped = stats.skipped,
        "Relocation pass complete"
    );
    Ok(stats)
}
