//! Virtual memory image of the allocatable sections.
//!
//! Reads are bounded and deterministic. Addresses not backed by any section
//! read as `UNMAPPED_BYTE`, so a word that straddles the end of a section
//! still has a well-defined value.

use crate::core::binary::Endianness;
use crate::error::{DatasetError, Result};
use crate::formats::elf::sections::MemorySection;
use object::read::{Object, ObjectSection};
use object::SectionIndex;
use tracing::debug;

/// Fill value for addresses outside every mapped section.
pub const UNMAPPED_BYTE: u8 = 0xff;

/// Bounded memory reads by virtual address.
pub trait MemoryView {
    /// Read `len` bytes starting at `addr`.
    fn read_bytes(&self, addr: u64, len: usize) -> Vec<u8>;

    /// Convenience: read the 4-byte word at `addr`.
    fn read_word(&self, addr: u64) -> [u8; 4] {
        let b = self.read_bytes(addr, 4);
        [b[0], b[1], b[2], b[3]]
    }

    /// Convenience: read an unsigned value of `width` bytes.
    fn read_uint(&self, addr: u64, width: usize, endian: Endianness) -> u64 {
        endian.read_uint(&self.read_bytes(addr, width))
    }
}

#[derive(Debug, Clone)]
struct Region {
    section_index: usize,
    address: u64,
    data: Vec<u8>,
    /// Contents came from the file (not `SHT_NOBITS`)
    backed: bool,
}

impl Region {
    fn end(&self) -> u64 {
        self.address.saturating_add(self.data.len() as u64)
    }

    fn contains(&self, addr: u64) -> bool {
        self.address <= addr && addr < self.end()
    }
}

/// Memory image built from the allocatable sections of one file.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    regions: Vec<Region>,
    endianness: Endianness,
}

impl MemoryImage {
    /// Load the bytes of `sections` from `file`. `SHT_NOBITS` sections are
    /// zero-filled. Fails before allocating if the sections add up to more
    /// than `max_size` bytes.
    pub fn build(
        file: &object::File<'_>,
        sections: &[MemorySection],
        endianness: Endianness,
        max_size: u64,
    ) -> Result<Self> {
        let total = sections
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.size));
        if total > max_size {
            return Err(DatasetError::ImageTooLarge {
                limit: max_size,
                found: total,
            });
        }

        let mut regions = Vec::with_capacity(sections.len());
        for s in sections {
            let size = usize::try_from(s.size).map_err(|_| {
                DatasetError::InvalidFormat(format!("section {} too large", s.name))
            })?;
            let mut data = if s.nobits {
                Vec::new()
            } else {
                let section = file.section_by_index(SectionIndex(s.index))?;
                section.data()?.to_vec()
            };
            data.resize(size, 0);
            regions.push(Region {
                section_index: s.index,
                address: s.address,
                data,
                backed: !s.nobits,
            });
        }
        debug!(regions = regions.len(), "Built memory image");
        Ok(Self {
            regions,
            endianness,
        })
    }

    /// Build an image directly from `(address, bytes)` pairs.
    pub fn from_regions<I>(regions: I, endianness: Endianness) -> Self
    where
        I: IntoIterator<Item = (u64, Vec<u8>)>,
    {
        let regions = regions
            .into_iter()
            .enumerate()
            .map(|(i, (address, data))| Region {
                section_index: i,
                address,
                data,
                backed: true,
            })
            .collect();
        Self {
            regions,
            endianness,
        }
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// File-backed regions win over `SHT_NOBITS` ones (`.tbss` overlaps
    /// whatever follows it).
    fn region_for(&self, addr: u64) -> Option<&Region> {
        let mut fallback = None;
        for r in &self.regions {
            if r.contains(addr) {
                if r.backed {
                    return Some(r);
                }
                fallback.get_or_insert(r);
            }
        }
        fallback
    }

    pub fn is_mapped(&self, addr: u64) -> bool {
        self.region_for(addr).is_some()
    }

    fn read_byte(&self, addr: u64) -> u8 {
        self.region_for(addr)
            .map(|r| r.data[(addr - r.address) as usize])
            .unwrap_or(UNMAPPED_BYTE)
    }

    /// Overwrite bytes of the section with header index `section_index`,
    /// `offset` bytes from its start.
    pub fn patch_section(&mut self, section_index: usize, offset: u64, bytes: &[u8]) -> Result<()> {
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.section_index == section_index)
            .ok_or_else(|| DatasetError::Relocation {
                address: offset,
                message: format!("section {} is not mapped", section_index),
            })?;
        let start = offset as usize;
        let end = start.saturating_add(bytes.len());
        if end > region.data.len() {
            return Err(DatasetError::Relocation {
                address: region.address.saturating_add(offset),
                message: "patch runs past the end of the section".to_string(),
            });
        }
        region.data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Overwrite bytes at virtual address `addr`.
    pub fn patch_at(&mut self, addr: u64, bytes: &[u8]) -> Result<()> {
        let (index, base) = self
            .region_for(addr)
            .map(|r| (r.section_index, r.address))
            .ok_or_else(|| DatasetError::Relocation {
                address: addr,
                message: "address is not mapped".to_string(),
            })?;
        self.patch_section(index, addr - base, bytes)
    }

    /// Read from inside one section, by header index and offset.
    pub fn read_section(&self, section_index: usize, offset: u64, len: usize) -> Option<&[u8]> {
        let r = self
            .regions
            .iter()
            .find(|r| r.section_index == section_index)?;
        let start = usize::try_from(offset).ok()?;
        r.data.get(start..start.checked_add(len)?)
    }
}

impl MemoryView for MemoryImage {
    fn read_bytes(&self, addr: u64, len: usize) -> Vec<u8> {
        if let Some(r) = self.region_for(addr) {
            let start = (addr - r.address) as usize;
            if let Some(slice) = r.data.get(start..start.saturating_add(len)) {
                if slice.len() == len {
                    return slice.to_vec();
                }
            }
        }
        (0..len as u64)
            .map(|i| self.read_byte(addr.wrapping_add(i)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> MemoryImage {
        MemoryImage::from_regions(
            vec![
                (0x1000, vec![1, 2, 3, 4, 5, 6]),
                (0x1006, vec![7, 8]),
                (0x2000, vec![9, 9, 9, 9]),
            ],
            Endianness::Big,
        )
    }

    #[test]
    fn read_inside_region() {
        assert_eq!(image().read_word(0x1000), [1, 2, 3, 4]);
    }

    #[test]
    fn read_spanning_contiguous_regions() {
        assert_eq!(image().read_word(0x1004), [5, 6, 7, 8]);
    }

    #[test]
    fn read_past_end_fills_unmapped() {
        let img = image();
        assert_eq!(img.read_word(0x1006), [7, 8, 0xff, 0xff]);
        assert_eq!(img.read_word(0x5000), [0xff; 4]);
        assert!(!img.is_mapped(0x1008));
    }

    #[test]
    fn read_uint_uses_endianness() {
        let img = image();
        assert_eq!(img.read_uint(0x1000, 4, Endianness::Big), 0x0102_0304);
        assert_eq!(img.read_uint(0x1000, 4, Endianness::Little), 0x0403_0201);
    }

    #[test]
    fn patch_by_address_and_bounds() {
        let mut img = image();
        img.patch_at(0x2000, &[0xde, 0xad, 0xbe, 0xef]).unwrap();
        assert_eq!(img.read_word(0x2000), [0xde, 0xad, 0xbe, 0xef]);
        assert!(img.patch_at(0x2002, &[0; 4]).is_err());
        assert!(img.patch_at(0x3000, &[0; 4]).is_err());
    }

    #[test]
    fn read_section_by_index() {
        let img = image();
        assert_eq!(img.read_section(1, 0, 2), Some(&[7u8, 8][..]));
        assert_eq!(img.read_section(1, 1, 2), None);
    }
}
