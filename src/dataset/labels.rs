//! Ground-truth rows: one per sampled address of every allocatable section.

use crate::config::DatasetConfig;
use crate::core::disassembler::Disassembler;
use crate::disasm::DisasmSession;
use crate::error::Result;
use crate::formats::elf::relocations::RelocationStats;
use crate::formats::elf::{self, MemorySection};
use crate::io::BinaryFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info_span};

/// Code/data classification of a sampled address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroundTruth {
    Code = 0,
    Data = 1,
}

impl GroundTruth {
    /// Label of every address in `section`: the executable flag decides.
    pub fn of_section(section: &MemorySection) -> Self {
        if section.is_executable() {
            GroundTruth::Code
        } else {
            GroundTruth::Data
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for GroundTruth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// One dataset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledRow {
    pub address: u64,
    pub raw_bytes: [u8; 4],
    /// Decoded text, or `"invalid"`
    pub instruction: String,
    pub label: GroundTruth,
}

/// All rows of one binary plus the sections they came from.
#[derive(Debug, Clone)]
pub struct GroundTruthSet {
    pub file_name: String,
    pub sha256: String,
    pub sections: Vec<MemorySection>,
    pub rows: Vec<LabeledRow>,
    pub relocations: RelocationStats,
}

impl GroundTruthSet {
    pub fn count(&self, label: GroundTruth) -> usize {
        self.rows.iter().filter(|r| r.label == label).count()
    }
}

/// Walk `sections` in order, `STEP` bytes at a time, and label each address.
///
/// Each section is bounded by its own `[address, address + size)`; the
/// label never depends on whether the word decodes.
pub fn label_sections<D: Disassembler>(
    session: &DisasmSession<D>,
    sections: &[MemorySection],
) -> Vec<LabeledRow> {
    let total: u64 = sections.iter().map(|s| s.sample_count()).sum();
    let mut rows = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
    for section in sections {
        let label = GroundTruth::of_section(section);
        for address in section.sample_addresses() {
            rows.push(LabeledRow {
                address,
                raw_bytes: session.read_word(address),
                instruction: session.instruction_text(address),
                label,
            });
        }
        debug!(
            section = %section.name,
            start = format_args!("{:#x}", section.address),
            size = section.size,
            label = label.as_u8(),
            "Labelled section"
        );
    }
    rows
}

/// Generate the ground truth for the binary at `path`.
pub fn generate_ground_truth(path: &Path, config: &DatasetConfig) -> Result<GroundTruthSet> {
    let binary = BinaryFile::open(path, &config.io)?;
    let span = info_span!("ground_truth", binary = %binary.name());
    let _guard = span.enter();

    let file = elf::parse(binary.data())?;
    let sections = elf::allocatable_sections(&file)?;
    let session = DisasmSession::open(&file, &sections, config)?;
    let rows = label_sections(&session, &sections);

    Ok(GroundTruthSet {
        file_name: binary.name(),
        sha256: binary.sha256(),
        sections,
        rows,
        relocations: session.relocation_stats(),
    })
}
