//! Configuration for dataset generation.
//!
//! `DatasetConfig` carries everything a run needs. It has sensible defaults,
//! can be loaded from a JSON file, and is then overridden by CLI flags.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Address stride used when sampling a section.
pub const STEP: u64 = 4;

/// Default directory holding the non-stripped binaries.
pub const DEFAULT_BINARY_DIR: &str = "./build-output-mips/nonstripped/usr/local/bin";

/// Default directory receiving the label CSVs.
pub const DEFAULT_LABEL_OUTPUT_DIR: &str = "./build-output-mips/labels";

/// Name of the optional run manifest written into the output directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Resource limits for reading input binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IOLimits {
    /// The absolute maximum file size that can be opened.
    pub max_file_size: u64,
    /// Cap on the summed size of the allocatable sections mapped for one
    /// binary. `SHT_NOBITS` sizes are not bounded by the file size.
    pub max_image_size: u64,
}

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_file_size: 512 * 1024 * 1024,   // 512MB
            max_image_size: 1024 * 1024 * 1024, // 1GB
        }
    }
}

/// Master configuration for a dataset run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory scanned in batch mode (regular files only, not recursive).
    pub binary_dir: PathBuf,
    /// Single binary to process instead of the directory.
    pub binary_file: Option<PathBuf>,
    /// Directory receiving `<binary_name>.csv`.
    pub label_output_dir: PathBuf,
    /// Worker pool size; `None` means CPU count minus one.
    pub max_workers: Option<usize>,
    /// Apply absolute relocations to the memory image before sampling.
    pub apply_relocations: bool,
    /// Write `manifest.json` next to the CSVs after a batch.
    pub write_manifest: bool,
    /// Input limits.
    pub io: IOLimits,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            binary_dir: PathBuf::from(DEFAULT_BINARY_DIR),
            binary_file: None,
            label_output_dir: PathBuf::from(DEFAULT_LABEL_OUTPUT_DIR),
            max_workers: None,
            apply_relocations: true,
            write_manifest: false,
            io: IOLimits::default(),
        }
    }
}

impl DatasetConfig {
    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Pool size actually used for batch processing.
    pub fn effective_workers(&self) -> usize {
        match self.max_workers {
            Some(n) => n.max(1),
            None => default_workers(),
        }
    }

    /// Output CSV path for a given input binary.
    pub fn output_path_for(&self, binary: &Path) -> PathBuf {
        let name = crate::io::file_name_of(binary);
        self.label_output_dir.join(format!("{}.csv", name))
    }
}

/// CPU count minus one, never below one.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1).max(1))
        .unwrap_or(1)
}
