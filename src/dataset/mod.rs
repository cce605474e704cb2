//! Dataset generation for a single binary.
//!
//! `process_file` is the unit of work the batch driver schedules: generate
//! the ground truth, then write `<binary_name>.csv`. The CSV is written to a
//! temporary file in the output directory and renamed into place, so a
//! failure never leaves a partial CSV behind.

pub mod labels;
pub mod manifest;
pub mod output;

pub use labels::{generate_ground_truth, label_sections, GroundTruth, GroundTruthSet, LabeledRow};
pub use output::write_csv;

use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Summary of one successfully processed binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub file_name: String,
    pub output: PathBuf,
    pub sha256: String,
    pub sections: usize,
    pub rows: usize,
    pub code_rows: usize,
    pub data_rows: usize,
    /// Absolute relocations applied before sampling
    #[serde(default)]
    pub relocations_applied: usize,
}

/// Generate the ground truth for `path` and write it to `output_file`.
pub fn process_file(path: &Path, output_file: &Path, config: &DatasetConfig) -> Result<FileReport> {
    let set = generate_ground_truth(path, config)?;

    let dir = output_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        write_csv(&set.rows, &mut writer)?;
        writer.flush()?;
    }
    tmp.persist(output_file)
        .map_err(|e| DatasetError::Io(e.error))?;
    debug!(output = %output_file.display(), "Wrote CSV");

    let report = FileReport {
        file_name: set.file_name.clone(),
        output: output_file.to_path_buf(),
        sha256: set.sha256.clone(),
        sections: set.sections.len(),
        rows: set.rows.len(),
        code_rows: set.count(GroundTruth::Code),
        data_rows: set.count(GroundTruth::Data),
        relocations_applied: set.relocations.applied,
    };
    info!(
        binary = %report.file_name,
        rows = report.rows,
        code = report.code_rows,
        data = report.data_rows,
        relocations = report.relocations_applied,
        "Processed binary"
    );
    Ok(report)
}
