//! Ground-truth dataset builder for MIPS ELF binaries.
//!
//! Every allocatable section of a binary is sampled at a 4-byte stride. Each
//! sampled address becomes one CSV row holding the address, the raw word, the
//! instruction Capstone decodes there, and a code(0)/data(1) label taken from
//! the section's executable flag.

pub mod batch;
pub mod config;
pub mod core;
pub mod dataset;
pub mod disasm;
pub mod error;
pub mod formats;
pub mod io;
pub mod logging;

pub use config::DatasetConfig;
pub use error::{DatasetError, Result};
