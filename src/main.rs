use anyhow::Context;
use clap::Parser;
use mipsgt::batch::{self, CancelToken};
use mipsgt::config::DatasetConfig;
use mipsgt::logging;
use std::path::PathBuf;
use tracing::debug;

/// Create a code/data ground-truth dataset from MIPS ELF binaries
#[derive(Parser, Debug)]
#[command(name = "mipsgt", version, about, long_about = None)]
struct Cli {
    /// Directory of the non-stripped binaries [default: ./build-output-mips/nonstripped/usr/local/bin]
    #[arg(short = 'b', long = "binary_dir", value_name = "DIR")]
    binary_dir: Option<PathBuf>,

    /// Specific single binary file to process
    #[arg(short = 'f', long = "binary_file", value_name = "FILE")]
    binary_file: Option<PathBuf>,

    /// Directory to output the label files [default: ./build-output-mips/labels]
    #[arg(short = 'o', long = "label_output_dir", value_name = "DIR")]
    label_output_dir: Option<PathBuf>,

    /// Number of parallel workers [default: CPU count - 1]
    #[arg(short = 'j', long = "max_workers", value_name = "N")]
    max_workers: Option<usize>,

    /// JSON configuration file; command-line flags take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write manifest.json into the output directory after a batch
    #[arg(long)]
    manifest: bool,

    /// Do not apply relocations before sampling
    #[arg(long = "no-relocs")]
    no_relocs: bool,

    /// Emit logs as JSON
    #[arg(long = "log-json")]
    log_json: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<DatasetConfig> {
        let mut config = match &self.config {
            Some(path) => DatasetConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => DatasetConfig::default(),
        };
        if let Some(dir) = self.binary_dir {
            config.binary_dir = dir;
        }
        if let Some(file) = self.binary_file {
            config.binary_file = Some(file);
        }
        if let Some(dir) = self.label_output_dir {
            config.label_output_dir = dir;
        }
        if let Some(n) = self.max_workers {
            config.max_workers = Some(n);
        }
        if self.manifest {
            config.write_manifest = true;
        }
        if self.no_relocs {
            config.apply_relocations = false;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.log_json {
        logging::init_tracing_json();
    } else {
        logging::init_tracing();
    }

    let config = cli.into_config()?;
    debug!(?config, "Resolved configuration");

    if let Some(file) = config.binary_file.clone() {
        batch::run_single(&file, &config)
            .map_err(|e| mipsgt::log_error!(e, "single-file setup"))
            .with_context(|| format!("processing {}", file.display()))?;
        std::process::exit(0);
    }

    let cancel = CancelToken::new();
    batch::install_interrupt_handler(cancel.clone()).context("installing interrupt handler")?;
    batch::run_batch(&config, &cancel)
        .map_err(|e| mipsgt::log_error!(e, "batch setup"))
        .with_context(|| format!("processing {}", config.binary_dir.display()))?;
    Ok(())
}
