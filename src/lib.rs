//! The main library for the `multipart-print` application.
//!
//! This crate finds gcode files (optionally slicing `.stl` models into them
//! first), reads the filament and print time estimates slic3r leaves in their
//! header comments, and totals them for the whole batch.
//!
//! The library is structured into several modules:
//! - `cli`: Defines the command-line interface.
//! - `gcode`: The grammar of the estimate comment block and print time strings.
//! - `extractor`: Reads gcode files into estimate records, skipping bad files.
//! - `aggregate`: Sums estimate records into a batch total.
//! - `slicer`: Runs the external slic3r binary over models.
//! - `report`: Renders the batch as a text table or JSON.
//! - `error`: Defines the application's error and skip types.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

pub mod aggregate;
pub mod cli;
pub mod error;
pub mod extractor;
pub mod gcode;
pub mod report;
pub mod slicer;

use crate::aggregate::aggregate;
use crate::cli::{Cli, OutputFormat};
use crate::error::AppError;
use crate::extractor::extract_estimates;
use crate::report::Summary;
use crate::slicer::Slicer;

pub use crate::aggregate::AggregateEstimate;
pub use crate::extractor::{EstimateExtractor, EstimateRecord, Extraction};
pub use crate::gcode::PrintTime;

/// Initializes logging to stderr.
///
/// `RUST_LOG` is honored unless `debug` is set, which forces debug level.
pub fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Input files sorted by kind.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InputFiles {
    pub models: Vec<PathBuf>,
    pub gcode: Vec<PathBuf>,
}

/// The main entry point for the application logic.
///
/// This function orchestrates the entire process:
/// 1.  It finds all models and gcode files under the input paths.
/// 2.  If `--slice` was given, it slices the models and adds the gcode they produce.
/// 3.  It extracts an estimate from every gcode file and totals them.
/// 4.  It prints the summary and optionally writes it as JSON.
///
/// # Errors
///
/// Returns an error if an input path is invalid, the slicer setup is invalid,
/// or the summary cannot be written. Individual bad files are skipped, not errors.
pub fn run(cli: &Cli) -> Result<()> {
    // 1. Discover files to process
    let inputs = find_input_files(&cli.input_paths)?;
    let mut gcode_files = inputs.gcode;

    // 2. Slice models
    if cli.slice {
        if inputs.models.is_empty() {
            info!("No .stl models found to slice.");
        } else {
            let config = cli.slicer_config();
            config.validate()?;
            let slicer = Slicer::new(config, cli.slice_options()?);
            info!(
                "Slicing {} models at {}mm...",
                inputs.models.len(),
                slicer.options().layer_height()
            );
            gcode_files.extend(slicer.slice_all(inputs.models.as_slice()));
        }
    } else if !inputs.models.is_empty() {
        info!(
            "Ignoring {} .stl models; pass --slice to slice them.",
            inputs.models.len()
        );
    }
    let gcode_files = dedup_preserving_order(gcode_files);

    if gcode_files.is_empty() {
        println!("No gcode files found in the specified paths.");
        return Ok(());
    }
    info!("Found {} gcode files to scan...", gcode_files.len());

    // 3. Extract and total
    let extraction = extract_estimates(&gcode_files)?;
    let total = aggregate(&extraction.records);
    let summary = Summary::new(&extraction, &total);

    // 4. Report
    match cli.format {
        OutputFormat::Text => print!("{}", summary),
        OutputFormat::Json => println!("{}", summary.to_json()?),
    }

    if let Some(output_path) = &cli.output {
        write_summary(&summary, output_path)?;
        info!("Summary saved to '{}'", output_path.display());
    }

    Ok(())
}

fn write_summary(summary: &Summary, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, summary.to_json()?)
        .with_context(|| format!("Failed to write summary to {}", output_path.display()))
}

/// Sorts the input paths into models and gcode files.
///
/// Directories are walked recursively in file name order. An explicit file path
/// is classified by extension even if it does not exist, so a missing gcode file
/// is reported by the extractor as a skip instead of failing the batch.
///
/// # Errors
///
/// Returns `AppError::InvalidInputPath` for a path that does not exist and has
/// no recognized extension.
pub fn find_input_files<P: AsRef<Path>>(paths: &[P]) -> Result<InputFiles, AppError> {
    let mut files = InputFiles::default();

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() {
                    files.push(entry.path());
                }
            }
        } else if !files.push(path) {
            if !path.exists() {
                return Err(AppError::InvalidInputPath(path.to_path_buf()));
            }
            debug!("Ignoring unsupported file '{}'", path.display());
        }
    }
    Ok(files)
}

impl InputFiles {
    /// Files the path into the matching list. Returns `false` for unsupported extensions.
    fn push(&mut self, path: &Path) -> bool {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match extension.as_str() {
            "stl" => self.models.push(path.to_path_buf()),
            "gcode" => self.gcode.push(path.to_path_buf()),
            _ => return false,
        }
        true
    }
}

fn dedup_preserving_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
