use crate::error::AppError;
use crate::slicer::{SliceOptions, SlicerConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "A tool to slice multi-part prints and total their filament usage and print time."
)]
pub struct Cli {
    /// Gcode files, .stl models, or folders to scan for them.
    #[arg(required = true, num_args = 1..)]
    pub input_paths: Vec<PathBuf>,

    /// Slice the .stl models found before reading estimates.
    /// Without this flag models are ignored.
    #[arg(long, default_value_t = false)]
    pub slice: bool,

    /// Path to the slic3r binary.
    #[arg(long, default_value = "bin/slic3r-pe.AppImage")]
    pub slicer: PathBuf,

    /// Path to the slic3r print profile.
    #[arg(long, default_value = "profiles/slic3r-pe-config.ini")]
    pub profile: PathBuf,

    /// Layer height in millimeters (0.05 to 0.35).
    #[arg(long, default_value_t = 0.2)]
    pub layer_height: f64,

    /// Generate support material when slicing.
    #[arg(long, default_value_t = false)]
    pub supports: bool,

    /// How to print the summary on stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write the summary as JSON to this file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print debug info about every parsed file.
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    pub fn slicer_config(&self) -> SlicerConfig {
        SlicerConfig {
            binary: self.slicer.clone(),
            profile: self.profile.clone(),
        }
    }

    pub fn slice_options(&self) -> Result<SliceOptions, AppError> {
        SliceOptions::new(self.layer_height, self.supports)
    }
}
