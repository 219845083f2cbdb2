use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input path: {0} does not exist or is not a file/directory")]
    InvalidInputPath(PathBuf),

    #[error("Layer height {0}mm is outside the supported range of 0.05mm to 0.35mm")]
    InvalidLayerHeight(f64),

    #[error("Slicer binary not found at {0}")]
    SlicerNotFound(PathBuf),

    #[error("Slicer profile not found at {0}")]
    ProfileNotFound(PathBuf),

    #[error("Failed to launch slicer {binary}")]
    SlicerSpawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Slicer exited with {status} while slicing {model}: {stderr}")]
    SlicerFailed {
        model: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Invalid estimate grammar pattern")]
    Pattern(#[from] regex::Error),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize summary to JSON")]
    JsonSerialization(#[from] serde_json::Error),
}

/// Why a gcode file produced no estimate record.
///
/// None of these abort a batch; the extractor logs them and moves on.
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("file {} not found, skipping", .0.display())]
    NotFound(PathBuf),

    #[error("file {} could not be read ({error}), skipping", .path.display())]
    Unreadable { path: PathBuf, error: std::io::Error },

    #[error(
        "file {} does not have properly formatted filament usage and time data, skipping",
        .0.display()
    )]
    MissingEstimateBlock(PathBuf),
}

impl SkipReason {
    /// The file that was skipped.
    pub fn path(&self) -> &Path {
        match self {
            SkipReason::NotFound(path)
            | SkipReason::Unreadable { path, .. }
            | SkipReason::MissingEstimateBlock(path) => path,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrintTimeError {
    #[error("print time is empty")]
    Empty,

    #[error("'{0}' is not a <number><d|h|m|s> component")]
    InvalidComponent(String),

    #[error("component '{0}' is repeated or out of d, h, m, s order")]
    OutOfOrder(String),

    #[error("print time has no seconds component")]
    MissingSeconds,
}
