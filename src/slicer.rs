//! Drives the external slic3r binary to turn `.stl` models into gcode.
//!
//! Only the command line is built here; slicing itself is done by the binary.

use crate::aggregate::round_to_hundredths;
use crate::error::AppError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// Where the slicer binary and its print profile live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicerConfig {
    pub binary: PathBuf,
    pub profile: PathBuf,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("bin/slic3r-pe.AppImage"),
            profile: PathBuf::from("profiles/slic3r-pe-config.ini"),
        }
    }
}

impl SlicerConfig {
    /// Checks that both the binary and the profile exist.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.binary.is_file() {
            return Err(AppError::SlicerNotFound(self.binary.clone()));
        }
        if !self.profile.is_file() {
            return Err(AppError::ProfileNotFound(self.profile.clone()));
        }
        Ok(())
    }
}

/// Per-batch slicing settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceOptions {
    layer_height: f64,
    supports: bool,
}

impl SliceOptions {
    pub const MIN_LAYER_HEIGHT: f64 = 0.05;
    pub const MAX_LAYER_HEIGHT: f64 = 0.35;
    /// The first layer is printed this much thicker than the rest.
    pub const FIRST_LAYER_OFFSET: f64 = 0.05;

    /// Rounds `layer_height` to hundredths of a millimeter and checks its range.
    pub fn new(layer_height: f64, supports: bool) -> Result<Self, AppError> {
        let rounded = round_to_hundredths(layer_height);
        if !(Self::MIN_LAYER_HEIGHT..=Self::MAX_LAYER_HEIGHT).contains(&rounded) {
            return Err(AppError::InvalidLayerHeight(layer_height));
        }
        Ok(Self {
            layer_height: rounded,
            supports,
        })
    }

    pub fn layer_height(&self) -> f64 {
        self.layer_height
    }

    pub fn first_layer_height(&self) -> f64 {
        round_to_hundredths(self.layer_height + Self::FIRST_LAYER_OFFSET)
    }

    pub fn supports(&self) -> bool {
        self.supports
    }

    /// `part.stl` sliced at 0.2mm becomes `part-0.2mm.gcode` in the same directory.
    pub fn output_path(&self, model: &Path) -> PathBuf {
        let stem = model.file_stem().unwrap_or_default().to_string_lossy();
        model.with_file_name(format!("{}-{}mm.gcode", stem, self.layer_height))
    }
}

#[derive(Debug, Clone)]
pub struct Slicer {
    config: SlicerConfig,
    options: SliceOptions,
}

impl Slicer {
    pub fn new(config: SlicerConfig, options: SliceOptions) -> Self {
        Self { config, options }
    }

    pub fn options(&self) -> &SliceOptions {
        &self.options
    }

    /// Arguments passed to the binary for one model.
    pub fn args(&self, model: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--slice".into(),
            "--load".into(),
            self.config.profile.clone().into(),
            "--first-layer-height".into(),
            self.options.first_layer_height().to_string().into(),
            "--layer-height".into(),
            self.options.layer_height().to_string().into(),
            model.into(),
        ];
        if self.options.supports() {
            args.push("--support-material".into());
        }
        args.push("--output".into());
        args.push(output.into());
        args
    }

    /// Slices one model and returns the path of the gcode it produced.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SlicerSpawn` if the binary cannot be started and
    /// `AppError::SlicerFailed` if it exits unsuccessfully.
    pub fn slice_model(&self, model: &Path) -> Result<PathBuf, AppError> {
        let output_path = self.options.output_path(model);
        let output = Command::new(&self.config.binary)
            .args(self.args(model, &output_path))
            .output()
            .map_err(|source| AppError::SlicerSpawn {
                binary: self.config.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(AppError::SlicerFailed {
                model: model.to_path_buf(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output_path)
    }

    /// Slices every model in order. Failures are logged and left out of the result.
    pub fn slice_all<P: AsRef<Path>>(&self, models: &[P]) -> Vec<PathBuf> {
        let mut produced = Vec::with_capacity(models.len());
        for model in models {
            let model = model.as_ref();
            info!(
                "Slicing '{}' at {}mm{}...",
                model.display(),
                self.options.layer_height(),
                if self.options.supports() { " with supports" } else { "" }
            );
            match self.slice_model(model) {
                Ok(gcode) => {
                    info!("  -> Wrote '{}'", gcode.display());
                    produced.push(gcode);
                }
                Err(e) => warn!("Skipping '{}': {}", model.display(), e),
            }
        }
        produced
    }
}
