//! Reads gcode files and turns their estimate blocks into [`EstimateRecord`]s.
//!
//! Every file is read in full, parsed, and released before the next one is
//! touched. A file that cannot produce a record becomes a [`SkipReason`];
//! nothing here aborts a batch.

use crate::aggregate::round_to_hundredths;
use crate::error::{AppError, SkipReason};
use crate::gcode::{EstimateBlock, EstimateGrammar, PrintTime};
use chrono::TimeDelta;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Filament usage and print time estimated for one gcode file.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRecord {
    /// The gcode file the estimate was read from.
    pub source: PathBuf,
    /// Filament length in meters, rounded to two decimal places.
    pub filament_used_m: f64,
    pub filament_used_cm3: f64,
    pub filament_used_g: f64,
    pub filament_cost: f64,
    pub print_time: PrintTime,
}

impl EstimateRecord {
    /// Builds a record from a parsed block, converting millimeters to meters.
    pub fn from_block(source: PathBuf, block: EstimateBlock) -> Self {
        Self {
            source,
            filament_used_m: round_to_hundredths(block.filament_mm / 1000.0),
            filament_used_cm3: block.filament_cm3,
            filament_used_g: block.filament_g,
            filament_cost: block.filament_cost,
            print_time: block.print_time,
        }
    }

    pub fn print_duration(&self) -> TimeDelta {
        self.print_time.to_duration()
    }
}

/// The outcome of scanning a batch of gcode files.
#[derive(Debug, Default)]
pub struct Extraction {
    /// One record per parsed file, in input order.
    pub records: Vec<EstimateRecord>,
    /// One entry per skipped file, in input order.
    pub skipped: Vec<SkipReason>,
}

#[derive(Debug, Clone)]
pub struct EstimateExtractor {
    grammar: EstimateGrammar,
}

impl EstimateExtractor {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            grammar: EstimateGrammar::new()?,
        })
    }

    /// Reads a single gcode file and parses its estimate block.
    ///
    /// # Errors
    ///
    /// Returns a [`SkipReason`] when the file is missing, unreadable, or has no
    /// well-formed estimate block.
    pub fn extract_file(&self, path: &Path) -> Result<EstimateRecord, SkipReason> {
        let bytes = fs::read(path).map_err(|error| match error.kind() {
            ErrorKind::NotFound => SkipReason::NotFound(path.to_path_buf()),
            _ => SkipReason::Unreadable {
                path: path.to_path_buf(),
                error,
            },
        })?;
        let text = String::from_utf8_lossy(&bytes);

        let block = self
            .grammar
            .parse(&text)
            .ok_or_else(|| SkipReason::MissingEstimateBlock(path.to_path_buf()))?;
        Ok(EstimateRecord::from_block(path.to_path_buf(), block))
    }

    /// Extracts records from every path, logging and collecting skipped files.
    pub fn extract<I, P>(&self, paths: I) -> Extraction
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut extraction = Extraction::default();
        for path in paths {
            let path = path.as_ref();
            match self.extract_file(path) {
                Ok(record) => {
                    debug!(
                        "{}: {}m, {}g, {}",
                        path.display(),
                        record.filament_used_m,
                        record.filament_used_g,
                        record.print_time
                    );
                    extraction.records.push(record);
                }
                Err(reason) => {
                    warn!("{}", reason);
                    extraction.skipped.push(reason);
                }
            }
        }
        extraction
    }
}

/// Convenience wrapper: builds an [`EstimateExtractor`] and runs it over `paths`.
pub fn extract_estimates<I, P>(paths: I) -> Result<Extraction, AppError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    Ok(EstimateExtractor::new()?.extract(paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn gcode(mm: &str, cm3: &str, g: &str, cost: &str, time: &str) -> String {
        format!(
            "; generated by Slic3r Prusa Edition\nG21\nG90\n\
             ; filament used = {mm}mm ({cm3}cm3)\n\
             ; filament used = {g}\n\
             ; filament cost = {cost}\n\
             ; total layers count = 120\n\
             ; estimated printing time (normal mode) = {time}\n\
             ; estimated printing time (silent mode) = {time}\n"
        )
    }

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn recovers_encoded_values() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.gcode", &gcode("2345.67", "5.64", "7.01", "0.18", "2h 3m 10s"));

        let record = EstimateExtractor::new().unwrap().extract_file(&path).unwrap();
        assert_eq!(record.source, path);
        assert_relative_eq!(record.filament_used_m, 2.35);
        assert_relative_eq!(record.filament_used_cm3, 5.64);
        assert_relative_eq!(record.filament_used_g, 7.01);
        assert_relative_eq!(record.filament_cost, 0.18);
        assert_eq!(
            record.print_time,
            PrintTime {
                days: 0,
                hours: 2,
                minutes: 3,
                seconds: 10
            }
        );
        assert_eq!(record.print_duration(), TimeDelta::try_seconds(7_390).unwrap());
    }

    #[test]
    fn converts_millimeters_to_rounded_meters() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.gcode", &gcode("1500.00", "3.61", "4.48", "0.11", "45s"));

        let record = EstimateExtractor::new().unwrap().extract_file(&path).unwrap();
        assert_relative_eq!(record.filament_used_m, 1.50);
    }

    #[test]
    fn half_centimeter_lengths_round_to_even() {
        let dir = TempDir::new().unwrap();
        let extractor = EstimateExtractor::new().unwrap();

        let path = write(&dir, "a.gcode", &gcode("125.00", "0.30", "0.37", "0.01", "1s"));
        assert_eq!(extractor.extract_file(&path).unwrap().filament_used_m, 0.12);

        let path = write(&dir, "b.gcode", &gcode("1625.00", "3.91", "4.85", "0.12", "1s"));
        assert_eq!(extractor.extract_file(&path).unwrap().filament_used_m, 1.62);
    }

    #[test]
    fn keeps_source_precision_for_volume_mass_and_cost() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.gcode", &gcode("10.00", "1.2345", "2.3456", "1.111", "1s"));

        let record = EstimateExtractor::new().unwrap().extract_file(&path).unwrap();
        assert_eq!(record.filament_used_cm3, 1.2345);
        assert_eq!(record.filament_used_g, 2.3456);
        assert_eq!(record.filament_cost, 1.111);
    }

    #[test]
    fn missing_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.gcode");
        let good = write(&dir, "good.gcode", &gcode("1000.00", "2.41", "2.99", "0.07", "5m 0s"));

        let extraction = extract_estimates([&missing, &good]).unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].source, good);
        assert_eq!(extraction.skipped.len(), 1);
        assert!(matches!(&extraction.skipped[0], SkipReason::NotFound(p) if *p == missing));
    }

    #[test]
    fn malformed_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.gcode", "G28\nG1 X0 Y0\n; filament used = 12.00mm\n");

        let extraction = extract_estimates([&path]).unwrap();
        assert!(extraction.records.is_empty());
        assert!(matches!(
            &extraction.skipped[0],
            SkipReason::MissingEstimateBlock(p) if *p == path
        ));
    }

    #[test]
    fn directory_is_unreadable_not_missing() {
        let dir = TempDir::new().unwrap();

        let extraction = extract_estimates([dir.path()]).unwrap();
        assert!(extraction.records.is_empty());
        assert!(matches!(&extraction.skipped[0], SkipReason::Unreadable { .. }));
    }

    #[test]
    fn invalid_utf8_does_not_prevent_parsing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.gcode");
        let mut bytes = vec![0xff, 0xfe, b'\n'];
        bytes.extend_from_slice(gcode("1000.00", "2.41", "2.99", "0.07", "1s").as_bytes());
        fs::write(&path, bytes).unwrap();

        let record = EstimateExtractor::new().unwrap().extract_file(&path).unwrap();
        assert_relative_eq!(record.filament_used_g, 2.99);
    }

    #[test]
    fn preserves_input_order() {
        let dir = TempDir::new().unwrap();
        let first = write(&dir, "z.gcode", &gcode("1000.00", "1.00", "1.00", "1.00", "1s"));
        let second = write(&dir, "a.gcode", &gcode("2000.00", "2.00", "2.00", "2.00", "2s"));

        let extraction = extract_estimates([&first, &second]).unwrap();
        let sources: Vec<_> = extraction.records.iter().map(|r| &r.source).collect();
        assert_eq!(sources, vec![&first, &second]);
    }
}
