//! Renders a batch as a plain-text table or as JSON.

use crate::aggregate::AggregateEstimate;
use crate::error::AppError;
use crate::extractor::Extraction;
use serde::Serialize;
use std::fmt;

/// Everything shown to the user for one batch: per-file estimates, skipped
/// files, and the batch total.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub records: Vec<RecordRow>,
    pub skipped: Vec<SkippedRow>,
    pub aggregate: TotalRow,
}

#[derive(Debug, Serialize)]
pub struct RecordRow {
    pub file: String,
    pub filament_used_m: f64,
    pub filament_used_cm3: f64,
    pub filament_used_g: f64,
    pub filament_cost: f64,
    pub print_time: String,
    pub print_time_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct SkippedRow {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct TotalRow {
    pub files: usize,
    pub filament_used_m: f64,
    pub filament_used_cm3: f64,
    pub filament_used_g: f64,
    pub filament_cost: f64,
    pub print_time: String,
    pub print_time_seconds: i64,
}

impl Summary {
    pub fn new(extraction: &Extraction, total: &AggregateEstimate) -> Self {
        let records = extraction
            .records
            .iter()
            .map(|r| RecordRow {
                file: r.source.display().to_string(),
                filament_used_m: r.filament_used_m,
                filament_used_cm3: r.filament_used_cm3,
                filament_used_g: r.filament_used_g,
                filament_cost: r.filament_cost,
                print_time: r.print_time.to_string(),
                print_time_seconds: r.print_time.total_seconds(),
            })
            .collect();

        let skipped = extraction
            .skipped
            .iter()
            .map(|s| SkippedRow {
                file: s.path().display().to_string(),
                reason: s.to_string(),
            })
            .collect();

        Self {
            records,
            skipped,
            aggregate: TotalRow {
                files: total.record_count,
                filament_used_m: total.filament_used_m,
                filament_used_cm3: total.filament_used_cm3,
                filament_used_g: total.filament_used_g,
                filament_cost: total.filament_cost,
                print_time: total.print_time_components().to_string(),
                print_time_seconds: total.print_time.num_seconds(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn total_label(&self) -> String {
        format!("Total ({} files)", self.aggregate.files)
    }
}

/// Plain-text table, one line per file followed by the total.
impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .records
            .iter()
            .map(|r| r.file.len())
            .chain(["File".len(), self.total_label().len()])
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:<width$}  {:>10}  {:>12}  {:>10}  {:>8}  {}",
            "File", "Length (m)", "Volume (cm3)", "Mass (g)", "Cost", "Print time"
        )?;
        for r in &self.records {
            writeln!(
                f,
                "{:<width$}  {:>10.2}  {:>12.2}  {:>10.2}  {:>8.2}  {}",
                r.file,
                r.filament_used_m,
                r.filament_used_cm3,
                r.filament_used_g,
                r.filament_cost,
                r.print_time
            )?;
        }
        let t = &self.aggregate;
        writeln!(
            f,
            "{:<width$}  {:>10.2}  {:>12.2}  {:>10.2}  {:>8.2}  {}",
            self.total_label(),
            t.filament_used_m,
            t.filament_used_cm3,
            t.filament_used_g,
            t.filament_cost,
            t.print_time
        )?;

        if !self.skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped {} file(s):", self.skipped.len())?;
            for s in &self.skipped {
                writeln!(f, "  - {}", s.reason)?;
            }
        }
        Ok(())
    }
}
