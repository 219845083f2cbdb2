//! Folds per-file estimates into a single batch total.

use crate::extractor::EstimateRecord;
use crate::gcode::{seconds_to_duration, PrintTime};
use chrono::TimeDelta;

/// The summed estimate for a batch of gcode files.
///
/// Filament fields are rounded to two decimal places after summing; the print
/// time is an exact sum.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateEstimate {
    /// Number of records folded in.
    pub record_count: usize,
    pub filament_used_m: f64,
    pub filament_used_cm3: f64,
    pub filament_used_g: f64,
    pub filament_cost: f64,
    pub print_time: TimeDelta,
}

impl Default for AggregateEstimate {
    fn default() -> Self {
        Self {
            record_count: 0,
            filament_used_m: 0.0,
            filament_used_cm3: 0.0,
            filament_used_g: 0.0,
            filament_cost: 0.0,
            print_time: TimeDelta::zero(),
        }
    }
}

impl AggregateEstimate {
    /// The summed print time split into days, hours, minutes and seconds.
    pub fn print_time_components(&self) -> PrintTime {
        PrintTime::from_seconds(u64::try_from(self.print_time.num_seconds()).unwrap_or(0))
    }
}

impl<'a> FromIterator<&'a EstimateRecord> for AggregateEstimate {
    fn from_iter<I: IntoIterator<Item = &'a EstimateRecord>>(iter: I) -> Self {
        aggregate(iter)
    }
}

/// Sums a batch of records.
///
/// Each float field is summed in ascending order of value, so the result does
/// not depend on the order of `records`. An empty batch yields
/// [`AggregateEstimate::default`].
pub fn aggregate<'a, I>(records: I) -> AggregateEstimate
where
    I: IntoIterator<Item = &'a EstimateRecord>,
{
    let records: Vec<&EstimateRecord> = records.into_iter().collect();
    let seconds = records
        .iter()
        .fold(0u64, |acc, r| acc.saturating_add(r.print_time.total_seconds()));

    AggregateEstimate {
        record_count: records.len(),
        filament_used_m: sorted_sum(records.iter().map(|r| r.filament_used_m)),
        filament_used_cm3: sorted_sum(records.iter().map(|r| r.filament_used_cm3)),
        filament_used_g: sorted_sum(records.iter().map(|r| r.filament_used_g)),
        filament_cost: sorted_sum(records.iter().map(|r| r.filament_cost)),
        print_time: seconds_to_duration(seconds),
    }
}

fn sorted_sum(values: impl Iterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    round_to_hundredths(values.iter().fold(0.0, |acc, v| acc + v))
}

/// Rounds to two decimal places, ties to even.
pub(crate) fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
