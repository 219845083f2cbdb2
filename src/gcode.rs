//! The grammar for the estimate comment block that slic3r writes into gcode.
//!
//! The block is five consecutive lines, each matched in full:
//!
//! ```text
//! ; filament used = <dec>mm (<dec>cm3)
//! ; filament used = <dec>
//! ; filament cost = <dec>
//! <any line>
//! ; estimated printing time (normal mode) = [<n>d ][<n>h ][<n>m ]<n>s
//! ```
//!
//! `<dec>` is `digits.digits` and `<n>` is `digits`. The first occurrence of the
//! block in a file wins.

use crate::error::PrintTimeError;
use chrono::TimeDelta;
use regex::{Captures, Regex};
use std::fmt;
use std::str::FromStr;

/// The field a line of the estimate block carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    /// Filament length in mm and volume in cm3.
    Usage,
    /// Filament mass in grams.
    Mass,
    /// Filament cost.
    Cost,
    /// Unchecked line between the cost and the print time.
    Spacer,
    /// Estimated print time in normal mode.
    PrintTime,
}

/// A single line rule: the field it yields and the full-line pattern it must match.
struct LineRule {
    field: Field,
    pattern: &'static str,
}

/// The block, in order.
const BLOCK_RULES: [LineRule; 5] = [
    LineRule {
        field: Field::Usage,
        pattern: r"^; filament used = (\d+\.\d+)mm \((\d+\.\d+)cm3\)$",
    },
    LineRule {
        field: Field::Mass,
        pattern: r"^; filament used = (\d+\.\d+)$",
    },
    LineRule {
        field: Field::Cost,
        pattern: r"^; filament cost = (\d+\.\d+)$",
    },
    LineRule {
        field: Field::Spacer,
        pattern: r"^.*$",
    },
    LineRule {
        field: Field::PrintTime,
        pattern: r"^; estimated printing time \(normal mode\) = ((?:\d+d )?(?:\d+h )?(?:\d+m )?\d+s)$",
    },
];

/// The raw values of one estimate block, at source precision and units.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateBlock {
    pub filament_mm: f64,
    pub filament_cm3: f64,
    pub filament_g: f64,
    pub filament_cost: f64,
    pub print_time: PrintTime,
}

/// Compiled form of [`BLOCK_RULES`].
#[derive(Debug, Clone)]
pub struct EstimateGrammar {
    rules: Vec<(Field, Regex)>,
}

impl EstimateGrammar {
    /// Compiles the line rules.
    pub fn new() -> Result<Self, regex::Error> {
        let rules = BLOCK_RULES
            .iter()
            .map(|rule| Regex::new(rule.pattern).map(|regex| (rule.field, regex)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Finds the first complete estimate block in `text`.
    ///
    /// Returns `None` when no run of consecutive lines satisfies every rule.
    pub fn parse(&self, text: &str) -> Option<EstimateBlock> {
        let lines: Vec<&str> = text.lines().collect();
        lines
            .windows(self.rules.len())
            .find_map(|window| self.parse_window(window))
    }

    fn parse_window(&self, window: &[&str]) -> Option<EstimateBlock> {
        let mut builder = BlockBuilder::default();
        for ((field, regex), line) in self.rules.iter().zip(window) {
            let caps = regex.captures(line)?;
            match field {
                Field::Usage => {
                    builder.filament_mm = Some(decimal(&caps, 1)?);
                    builder.filament_cm3 = Some(decimal(&caps, 2)?);
                }
                Field::Mass => builder.filament_g = Some(decimal(&caps, 1)?),
                Field::Cost => builder.filament_cost = Some(decimal(&caps, 1)?),
                Field::Spacer => {}
                Field::PrintTime => {
                    builder.print_time = Some(caps.get(1)?.as_str().parse().ok()?);
                }
            }
        }
        builder.finish()
    }
}

#[derive(Default)]
struct BlockBuilder {
    filament_mm: Option<f64>,
    filament_cm3: Option<f64>,
    filament_g: Option<f64>,
    filament_cost: Option<f64>,
    print_time: Option<PrintTime>,
}

impl BlockBuilder {
    fn finish(self) -> Option<EstimateBlock> {
        Some(EstimateBlock {
            filament_mm: self.filament_mm?,
            filament_cm3: self.filament_cm3?,
            filament_g: self.filament_g?,
            filament_cost: self.filament_cost?,
            print_time: self.print_time?,
        })
    }
}

fn decimal(caps: &Captures<'_>, group: usize) -> Option<f64> {
    caps.get(group)?.as_str().parse().ok()
}

/// A print time decomposed into the components slic3r prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintTime {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

const UNITS: [char; 4] = ['d', 'h', 'm', 's'];

impl PrintTime {
    /// Normalizes a number of seconds into days, hours, minutes and seconds.
    pub const fn from_seconds(total: u64) -> Self {
        Self {
            days: total / 86_400,
            hours: total % 86_400 / 3_600,
            minutes: total % 3_600 / 60,
            seconds: total % 60,
        }
    }

    /// Total elapsed seconds, saturating at `u64::MAX`.
    pub fn total_seconds(&self) -> u64 {
        self.days
            .saturating_mul(86_400)
            .saturating_add(self.hours.saturating_mul(3_600))
            .saturating_add(self.minutes.saturating_mul(60))
            .saturating_add(self.seconds)
    }

    /// The elapsed duration, saturating at [`TimeDelta::MAX`].
    pub fn to_duration(&self) -> TimeDelta {
        seconds_to_duration(self.total_seconds())
    }
}

pub(crate) fn seconds_to_duration(seconds: u64) -> TimeDelta {
    i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

impl FromStr for PrintTime {
    type Err = PrintTimeError;

    /// Parses `[<n>d ][<n>h ][<n>m ]<n>s`. Absent components are zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut components: [Option<u64>; 4] = [None; 4];
        let mut next_unit = 0;

        for token in s.split_whitespace() {
            let mut chars = token.chars();
            let unit = chars
                .next_back()
                .ok_or_else(|| PrintTimeError::InvalidComponent(token.to_string()))?;
            let digits = chars.as_str();
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PrintTimeError::InvalidComponent(token.to_string()));
            }
            let index = UNITS
                .iter()
                .position(|&u| u == unit)
                .ok_or_else(|| PrintTimeError::InvalidComponent(token.to_string()))?;
            if index < next_unit {
                return Err(PrintTimeError::OutOfOrder(token.to_string()));
            }
            let value = digits
                .parse()
                .map_err(|_| PrintTimeError::InvalidComponent(token.to_string()))?;
            components[index] = Some(value);
            next_unit = index + 1;
        }

        if components.iter().all(Option::is_none) {
            return Err(PrintTimeError::Empty);
        }
        let [days, hours, minutes, seconds] = components;
        Ok(Self {
            days: days.unwrap_or(0),
            hours: hours.unwrap_or(0),
            minutes: minutes.unwrap_or(0),
            seconds: seconds.ok_or(PrintTimeError::MissingSeconds)?,
        })
    }
}

/// Formats the way slic3r does: leading zero units are dropped, seconds always shown.
impl fmt::Display for PrintTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days > 0 {
            write!(f, "{}d {}h {}m {}s", self.days, self.hours, self.minutes, self.seconds)
        } else if self.hours > 0 {
            write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
        } else if self.minutes > 0 {
            write!(f, "{}m {}s", self.minutes, self.seconds)
        } else {
            write!(f, "{}s", self.seconds)
        }
    }
}
