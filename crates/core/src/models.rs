use crate::error::{CompandError, CompandResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Separator between list items in option strings (`-70/-70|-60/-20`)
pub const ITEM_SEPARATOR: char = '|';

/// One point of the transfer function, both levels in dB
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub input_db: f64,
    pub output_db: f64,
}

impl Breakpoint {
    pub fn new(input_db: f64, output_db: f64) -> Self {
        Self {
            input_db,
            output_db,
        }
    }

    /// Gain applied at this point relative to the input level
    pub fn gain_db(&self) -> f64 {
        self.output_db - self.input_db
    }
}

/// Error type for a malformed `in/out` pair
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseBreakpointError;

impl std::fmt::Display for ParseBreakpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid transfer point, expected 'in/out'")
    }
}

impl std::error::Error for ParseBreakpointError {}

impl FromStr for Breakpoint {
    type Err = ParseBreakpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (input, output) = s.split_once('/').ok_or(ParseBreakpointError)?;
        let input_db = input.trim().parse::<f64>().map_err(|_| ParseBreakpointError)?;
        let output_db = output.trim().parse::<f64>().map_err(|_| ParseBreakpointError)?;
        if !input_db.is_finite() || !output_db.is_finite() {
            return Err(ParseBreakpointError);
        }
        Ok(Breakpoint::new(input_db, output_db))
    }
}

/// Parse a `|`-separated list of `in/out` transfer points
///
/// Input levels must be non-decreasing.
pub fn parse_points(points: &str) -> CompandResult<Vec<Breakpoint>> {
    let mut parsed: Vec<Breakpoint> = Vec::new();

    for (index, item) in points.split(ITEM_SEPARATOR).enumerate() {
        let point = item.parse::<Breakpoint>().map_err(|_| CompandError::InvalidPoint {
            index,
            value: item.trim().to_string(),
        })?;

        if let Some(previous) = parsed.last() {
            if previous.input_db > point.input_db {
                return Err(CompandError::NonIncreasingPoints {
                    index,
                    previous: previous.input_db,
                    input: point.input_db,
                });
            }
        }

        tracing::debug!(
            "{}: x={} y={}",
            index,
            point.input_db,
            point.gain_db()
        );
        parsed.push(point);
    }

    Ok(parsed)
}

/// Check that breakpoints built outside of [`parse_points`] are ordered
pub fn validate_points(points: &[Breakpoint]) -> CompandResult<()> {
    for (index, pair) in points.windows(2).enumerate() {
        if pair[0].input_db > pair[1].input_db {
            return Err(CompandError::NonIncreasingPoints {
                index: index + 1,
                previous: pair[0].input_db,
                input: pair[1].input_db,
            });
        }
    }
    Ok(())
}

/// Parse a `|`-separated list of time constants in seconds
///
/// `kind` names the option in error messages ("attack" or "decay").
pub fn parse_time_list(list: &str, kind: &'static str) -> CompandResult<Vec<f64>> {
    list.split(ITEM_SEPARATOR)
        .map(|item| {
            let value = item
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| CompandError::InvalidTime {
                    kind,
                    value: item.trim().to_string(),
                })?;
            if value < 0.0 {
                return Err(CompandError::NegativeTime { kind, value });
            }
            Ok(value)
        })
        .collect()
}
