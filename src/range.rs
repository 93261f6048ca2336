//! Threshold range parsing and evaluation.
//!
//! Implements the standard monitoring-plugins range convention:
//!
//! | Spec      | Violation when                          |
//! |-----------|-----------------------------------------|
//! | `10`      | value < 0 or value > 10                 |
//! | `10:`     | value < 10                              |
//! | `~:10`    | value > 10                              |
//! | `10:20`   | value < 10 or value > 20                |
//! | `@10:20`  | 10 <= value <= 20 (leading `@` inverts) |

use std::str::FromStr;

use crate::state::ServiceState;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("empty threshold range")]
    Empty,
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("range start {0} is greater than range end {1}")]
    StartAboveEnd(String, String),
}

/// A parsed threshold range. A value outside `start..=end` violates the range,
/// unless the spec started with `@`, in which case a value inside violates it.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRange {
    inside: bool,
    start: f64,
    end: f64,
}

impl ThresholdRange {
    /// Whether the given value violates this range.
    pub fn violates(&self, value: f64) -> bool {
        if self.inside {
            value >= self.start && value <= self.end
        } else {
            value < self.start || value > self.end
        }
    }
}

impl FromStr for ThresholdRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RangeError::Empty);
        }

        let (inside, s) = match s.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (start, end) = match s.split_once(':') {
            None => (0.0, parse_bound(s)?),
            Some((lo, hi)) => {
                let start = match lo {
                    "" => 0.0,
                    "~" => f64::NEG_INFINITY,
                    _ => parse_bound(lo)?,
                };
                let end = match hi {
                    "" => f64::INFINITY,
                    _ => parse_bound(hi)?,
                };
                (start, end)
            }
        };

        if start > end {
            return Err(RangeError::StartAboveEnd(start.to_string(), end.to_string()));
        }

        Ok(ThresholdRange { inside, start, end })
    }
}

fn parse_bound(s: &str) -> Result<f64, RangeError> {
    s.parse()
        .map_err(|_| RangeError::NotANumber(s.to_string()))
}

/// Evaluates a value against optional warning and critical range specs.
///
/// The critical range is checked first. A missing or empty spec never
/// violates. Malformed specs are an error, reported as UNKNOWN by the caller.
pub fn check_levels(
    value: f64,
    warning: Option<&str>,
    critical: Option<&str>,
) -> Result<ServiceState, RangeError> {
    if let Some(spec) = critical.filter(|s| !s.trim().is_empty()) {
        if spec.parse::<ThresholdRange>()?.violates(value) {
            return Ok(ServiceState::Critical);
        }
    }
    if let Some(spec) = warning.filter(|s| !s.trim().is_empty()) {
        if spec.parse::<ThresholdRange>()?.violates(value) {
            return Ok(ServiceState::Warning);
        }
    }
    Ok(ServiceState::Ok)
}
