use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Represents a service state from nagios.
///
/// Ordering follows the severity-raising convention of the monitoring-plugin
/// ecosystem: OK < WARNING < CRITICAL < UNKNOWN. Note that UNKNOWN ranks above
/// CRITICAL when raising an aggregate state, even though its exit code is 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
}

/// A severity token from the configuration did not resolve to a known state.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown severity '{0}', expected one of OK, WARNING, CRITICAL, UNKNOWN")]
pub struct InvalidSeverityToken(pub String);

impl ServiceState {
    /// Returns the corresponding nagios exit code to signal the service state of self.
    pub fn exit_code(&self) -> i32 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
        }
    }

    /// Rank used when raising an aggregate state.
    fn rank(&self) -> u8 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
        }
    }

    /// A fatal state terminates the step loop. WARNING and below continue,
    /// CRITICAL and UNKNOWN stop the run.
    pub fn is_fatal(&self) -> bool {
        self.rank() >= ServiceState::Critical.rank()
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Ok => "OK",
            ServiceState::Warning => "WARNING",
            ServiceState::Critical => "CRITICAL",
            ServiceState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl FromStr for ServiceState {
    type Err = InvalidSeverityToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OK" => Ok(ServiceState::Ok),
            "WARNING" => Ok(ServiceState::Warning),
            "CRITICAL" => Ok(ServiceState::Critical),
            "UNKNOWN" => Ok(ServiceState::Unknown),
            _ => Err(InvalidSeverityToken(s.to_string())),
        }
    }
}

impl PartialOrd for ServiceState {
    fn partial_cmp(&self, other: &ServiceState) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServiceState {
    fn cmp(&self, other: &ServiceState) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}
