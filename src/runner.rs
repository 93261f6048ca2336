//! Fatal-error handling and the global watchdog.
//!
//! Configuration problems must still produce exactly one parseable output
//! line, so the whole check runs inside [`safe_run`]: on error it prints a
//! single UNKNOWN line and exits 3 before any further output can happen.

use std::fmt::Display;
use std::process;
use std::thread;
use std::time::Duration;

use crate::config::ConfigError;
use crate::probe::RunError;
use crate::report::CheckReport;
use crate::state::ServiceState;
use crate::transport::TransportError;

/// Everything that can abort a run before or outside the step loop.
#[derive(Debug, thiserror::Error)]
pub enum CheckFailure {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Run(#[from] RunError),
    #[error("{0}")]
    Icinga(#[from] crate::icinga::IcingaConfigError),
    #[error("config file defines no steps")]
    NoSteps,
}

/// Runs the given closure; a finished report prints itself and exits with its
/// aggregate state, an error prints one UNKNOWN line and exits 3.
pub fn safe_run<E: Display>(shortname: &str, f: impl FnOnce() -> Result<CheckReport, E>) -> ! {
    match f() {
        Ok(report) => report.print_and_exit(),
        Err(e) => {
            println!("{} {} - {}", shortname, ServiceState::Unknown, e);
            process::exit(ServiceState::Unknown.exit_code());
        }
    }
}

/// Arms the per-run wall-clock deadline on a detached thread. Firing is
/// always fatal and preempts whatever the run was doing; the thread is only
/// ever disarmed implicitly by process exit.
pub fn arm_watchdog(seconds: u64, shortname: &str) {
    let shortname = shortname.to_uppercase();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(seconds));
        println!(
            "{} {} - check timed out after {}s",
            shortname,
            ServiceState::Unknown,
            seconds
        );
        process::exit(ServiceState::Unknown.exit_code());
    });
}
