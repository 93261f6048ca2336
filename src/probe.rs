//! The probe executor.
//!
//! Drives the registry's steps in order, one synchronous HTTP request each,
//! and folds every outcome into the run's [`CheckReport`]. A step's failure
//! policy decides whether the run continues or aborts; threshold violations
//! only ever raise the aggregate state.

use std::time::Instant;

use tracing::debug;

use crate::dump::PageDump;
use crate::range::{check_levels, RangeError};
use crate::report::CheckReport;
use crate::state::ServiceState;
use crate::step::{StepError, StepRegistry};
use crate::thresholds::ThresholdTable;
use crate::transport::{FetchOutcome, HttpTransport, StepRequest};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{0}")]
    MalformedStep(#[from] StepError),
    #[error("invalid threshold range: {0}")]
    Threshold(#[from] RangeError),
}

/// How the step loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step was consumed.
    Completed,
    /// A step's failure policy terminated the run early.
    Aborted(ServiceState),
}

pub struct Probe<'a> {
    registry: &'a StepRegistry,
    warning: &'a ThresholdTable,
    critical: &'a ThresholdTable,
    total_warning: Option<&'a str>,
    total_critical: Option<&'a str>,
    dump: &'a dyn PageDump,
}

impl<'a> Probe<'a> {
    pub fn new(
        registry: &'a StepRegistry,
        warning: &'a ThresholdTable,
        critical: &'a ThresholdTable,
        total_warning: Option<&'a str>,
        total_critical: Option<&'a str>,
        dump: &'a dyn PageDump,
    ) -> Self {
        Self {
            registry,
            warning,
            critical,
            total_warning,
            total_critical,
            dump,
        }
    }

    /// Runs all steps in registry order against `transport`, writing outcomes
    /// into `report`. Returns how the loop ended; configuration problems
    /// discovered while building a step are fatal to the whole run.
    pub fn run(
        &self,
        transport: &dyn HttpTransport,
        report: &mut CheckReport,
    ) -> Result<RunOutcome, RunError> {
        let mut total = 0.0f64;

        for name in self.registry.names() {
            let step = self.registry.step(&name)?;
            debug!(step = %name, url = %step.url, method = %step.method, "running step");

            let request = StepRequest {
                method: &step.method,
                url: &step.url,
                payload: step.payload.as_deref(),
                credentials: step.basic_auth.as_ref(),
            };

            let start = Instant::now();
            let fetched = transport.fetch(&request);
            let duration = round_ms(start.elapsed().as_secs_f64());
            total += duration;

            // a network-level error is a transport failure like any non-2xx/3xx
            let outcome = fetched.unwrap_or_else(|e| FetchOutcome {
                success: false,
                status_line: e.to_string(),
                body: String::new(),
            });
            debug!(step = %name, success = outcome.success, duration, "step done");

            if !outcome.body.is_empty() {
                self.dump.write(&name, &outcome.body);
            }

            if !outcome.success {
                let severity = step.on_failure;
                if severity == ServiceState::Ok {
                    report.add_ok(format!(
                        "step '{}' failed ({}), ignored",
                        name, outcome.status_line
                    ));
                    continue;
                }
                report.add_line(
                    severity,
                    format!("step '{}' failed ({})", name, outcome.status_line),
                );
                if severity.is_fatal() {
                    return Ok(RunOutcome::Aborted(severity));
                }
                continue;
            }

            // perfdata goes out before the content check, so an aborting
            // pattern failure still reports this step's duration
            let warn_spec = self.warning.get(&name);
            let crit_spec = self.critical.get(&name);
            report.add_perfdata(&name, duration, warn_spec, crit_spec);

            if let Some(pattern) = &step.pattern {
                if !pattern.is_match(&outcome.body) {
                    let severity = step.on_pattern_failure;
                    if severity == ServiceState::Ok {
                        report.add_ok(format!(
                            "step '{}' response did not match pattern, ignored",
                            name
                        ));
                    } else {
                        report.add_line(
                            severity,
                            format!("step '{}' response did not match pattern", name),
                        );
                        if severity.is_fatal() {
                            return Ok(RunOutcome::Aborted(severity));
                        }
                    }
                    // a pattern failure skips the duration check for this step
                    continue;
                }
            }

            match check_levels(duration, warn_spec, crit_spec)? {
                ServiceState::Ok => {
                    report.add_ok(format!("step '{}' took {:.3}s", name, duration));
                }
                violated => {
                    let spec = if violated == ServiceState::Critical {
                        crit_spec
                    } else {
                        warn_spec
                    };
                    report.add_line(
                        violated,
                        format!(
                            "step '{}' took {:.3}s (limit {})",
                            name,
                            duration,
                            spec.unwrap_or("")
                        ),
                    );
                }
            }
        }

        match check_levels(total, self.total_warning, self.total_critical)? {
            ServiceState::Ok => report.add_ok(format!("total duration {:.3}s", total)),
            violated => {
                let spec = if violated == ServiceState::Critical {
                    self.total_critical
                } else {
                    self.total_warning
                };
                report.add_line(
                    violated,
                    format!(
                        "total duration {:.3}s (limit {})",
                        total,
                        spec.unwrap_or("")
                    ),
                );
            }
        }
        report.add_perfdata("total", total, self.total_warning, self.total_critical);

        Ok(RunOutcome::Completed)
    }
}

fn round_ms(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
