//! The monitoring-plugin status object.
//!
//! Collects the aggregate service state, the per-severity narrative lines and
//! the perfdata entries for one run, and renders the single output line the
//! monitoring system parses.

use std::process;

use crate::state::ServiceState;

/// One perfdata entry: a duration in seconds plus its threshold specs.
#[derive(Debug, Clone)]
pub struct Perf {
    label: String,
    seconds: f64,
    warning: Option<String>,
    critical: Option<String>,
}

impl Perf {
    fn render(&self) -> String {
        // label rules: '=' replaced, quotes doubled, quoted when it contains spaces
        let label = self.label.replace('=', "_");
        let label = label.replace('\'', "''");
        let label = if label.contains(' ') {
            format!("'{}'", label)
        } else {
            label
        };

        let mut s = format!("{}={:.3}s", label, self.seconds);
        s.push(';');
        s.push_str(self.warning.as_deref().unwrap_or(""));
        s.push(';');
        s.push_str(self.critical.as_deref().unwrap_or(""));
        s.trim_end_matches(';').to_string()
    }
}

/// Aggregate state and message log for one run.
///
/// The state starts at OK and is only ever raised; UNKNOWN ranks above
/// CRITICAL. Narrative lines are kept in three ordered groups; lines carrying
/// an UNKNOWN severity are filed in the critical group while the aggregate
/// state is raised to UNKNOWN.
pub struct CheckReport {
    shortname: String,
    state: ServiceState,
    ok: Vec<String>,
    warning: Vec<String>,
    critical: Vec<String>,
    perfdata: Vec<Perf>,
}

impl CheckReport {
    pub fn new(shortname: &str) -> Self {
        Self {
            shortname: shortname.to_uppercase(),
            state: ServiceState::Ok,
            ok: Vec::new(),
            warning: Vec::new(),
            critical: Vec::new(),
            perfdata: Vec::new(),
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Raises the aggregate state to at least `state`. Never lowers it.
    pub fn raise_status(&mut self, state: ServiceState) {
        self.state = self.state.max(state);
    }

    pub fn add_ok(&mut self, line: impl Into<String>) {
        self.ok.push(line.into());
    }

    pub fn add_warning(&mut self, line: impl Into<String>) {
        self.warning.push(line.into());
        self.raise_status(ServiceState::Warning);
    }

    pub fn add_critical(&mut self, line: impl Into<String>) {
        self.critical.push(line.into());
        self.raise_status(ServiceState::Critical);
    }

    /// Appends a line under the group matching `state` and raises the
    /// aggregate accordingly.
    pub fn add_line(&mut self, state: ServiceState, line: impl Into<String>) {
        match state {
            ServiceState::Ok => self.add_ok(line),
            ServiceState::Warning => self.add_warning(line),
            ServiceState::Critical => self.add_critical(line),
            ServiceState::Unknown => {
                self.critical.push(line.into());
                self.raise_status(ServiceState::Unknown);
            }
        }
    }

    pub fn add_perfdata(
        &mut self,
        label: &str,
        seconds: f64,
        warning: Option<&str>,
        critical: Option<&str>,
    ) {
        self.perfdata.push(Perf {
            label: label.to_string(),
            seconds,
            warning: warning.map(str::to_string),
            critical: critical.map(str::to_string),
        });
    }

    /// Renders the single status line the monitoring system parses.
    pub fn render(&self) -> String {
        let mut s = format!("{} {} - Check complete.", self.shortname, self.state);

        for (label, lines) in [
            ("CRITICAL", &self.critical),
            ("WARNING", &self.warning),
            ("OK", &self.ok),
        ] {
            if !lines.is_empty() {
                s.push_str(&format!(" {} steps: {}; ", label, lines.join("; ")));
            }
        }

        if !self.perfdata.is_empty() {
            if !s.ends_with(' ') {
                s.push(' ');
            }
            let rendered: Vec<_> = self.perfdata.iter().map(Perf::render).collect();
            s.push_str(&format!("| {}", rendered.join(" ")));
        }

        s
    }

    pub fn exit_code(&self) -> i32 {
        self.state.exit_code()
    }

    /// Prints the status line and exits with the aggregate state's exit code.
    pub fn print_and_exit(&self) -> ! {
        println!("{}", self.render());
        process::exit(self.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_monotonically_raised() {
        let mut report = CheckReport::new("END2END");
        assert_eq!(report.state(), ServiceState::Ok);
        report.raise_status(ServiceState::Warning);
        assert_eq!(report.state(), ServiceState::Warning);
        report.raise_status(ServiceState::Ok);
        assert_eq!(report.state(), ServiceState::Warning);
        report.raise_status(ServiceState::Critical);
        report.raise_status(ServiceState::Warning);
        assert_eq!(report.state(), ServiceState::Critical);
    }

    #[test]
    fn test_unknown_outranks_critical() {
        let mut report = CheckReport::new("END2END");
        report.raise_status(ServiceState::Unknown);
        report.raise_status(ServiceState::Critical);
        assert_eq!(report.state(), ServiceState::Unknown);
        assert_eq!(report.exit_code(), 3);
    }

    #[test]
    fn test_adding_lines_raises_status() {
        let mut report = CheckReport::new("END2END");
        report.add_ok("fine");
        assert_eq!(report.state(), ServiceState::Ok);
        report.add_warning("slow");
        assert_eq!(report.state(), ServiceState::Warning);
        report.add_critical("down");
        assert_eq!(report.state(), ServiceState::Critical);
    }

    #[test]
    fn test_unknown_lines_land_in_the_critical_group() {
        let mut report = CheckReport::new("END2END");
        report.add_line(ServiceState::Unknown, "step 'a' failed (timeout)");
        assert_eq!(report.state(), ServiceState::Unknown);
        assert!(report
            .render()
            .contains("CRITICAL steps: step 'a' failed (timeout); "));
    }

    #[test]
    fn test_render_groups_in_fixed_order() {
        let mut report = CheckReport::new("Shop");
        report.add_ok("step 'a' took 0.050s");
        report.add_critical("step 'c' failed (500 Internal Server Error)");
        report.add_warning("step 'b' took 0.300s (limit 0.2)");
        assert_eq!(
            report.render(),
            "SHOP CRITICAL - Check complete. \
             CRITICAL steps: step 'c' failed (500 Internal Server Error); \
             WARNING steps: step 'b' took 0.300s (limit 0.2); \
             OK steps: step 'a' took 0.050s; "
        );
    }

    #[test]
    fn test_render_with_perfdata() {
        let mut report = CheckReport::new("END2END");
        report.add_ok("step 'a' took 0.050s");
        report.add_perfdata("a", 0.05, None, None);
        report.add_perfdata("total", 0.05, Some("1"), Some("2"));
        assert_eq!(
            report.render(),
            "END2END OK - Check complete. OK steps: step 'a' took 0.050s; \
             | a=0.050s total=0.050s;1;2"
        );
    }

    #[test]
    fn test_perf_label_quoting() {
        let mut report = CheckReport::new("X");
        report.add_perfdata("00 - front page", 0.1, None, None);
        report.add_perfdata("a=b", 0.1, None, None);
        report.add_perfdata("it's", 0.1, None, None);
        let rendered = report.render();
        assert!(rendered.contains("'00 - front page'=0.100s"));
        assert!(rendered.contains("a_b=0.100s"));
        assert!(rendered.contains("it''s=0.100s"));
    }

    #[test]
    fn test_perf_warn_only_keeps_separator() {
        let mut report = CheckReport::new("X");
        report.add_perfdata("a", 0.5, Some("0.2"), None);
        report.add_perfdata("b", 0.5, None, Some("2"));
        let rendered = report.render();
        assert!(rendered.contains("a=0.500s;0.2"));
        assert!(!rendered.contains("a=0.500s;0.2;"));
        assert!(rendered.contains("b=0.500s;;2"));
    }

    #[test]
    fn test_empty_run_renders_banner_only() {
        let report = CheckReport::new("End2End");
        assert_eq!(report.render(), "END2END OK - Check complete.");
    }
}
