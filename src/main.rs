use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use check_end2end::config::{self, FileConfig, Interpolator};
use check_end2end::dump::{DirDump, NoopDump, PageDump};
use check_end2end::icinga;
use check_end2end::probe::Probe;
use check_end2end::report::CheckReport;
use check_end2end::runner::{self, CheckFailure};
use check_end2end::step::{Credentials, StepRegistry};
use check_end2end::thresholds::ThresholdTable;
use check_end2end::transport::{BlockingTransport, TransportOptions};

/// Multi-step end-to-end HTTP check for nagios/icinga.
#[derive(Parser)]
#[command(name = "check_end2end", version)]
struct Cli {
    /// Path to the check configuration file
    #[arg(short = 'f', long)]
    config: PathBuf,

    /// Per-step warning thresholds: one range spec, or a comma separated list
    /// assigned to the steps in execution order
    #[arg(short, long)]
    warning: Option<String>,

    /// Per-step critical thresholds, same syntax as --warning
    #[arg(short, long)]
    critical: Option<String>,

    /// Warning threshold for the total runtime
    #[arg(long, value_name = "RANGE")]
    total_warning: Option<String>,

    /// Critical threshold for the total runtime
    #[arg(long, value_name = "RANGE")]
    total_critical: Option<String>,

    /// Abort the whole check after this many seconds
    #[arg(short, long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Log step-by-step details to stderr
    #[arg(short, long)]
    debug: bool,

    /// Interpolate ${NAME} references from the process environment
    #[arg(short = 'e', long)]
    interpolate_env: bool,

    /// Inject a variable for interpolation (implies --interpolate-env)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Keep undefined ${NAME} references instead of failing
    #[arg(long)]
    ignore_missing_vars: bool,

    /// Route requests through the proxy configured in the environment
    #[arg(long)]
    proxy_from_env: bool,

    /// Write every response body into this directory
    #[arg(long, value_name = "DIR")]
    dump_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    runner::safe_run(config::DEFAULT_SHORTNAME, || {
        icinga::print_command_config_if_env_and_exit("check_end2end", &Cli::command())
            .map_err(CheckFailure::from)?;
        run(&cli)
    })
}

fn run(cli: &Cli) -> Result<CheckReport, CheckFailure> {
    let mut interp = Interpolator::new(cli.interpolate_env, cli.ignore_missing_vars);
    for pair in &cli.vars {
        interp.add_var(pair)?;
    }

    let FileConfig {
        shortname,
        useragent,
        proxy,
        auth_user,
        auth_password,
        steps,
    } = config::load(&cli.config, &interp)?;

    let base_auth = auth_user.map(|user| Credentials {
        user,
        password: auth_password.unwrap_or_default(),
    });
    let registry = StepRegistry::new(steps, base_auth);
    if registry.is_empty() {
        return Err(CheckFailure::NoSteps);
    }

    let names = registry.names();
    let warning = ThresholdTable::build(cli.warning.as_deref(), &names);
    let critical = ThresholdTable::build(cli.critical.as_deref(), &names);

    let transport = BlockingTransport::new(&TransportOptions {
        user_agent: useragent,
        proxy,
        proxy_from_env: cli.proxy_from_env,
    })?;

    let dump: Box<dyn PageDump> = match &cli.dump_dir {
        Some(dir) => Box::new(DirDump::new(dir)),
        None => Box::new(NoopDump),
    };

    if let Some(seconds) = cli.timeout {
        runner::arm_watchdog(seconds, &shortname);
    }

    let mut report = CheckReport::new(&shortname);
    let probe = Probe::new(
        &registry,
        &warning,
        &critical,
        cli.total_warning.as_deref(),
        cli.total_critical.as_deref(),
        dump.as_ref(),
    );
    probe.run(&transport, &mut report)?;
    Ok(report)
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
