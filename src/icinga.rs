//! Icinga2 CheckCommand generation.
//!
//! Setting the GENERATE_ICINGA_COMMAND environment variable makes the binary
//! print a ready-to-import `CheckCommand` object derived from its own CLI
//! definition and exit, instead of running a check.

use clap::ArgAction;

#[derive(Debug, thiserror::Error)]
pub enum IcingaConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid executable path")]
    InvalidExecutablePath,
    #[error("argument without a long name cannot be exported")]
    MissingLongArgument,
}

/// Renders the CheckCommand object for the given clap definition.
pub fn icinga_command(name: &str, cmd: &clap::Command) -> Result<String, IcingaConfigError> {
    let exe = std::env::current_exe()?
        .to_str()
        .ok_or(IcingaConfigError::InvalidExecutablePath)?
        .to_owned();

    let mut out = format!("object CheckCommand \"{name}\" {{\n");
    out.push_str(&format!("  command = [ \"{exe}\" ]\n"));
    out.push_str("  arguments = {\n");

    let mut defaults = Vec::new();
    for arg in cmd.get_arguments() {
        let long = arg
            .get_long()
            .ok_or(IcingaConfigError::MissingLongArgument)?;
        let var = long.replace('-', "_");

        out.push_str(&format!("    \"--{long}\" = {{\n"));
        if matches!(arg.get_action(), ArgAction::SetTrue | ArgAction::Count) {
            out.push_str(&format!("      set_if = \"${var}$\"\n"));
        } else {
            out.push_str(&format!("      value = \"${var}$\"\n"));
        }
        if let Some(help) = arg.get_help() {
            out.push_str(&format!(
                "      description = \"{}\"\n",
                escape(&help.to_string())
            ));
        }
        out.push_str("    }\n");

        if let Some(default) = arg.get_default_values().first().and_then(|v| v.to_str()) {
            defaults.push((var, default.to_owned()));
        }
    }
    out.push_str("  }\n");

    for (var, default) in defaults {
        out.push_str(&format!("  vars.{var} = \"{}\"\n", escape(&default)));
    }

    out.push_str("}\n");
    Ok(out)
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('$', "\\$")
}

/// Prints the CheckCommand configuration and exits if the
/// GENERATE_ICINGA_COMMAND environment variable is set.
pub fn print_command_config_if_env_and_exit(
    name: &str,
    cmd: &clap::Command,
) -> Result<(), IcingaConfigError> {
    if std::env::var("GENERATE_ICINGA_COMMAND").is_err() {
        return Ok(());
    }

    println!("{}", icinga_command(name, cmd)?.trim());
    std::process::exit(0);
}
