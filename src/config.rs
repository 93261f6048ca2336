//! Configuration file loading.
//!
//! The check is driven by a TOML file: a few global settings plus one
//! `[steps."<name>"]` table per navigation step. Before parsing, `${NAME}`
//! references in the raw text are interpolated from `--var` pairs and,
//! when enabled, the process environment.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::step::RawStep;

pub const DEFAULT_SHORTNAME: &str = "END2END";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("undefined variable '{0}' in config file")]
    UndefinedVariable(String),
    #[error("malformed variable definition '{0}', expected NAME=VALUE")]
    MalformedVar(String),
}

/// The parsed configuration file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default = "default_shortname")]
    pub shortname: String,
    pub useragent: Option<String>,
    pub proxy: Option<String>,
    pub auth_user: Option<String>,
    pub auth_password: Option<String>,
    /// Raw step blocks keyed by step name. A BTreeMap keeps the keys in
    /// ascending lexical order, which is the execution order.
    #[serde(default)]
    pub steps: BTreeMap<String, RawStep>,
}

fn default_shortname() -> String {
    DEFAULT_SHORTNAME.to_string()
}

/// Resolves `${NAME}` references in the raw config text.
#[derive(Debug, Default)]
pub struct Interpolator {
    vars: BTreeMap<String, String>,
    use_env: bool,
    ignore_missing: bool,
}

static VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

impl Interpolator {
    pub fn new(use_env: bool, ignore_missing: bool) -> Self {
        Self {
            vars: BTreeMap::new(),
            use_env,
            ignore_missing,
        }
    }

    /// Adds a `NAME=VALUE` pair from the command line. Injecting a variable
    /// implicitly enables environment interpolation.
    pub fn add_var(&mut self, pair: &str) -> Result<(), ConfigError> {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedVar(pair.to_string()))?;
        if name.is_empty() {
            return Err(ConfigError::MalformedVar(pair.to_string()));
        }
        self.vars.insert(name.to_string(), value.to_string());
        self.use_env = true;
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<String> {
        if let Some(v) = self.vars.get(name) {
            return Some(v.clone());
        }
        if self.use_env {
            return std::env::var(name).ok();
        }
        None
    }

    /// Expands every `${NAME}` reference. An undefined variable fails loudly
    /// unless `ignore_missing` was set, in which case the reference is kept
    /// verbatim.
    pub fn expand(&self, text: &str) -> Result<String, ConfigError> {
        let mut missing = None;
        let expanded = VAR_PATTERN.replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            match self.lookup(name) {
                Some(value) => value,
                None => {
                    if !self.ignore_missing && missing.is_none() {
                        missing = Some(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        match missing {
            Some(name) => Err(ConfigError::UndefinedVariable(name)),
            None => Ok(expanded.into_owned()),
        }
    }
}

/// Reads and parses the config file at `path`, interpolating variables first.
pub fn load(path: &Path, interp: &Interpolator) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let text = interp.expand(&text)?;
    Ok(toml::from_str(&text)?)
}
