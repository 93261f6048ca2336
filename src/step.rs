//! Step definitions and the step registry.
//!
//! A step is one configured HTTP request plus its evaluation policy. Raw step
//! blocks come straight out of the configuration file; a [`StepDefinition`] is
//! the validated, immutable form the executor works with.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::Deserialize;

use crate::state::{InvalidSeverityToken, ServiceState};

/// Basic-auth credentials for a single request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    // keep the password out of debug logs
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One unvalidated step block from the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawStep {
    pub url: Option<String>,
    pub method: Option<String>,
    pub binary_data: Option<String>,
    pub on_failure: Option<String>,
    pub grep_regex: Option<String>,
    pub grep_literal: Option<String>,
    pub on_pattern_failure: Option<String>,
    pub auth_user: Option<String>,
    pub auth_password: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("step '{0}' has no url")]
    MissingUrl(String),
    #[error("step '{step}': cannot decode binaryData: {source}")]
    MalformedPayload {
        step: String,
        source: std::string::FromUtf8Error,
    },
    #[error("step '{step}': {source}")]
    InvalidSeverity {
        step: String,
        source: InvalidSeverityToken,
    },
    #[error("step '{step}': invalid pattern: {source}")]
    BadPattern {
        step: String,
        source: regex::Error,
    },
    #[error("no step named '{0}'")]
    NoSuchStep(String),
}

/// A resolved, validated step. Immutable once constructed; construction fails
/// atomically if any field is invalid.
#[derive(Debug)]
pub struct StepDefinition {
    pub name: String,
    pub url: String,
    /// Lowercased HTTP verb, `get` by default.
    pub method: String,
    /// Decoded form fields from `binaryData`, sent as the request body for
    /// non-GET methods.
    pub payload: Option<Vec<(String, String)>>,
    /// Severity applied when the HTTP call itself fails.
    pub on_failure: ServiceState,
    pub pattern: Option<Regex>,
    /// Severity applied when the response body does not match `pattern`.
    pub on_pattern_failure: ServiceState,
    pub basic_auth: Option<Credentials>,
}

impl StepDefinition {
    fn resolve(
        name: &str,
        raw: &RawStep,
        base_auth: Option<&Credentials>,
    ) -> Result<Self, StepError> {
        let url = raw
            .url
            .clone()
            .ok_or_else(|| StepError::MissingUrl(name.to_string()))?;

        let method = raw
            .method
            .as_deref()
            .unwrap_or("get")
            .to_ascii_lowercase();

        let payload = raw
            .binary_data
            .as_deref()
            .map(|data| decode_payload(name, data))
            .transpose()?;

        let on_failure = parse_severity(name, raw.on_failure.as_deref())?
            .unwrap_or(ServiceState::Critical);

        // grepRegex wins when both are set
        let pattern = match (&raw.grep_regex, &raw.grep_literal) {
            (Some(expr), _) => Some(compile_pattern(name, expr)?),
            (None, Some(literal)) => Some(compile_pattern(name, &regex::escape(literal))?),
            (None, None) => None,
        };

        let on_pattern_failure = parse_severity(name, raw.on_pattern_failure.as_deref())?
            .unwrap_or(ServiceState::Critical);

        // per-step credentials win over the shared base configuration
        let basic_auth = match &raw.auth_user {
            Some(user) => Some(Credentials {
                user: user.clone(),
                password: raw.auth_password.clone().unwrap_or_default(),
            }),
            None => base_auth.cloned(),
        };

        Ok(StepDefinition {
            name: name.to_string(),
            url,
            method,
            payload,
            on_failure,
            pattern,
            on_pattern_failure,
            basic_auth,
        })
    }
}

fn parse_severity(step: &str, token: Option<&str>) -> Result<Option<ServiceState>, StepError> {
    token
        .map(|t| {
            ServiceState::from_str(t).map_err(|source| StepError::InvalidSeverity {
                step: step.to_string(),
                source,
            })
        })
        .transpose()
}

fn compile_pattern(step: &str, expr: &str) -> Result<Regex, StepError> {
    Regex::new(expr).map_err(|source| StepError::BadPattern {
        step: step.to_string(),
        source,
    })
}

fn decode_payload(step: &str, data: &str) -> Result<Vec<(String, String)>, StepError> {
    let mut fields = Vec::new();
    for pair in data.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        fields.push((decode_field(step, key)?, decode_field(step, value)?));
    }
    Ok(fields)
}

fn decode_field(step: &str, field: &str) -> Result<String, StepError> {
    // form encoding uses '+' for spaces
    let field = field.replace('+', " ");
    urlencoding::decode(&field)
        .map(|cow| cow.into_owned())
        .map_err(|source| StepError::MalformedPayload {
            step: step.to_string(),
            source,
        })
}

/// The ordered collection of step blocks for one run, plus the shared base
/// configuration steps inherit from.
#[derive(Debug, Default)]
pub struct StepRegistry {
    steps: BTreeMap<String, RawStep>,
    base_auth: Option<Credentials>,
}

impl StepRegistry {
    pub fn new(steps: BTreeMap<String, RawStep>, base_auth: Option<Credentials>) -> Self {
        Self { steps, base_auth }
    }

    /// Step names in ascending lexical order. This order is the execution
    /// order and is independent of the configuration file's insertion order.
    pub fn names(&self) -> Vec<String> {
        self.steps.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Constructs the definition for exactly one step, re-merging the shared
    /// base configuration. Failure here is fatal to the whole run.
    pub fn step(&self, name: &str) -> Result<StepDefinition, StepError> {
        let raw = self
            .steps
            .get(name)
            .ok_or_else(|| StepError::NoSuchStep(name.to_string()))?;
        StepDefinition::resolve(name, raw, self.base_auth.as_ref())
    }
}
