//! HTTP transport.
//!
//! The executor talks to the network through the [`HttpTransport`] trait so
//! tests can substitute a scripted transport. The production implementation
//! wraps a blocking reqwest client with a shared cookie store, so a login step
//! carries its session into the steps after it.
//!
//! Credentials are an explicit per-request parameter. The client itself holds
//! no authentication state, so nothing can leak from one step into the next.

use reqwest::blocking::Client;
use reqwest::{Method, Proxy};
use tracing::debug;

use crate::step::Credentials;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid proxy '{proxy}': {source}")]
    BadProxy {
        proxy: String,
        source: reqwest::Error,
    },
    #[error("invalid HTTP method '{0}'")]
    BadMethod(String),
    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

/// One request as the executor issues it.
#[derive(Debug)]
pub struct StepRequest<'a> {
    /// Lowercased HTTP verb.
    pub method: &'a str,
    pub url: &'a str,
    /// Form fields, sent URL-encoded as the body for non-GET methods.
    pub payload: Option<&'a [(String, String)]>,
    pub credentials: Option<&'a Credentials>,
}

/// What came back from one request. `success` covers 2xx and 3xx status
/// codes; anything else is a transport failure.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub success: bool,
    pub status_line: String,
    pub body: String,
}

/// Performs one HTTP request. Timing is measured by the caller.
pub trait HttpTransport {
    fn fetch(&self, request: &StepRequest<'_>) -> Result<FetchOutcome, TransportError>;
}

/// Options for the production transport, taken from configuration and CLI.
#[derive(Debug, Default)]
pub struct TransportOptions {
    pub user_agent: Option<String>,
    /// Explicit proxy URL from the configuration file.
    pub proxy: Option<String>,
    /// Route through the proxy configured in the process environment.
    pub proxy_from_env: bool,
}

pub struct BlockingTransport {
    client: Client,
}

impl BlockingTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, TransportError> {
        let user_agent = options
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("check_end2end/{}", env!("CARGO_PKG_VERSION")));

        let mut builder = Client::builder().user_agent(user_agent).cookie_store(true);

        if let Some(proxy_url) = &options.proxy {
            let proxy = Proxy::all(proxy_url).map_err(|source| TransportError::BadProxy {
                proxy: proxy_url.clone(),
                source,
            })?;
            builder = builder.proxy(proxy);
        } else if !options.proxy_from_env {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(TransportError::Client)?;
        Ok(Self { client })
    }
}

impl HttpTransport for BlockingTransport {
    fn fetch(&self, request: &StepRequest<'_>) -> Result<FetchOutcome, TransportError> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| TransportError::BadMethod(request.method.to_string()))?;

        let mut builder = self.client.request(method.clone(), request.url);

        if let Some(credentials) = request.credentials {
            builder = builder.basic_auth(&credentials.user, Some(&credentials.password));
        }

        if method != Method::GET {
            if let Some(payload) = request.payload {
                builder = builder.form(payload);
            }
        }

        debug!(method = %method, url = request.url, "sending request");
        let response = builder.send()?;
        let status = response.status();
        let success = status.is_success() || status.is_redirection();
        let status_line = status.to_string();
        let body = response.text()?;
        debug!(status = %status_line, bytes = body.len(), "got response");

        Ok(FetchOutcome {
            success,
            status_line,
            body,
        })
    }
}
