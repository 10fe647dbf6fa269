//! Shared HTTP transport for Fathom data providers.
//!
//! [`ApiClient`] wraps a pooled `reqwest::Client`. A single client can be
//! handed to every provider registered with a query manager so requests share
//! connections and can be dispatched concurrently.
//!
//! # Example
//!
//! ```ignore
//! use fathom_api::ApiClient;
//! use anyhow::Result;
//!
//! async fn ping() -> Result<()> {
//!     let client = ApiClient::new()?;
//!     let res = client
//!         .request(reqwest::Method::GET, "https://api.example.com/health")
//!         .send()
//!         .await?;
//!     println!("status: {}", res.status());
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;
use reqwest::{Client, RequestBuilder, header};
use tracing::debug;
use url::Url;

/// Default per-request timeout applied by [`ApiClient::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Hostnames allowed to use plain `http://`.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client`.
///
/// Cloning is cheap and shares the underlying connection pool.
pub struct ApiClient {
    pub http: Client,
    pub user_agent: String,
    pub timeout: Duration,
}

impl ApiClient {
    /// Construct a client with JSON accept headers and the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_TIMEOUT, &IndexMap::new())
    }

    /// Construct a client with a custom timeout and default headers sent on
    /// every request.
    pub fn with_options(timeout: Duration, headers: &IndexMap<String, String>) -> Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        for (name, value) in headers {
            let header_name = header::HeaderName::from_bytes(name.as_bytes()).with_context(|| format!("invalid header name '{name}'"))?;
            let header_value =
                header::HeaderValue::from_str(value).with_context(|| format!("invalid value for header '{name}'"))?;
            default_headers.insert(header_name, header_value);
        }

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .context("build http client")?;

        Ok(Self {
            http,
            user_agent: format!("fathom/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
            timeout,
        })
    }

    /// Build a `reqwest::RequestBuilder` for an absolute URL.
    pub fn request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        debug!(url = %fathom_util::redact_sensitive(url), "building request");

        self.http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
    }
}

/// Validate that a provider base URL is acceptable.
///
/// Rules:
/// - the URL must parse and include a host
/// - `localhost`, `127.0.0.1`, and `[::1]` may use any scheme
/// - every other host must use HTTPS
pub fn validate_base_url(base: &str) -> Result<Url> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid base URL '{}': {}", base, e))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("base URL '{}' must include a host", base))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(parsed_base_url);
    }

    if parsed_base_url.scheme() != "https" {
        return Err(anyhow!(
            "base URL must use https for non-localhost hosts; got '{}://'",
            parsed_base_url.scheme()
        ));
    }

    Ok(parsed_base_url)
}
