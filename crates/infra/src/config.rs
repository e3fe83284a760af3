//! Request defaults supplied by the host
//!
//! A [`StaticConfigSource`] holds the base address, headers, and timeout
//! merged into every request that does not carry its own. Values come from
//! the builder or, for twelve-factor style deployment, from `COURIER_*`
//! environment variables.

use std::collections::HashMap;
use std::time::Duration;

use courier_core::ConfigSource;
use tracing::warn;

const ENV_BASE_URL: &str = "COURIER_BASE_URL";
const ENV_TIMEOUT_MS: &str = "COURIER_TIMEOUT_MS";
const ENV_HEADER_PREFIX: &str = "COURIER_HEADER_";

/// Fixed [`ConfigSource`] assembled up front by the host.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    base_url: Option<String>,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl StaticConfigSource {
    /// Start building a source.
    pub fn builder() -> StaticConfigSourceBuilder {
        StaticConfigSourceBuilder::default()
    }

    /// Read defaults from the process environment.
    ///
    /// Recognizes `COURIER_BASE_URL`, `COURIER_TIMEOUT_MS`, and
    /// `COURIER_HEADER_<NAME>` (underscores become hyphens, lower-cased:
    /// `COURIER_HEADER_X_API_KEY` feeds the `x-api-key` header). Values
    /// that fail to parse are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    fn from_vars(vars: impl Iterator<Item = (String, String)>) -> Self {
        let mut source = Self::default();

        for (name, value) in vars {
            if name == ENV_BASE_URL {
                source.base_url = Some(value);
            } else if name == ENV_TIMEOUT_MS {
                match value.parse::<u64>() {
                    Ok(ms) => source.timeout = Some(Duration::from_millis(ms)),
                    Err(_) => {
                        warn!(variable = ENV_TIMEOUT_MS, value = %value, "ignoring unparsable timeout")
                    }
                }
            } else if let Some(suffix) = name.strip_prefix(ENV_HEADER_PREFIX) {
                if suffix.is_empty() {
                    continue;
                }
                let header = suffix.to_ascii_lowercase().replace('_', "-");
                source.headers.insert(header, value);
            }
        }

        source
    }
}

impl ConfigSource for StaticConfigSource {
    fn base_url(&self) -> Option<String> {
        self.base_url.clone()
    }

    fn default_headers(&self) -> HashMap<String, String> {
        self.headers.clone()
    }

    fn default_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Builder for [`StaticConfigSource`].
#[derive(Debug, Default)]
pub struct StaticConfigSourceBuilder {
    base_url: Option<String>,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl StaticConfigSourceBuilder {
    /// Base address joined with relative request paths.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Add one default header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Merge a map of default headers.
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Default per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> StaticConfigSource {
        StaticConfigSource {
            base_url: self.base_url,
            headers: self.headers,
            timeout: self.timeout,
        }
    }
}
