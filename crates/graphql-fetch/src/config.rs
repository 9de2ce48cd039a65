//! Executor configuration.
//!
//! Configuration is a plain struct with defaults. It can also be read from
//! TOML:
//!
//! ```toml
//! endpoint = "https://api.example.com/graphql"
//! timeout_ms = 5000
//! missing_data = "error"
//!
//! [headers]
//! X-Client-Name = "inventory"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{FetchError, Result};
use crate::response::MissingDataPolicy;

/// Endpoint used when neither the config nor the call names one.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/graphql";

/// Time a call may take before it is aborted.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Largest accepted diagnostics channel capacity. The channel allocates
/// every slot up front.
pub const MAX_DIAGNOSTICS_CAPACITY: usize = 1 << 16;

/// Configuration for an [`Executor`](crate::Executor).
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutorConfig {
    /// Default endpoint URL.
    pub endpoint: String,
    /// Default per-call timeout.
    pub timeout: Duration,
    /// Headers sent with every call, applied after the built-in defaults.
    pub headers: BTreeMap<String, String>,
    /// How responses without errors or data resolve.
    pub missing_data: MissingDataPolicy,
    /// Capacity of the diagnostics broadcast channel, at most
    /// [`MAX_DIAGNOSTICS_CAPACITY`].
    pub diagnostics_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            headers: BTreeMap::new(),
            missing_data: MissingDataPolicy::default(),
            diagnostics_capacity: 64,
        }
    }
}

/// On-disk shape of [`ExecutorConfig`]. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    endpoint: Option<String>,
    timeout_ms: Option<u64>,
    headers: BTreeMap<String, String>,
    missing_data: Option<MissingDataPolicy>,
    diagnostics_capacity: Option<usize>,
}

impl ExecutorConfig {
    /// Parse configuration from a TOML document.
    ///
    /// Keys that are absent keep their default values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(source)?;
        let defaults = Self::default();

        let config = Self {
            endpoint: file.endpoint.unwrap_or(defaults.endpoint),
            timeout: file
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            headers: file.headers,
            missing_data: file.missing_data.unwrap_or(defaults.missing_data),
            diagnostics_capacity: file
                .diagnostics_capacity
                .unwrap_or(defaults.diagnostics_capacity),
        };
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| FetchError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Check the values are usable.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.endpoint)?;
        if self.timeout.is_zero() {
            return Err(FetchError::Config("timeout must be greater than zero".into()));
        }
        if self.diagnostics_capacity == 0 {
            return Err(FetchError::Config(
                "diagnostics_capacity must be greater than zero".into(),
            ));
        }
        if self.diagnostics_capacity > MAX_DIAGNOSTICS_CAPACITY {
            return Err(FetchError::Config(format!(
                "diagnostics_capacity must be at most {}",
                MAX_DIAGNOSTICS_CAPACITY
            )));
        }
        for (name, value) in &self.headers {
            http::HeaderName::from_bytes(name.as_bytes())?;
            http::HeaderValue::from_str(value)?;
        }
        Ok(())
    }
}
