//! Configuration file management for certexpchk.
//!
//! Settings come from three places, merged with clear precedence:
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (`certexpchk.toml` or the one given with `--config`)
//! 3. Command-line arguments (highest priority)
//!
//! # Example Configuration File
//!
//! ```toml
//! hosts = ["example.com", "example.com:8443"]
//! verbose = false
//! timeout = 10
//! output = "text"
//!
//! [prometheus]
//! enabled = true
//! address = "http://localhost:9091"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// Name of the configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "certexpchk.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROMETHEUS_ADDRESS: &str = "http://localhost:9091";

/// How results are rendered once every host has been probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// One stderr line per problem (and per valid certificate when verbose)
    Text,
    /// Text lines plus a per-host table on stderr
    Summary,
    /// Text lines plus a JSON document on stdout
    Json,
}

/// Main configuration structure.
///
/// All fields are optional to support partial configuration and merging.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    /// List of hosts to check
    pub hosts: Option<Vec<String>>,
    /// Print progress and valid certificates
    pub verbose: Option<bool>,
    /// Connect and handshake timeout in seconds
    pub timeout: Option<u64>,
    /// Maximum number of simultaneous probes; unbounded when absent
    pub max_concurrency: Option<usize>,
    /// Output format: text, summary, json
    pub output: Option<String>,
    /// Prometheus configuration
    pub prometheus: Option<PrometheusConfig>,
}

/// Prometheus Push Gateway settings.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PrometheusConfig {
    /// Enable prometheus metrics pushing
    pub enabled: Option<bool>,
    /// Prometheus push gateway address (e.g., "http://localhost:9091")
    pub address: Option<String>,
}

/// Fully resolved settings, ready to drive a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub hosts: Vec<String>,
    pub verbose: bool,
    pub timeout: Duration,
    pub max_concurrency: Option<usize>,
    pub output: OutputFormat,
    /// Push gateway address when pushing is enabled
    pub prometheus_address: Option<String>,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully parsed configuration
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// Configuration with every default filled in.
    ///
    /// - `hosts`: None (must be provided)
    /// - `verbose`: false
    /// - `timeout`: 10 seconds
    /// - `max_concurrency`: None (one worker per host)
    /// - `output`: "text"
    /// - `prometheus.enabled`: false
    /// - `prometheus.address`: "http://localhost:9091"
    pub fn defaults() -> Self {
        Config {
            hosts: None,
            verbose: Some(false),
            timeout: Some(DEFAULT_TIMEOUT_SECS),
            max_concurrency: None,
            output: Some(OutputFormat::Text.to_string()),
            prometheus: Some(PrometheusConfig {
                enabled: Some(false),
                address: Some(DEFAULT_PROMETHEUS_ADDRESS.to_string()),
            }),
        }
    }

    /// Merges this configuration with another, prioritizing the other's values.
    ///
    /// For each field, a `Some` in `other` overrides the current value; a
    /// `None` keeps it.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.hosts.is_some() {
            self.hosts = other.hosts;
        }
        if other.verbose.is_some() {
            self.verbose = other.verbose;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
        if other.max_concurrency.is_some() {
            self.max_concurrency = other.max_concurrency;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
        if let Some(other_prom) = other.prometheus {
            if let Some(ref mut self_prom) = self.prometheus {
                if other_prom.enabled.is_some() {
                    self_prom.enabled = other_prom.enabled;
                }
                if other_prom.address.is_some() {
                    self_prom.address = other_prom.address;
                }
            } else {
                self.prometheus = Some(other_prom);
            }
        }
        self
    }

    /// Creates a Config from command-line arguments for merging.
    ///
    /// Only provided arguments (Some values) override other sources.
    pub fn from_cli_args(
        hosts: Option<Vec<String>>,
        verbose: Option<bool>,
        timeout: Option<u64>,
        max_concurrency: Option<usize>,
        output: Option<String>,
        prometheus: Option<bool>,
        prometheus_address: Option<String>,
    ) -> Self {
        Config {
            hosts,
            verbose,
            timeout,
            max_concurrency,
            output,
            prometheus: Some(PrometheusConfig {
                enabled: prometheus,
                address: prometheus_address,
            }),
        }
    }

    /// Validates the merged configuration and fills remaining gaps with
    /// defaults.
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let hosts = self.hosts.unwrap_or_default();
        if hosts.is_empty() {
            return Err(ConfigError::Validation(
                "at least one HOSTNAME[:PORT] is required".to_string(),
            ));
        }
        if let Some(empty) = hosts.iter().find(|h| h.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "host entries must not be blank: {:?}",
                empty
            )));
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout == 0 {
            return Err(ConfigError::Validation(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == Some(0) {
            return Err(ConfigError::Validation(
                "max_concurrency must be greater than zero".to_string(),
            ));
        }

        let output = match self.output {
            Some(ref output) => OutputFormat::from_str(output).map_err(|_| {
                ConfigError::Validation(format!(
                    "unknown output format '{}' (expected text, summary or json)",
                    output
                ))
            })?,
            None => OutputFormat::Text,
        };

        let prometheus_address = match self.prometheus {
            Some(PrometheusConfig {
                enabled: Some(true),
                address,
            }) => Some(address.unwrap_or_else(|| DEFAULT_PROMETHEUS_ADDRESS.to_string())),
            _ => None,
        };

        Ok(Settings {
            hosts,
            verbose: self.verbose.unwrap_or(false),
            timeout: Duration::from_secs(timeout),
            max_concurrency: self.max_concurrency,
            output,
            prometheus_address,
        })
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            hosts: Some(vec![
                "example.com".to_string(),
                "example.com:8443".to_string(),
                "https://secure.example.com:9443".to_string(),
                "expired.badssl.com".to_string(),
            ]),
            verbose: Some(false),
            timeout: Some(DEFAULT_TIMEOUT_SECS),
            max_concurrency: Some(16),
            output: Some(OutputFormat::Summary.to_string()),
            prometheus: Some(PrometheusConfig {
                enabled: Some(true),
                address: Some(DEFAULT_PROMETHEUS_ADDRESS.to_string()),
            }),
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, etc.)
    Parse(String),
    /// Validation error (missing required fields, invalid values, etc.)
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO Error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse Error: {}", msg),
            ConfigError::Validation(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
