//! Executor configuration
//!
//! The executor is configured from a TOML file (`executor.toml`), with the
//! binary offering command-line overrides for the most commonly changed
//! values. Everything except the scheduler address has a sensible default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::defaults::{default_client_timeout, default_executor_port, default_registry_key};
use crate::ExecutorError;

/// Deploy-time configuration of one executor process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Base URL of the central scheduler, e.g. `http://scheduler:8080/xxl-job-admin`
    pub server_addr: String,
    /// Shared secret attached to every call in both directions.
    /// Blank disables the inbound header check.
    #[serde(default)]
    pub access_token: String,
    /// Address this executor binds and advertises.
    /// Blank means the primary IPv4 address is auto-detected.
    #[serde(default)]
    pub executor_ip: String,
    /// Port this executor binds and advertises (default: "9999")
    #[serde(default = "default_executor_port")]
    pub executor_port: String,
    /// Logical executor name shown to the scheduler (default: "rust-jobs")
    #[serde(default = "default_registry_key")]
    pub registry_key: String,
    /// HTTP client timeout for scheduler calls in seconds (default: 10)
    #[serde(default = "default_client_timeout")]
    pub timeout_seconds: u64,
    /// Directory for file-based logging; unset logs to stdout
    #[serde(default)]
    pub log_dir: Option<String>,
    /// When true, every dispatch gets its own running slot (`jobId-logId`)
    /// and block strategies collapse to "always accept"
    #[serde(default)]
    pub concurrent_execute: bool,
    /// Optional cap in seconds on the shutdown drain; unset drains until
    /// the running-task table is empty
    #[serde(default)]
    pub drain_timeout_seconds: Option<u64>,
}

impl ExecutorConfig {
    /// Parse a configuration from TOML text and validate it.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: ExecutorConfig = toml::from_str(content)
            .map_err(|e| ExecutorError::Config(format!("Failed to parse executor config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ExecutorError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Validate the configuration.
    ///
    /// Checks that the scheduler address is a well-formed http(s) URL, that
    /// the port parses, and that the registry key is usable.
    pub fn validate(&self) -> crate::Result<()> {
        if self.server_addr.is_empty() {
            return Err(ExecutorError::Validation(
                "server_addr cannot be empty".to_string(),
            )
            .into());
        }

        let url = Url::parse(&self.server_addr).map_err(|e| {
            ExecutorError::Validation(format!(
                "server_addr '{}' is not a valid URL: {}",
                self.server_addr, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ExecutorError::Validation(format!(
                "server_addr must use http or https, got '{}'",
                url.scheme()
            ))
            .into());
        }

        let port: u16 = self.executor_port.parse().map_err(|_| {
            ExecutorError::Validation(format!(
                "executor_port '{}' is not a valid port number",
                self.executor_port
            ))
        })?;
        if port == 0 {
            return Err(
                ExecutorError::Validation("executor_port cannot be 0".to_string()).into(),
            );
        }

        if self.registry_key.is_empty() {
            return Err(ExecutorError::Validation(
                "registry_key cannot be empty".to_string(),
            )
            .into());
        }

        if self.timeout_seconds == 0 {
            return Err(ExecutorError::Validation(
                "timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// The IP this executor advertises: the configured one, or the
    /// auto-detected primary IPv4 address when unset.
    pub fn resolved_ip(&self) -> String {
        if self.executor_ip.is_empty() {
            crate::utils::local_ipv4()
        } else {
            self.executor_ip.clone()
        }
    }
}
