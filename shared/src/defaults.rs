//! Default values for configuration parameters
//!
//! Centralizes the default value functions used by serde when a
//! configuration file omits optional fields.

/// Default executor port
pub fn default_executor_port() -> String {
    "9999".to_string()
}

/// Default logical executor name shown to the scheduler
pub fn default_registry_key() -> String {
    "rust-jobs".to_string()
}

/// Default HTTP client timeout for scheduler calls (10 seconds)
pub fn default_client_timeout() -> u64 {
    10
}
