//! Shared wire types, configuration and utilities for the job executor
//!
//! This crate contains the scheduler protocol message shapes, the executor
//! configuration structures, and small utilities used by the executor crate.

pub mod api;
pub mod config;
pub mod defaults;
pub mod utils;

// Re-export commonly used types for convenience
pub use api::{ApiResponse, BlockStrategy, CallbackParam, RegistryParam, RunReq};
pub use config::ExecutorConfig;
pub use utils::local_ipv4;

/// Result type alias used throughout the executor workspace
pub type Result<T> = anyhow::Result<T>;

/// Common error types for the executor
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests;
