/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use miette::Diagnostic;
use thiserror::Error;

// Re-export MemoryError from memory module
pub use crate::memory::MemoryError;

// Re-export GuardError from guard module
pub use crate::core::guard::GuardError;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("{component} configuration already installed")]
    #[diagnostic(
        code(config::already_installed),
        help("Process-wide configuration is set once, before the first lock or allocation.")
    )]
    AlreadyInstalled { component: &'static str },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(config::invalid_value))]
    Invalid { field: &'static str, reason: String },

    #[error("Invalid environment variable {var}={value:?}")]
    #[diagnostic(
        code(config::invalid_environment),
        help("KERNEL_LOCKING accepts multi or single; numeric variables take unsigned integers.")
    )]
    Environment { var: &'static str, value: String },

    #[error("Failed to parse configuration: {0}")]
    #[diagnostic(code(config::parse_error))]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Unified kernel error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum KernelError {
    #[error("Memory error: {0}")]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Guard error: {0}")]
    #[diagnostic(transparent)]
    Guard(#[from] GuardError),
}
