//! Error types shared across swarmscale crates.

use thiserror::Error;

/// Result type alias for configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for orchestrator calls.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Startup configuration errors. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors returned by an orchestrator backend.
///
/// None of these are fatal to the control loop: the cycle is skipped and
/// retried at the next interval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// Transport failure, timeout, or a server-side 5xx.
    #[error("orchestrator unavailable: {0}")]
    Unavailable(String),

    /// The configured worker service does not exist.
    #[error("service not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("orchestrator API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The service exists but cannot be scaled by replica count.
    #[error("unsupported service: {0}")]
    Unsupported(String),

    #[error("malformed orchestrator response: {0}")]
    Decode(String),
}

impl OrchestratorError {
    /// Whether the error is expected to clear on its own.
    ///
    /// Non-transient errors point at a configuration problem an operator
    /// has to fix (wrong service name, missing permissions).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Api { .. } | Self::Decode(_))
    }
}
