//! Error types for the node binary.
//!
//! [`NodeError`] wraps every failure that stops the process during
//! startup. Backplane outages are not among them: the node falls back to
//! in-process adapters and keeps serving.

use tictac_core::ConfigError;
use tictac_gateway::StartupError;

/// Top-level error for the node binary.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The gateway could not be started.
    #[error("gateway error: {source}")]
    Gateway {
        /// The underlying startup error.
        #[from]
        source: StartupError,
    },

    /// The gateway task ended unexpectedly.
    #[error("gateway task failed: {message}")]
    GatewayTask {
        /// Description of the task failure.
        message: String,
    },
}
