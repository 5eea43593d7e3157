//! Error types for the sync bus.

/// Errors that can occur while publishing or subscribing to sync events.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Failed to connect to or communicate with the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// An event could not be encoded.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The bus cannot be reached.
    #[error("bus unavailable: {0}")]
    Unavailable(String),
}
