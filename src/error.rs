use thiserror::Error;

/// Result type for integration driver operations
pub type Result<T> = std::result::Result<T, IntegrationError>;

/// Boxed error returned by driver callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while running an integration driver
#[derive(Error, Debug)]
pub enum IntegrationError {
    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The client connection is no longer established
    #[error("Connection closed")]
    ConnectionClosed,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary voice frame could not be decoded
    #[error("Protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// Invalid driver configuration or metadata
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed protocol message
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Required field missing from a message payload
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A driver callback panicked
    #[error("Handler panicked: {0}")]
    HandlerPanic(String),

    /// A driver callback returned an error
    #[error("Handler error: {0}")]
    Handler(BoxError),
}

impl IntegrationError {
    /// Build a [`IntegrationError::HandlerPanic`] from a caught panic payload
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::HandlerPanic(msg)
    }
}
