//! Protocol error types

use thiserror::Error;

/// Protocol-specific errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Wrong number of arguments for {target}: expected {expected}, got {got}")]
    Arity {
        target: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid argument for {target}: {message}")]
    InvalidArgument { target: String, message: String },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Handshake rejected: {0}")]
    HandshakeRejected(String),

    #[error("Message too large: {size} > {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid UTF-8 in frame")]
    InvalidUtf8,
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
