//! Transport error types

use deck_protocol::ProtocolError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Not connected to the realtime hub")]
    NotConnected,

    #[error("Failed to start connection: {0}")]
    Start(String),

    #[error("Negotiation failed: {0}")]
    Negotiate(String),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Invalid hub URL: {0}")]
    InvalidUrl(String),

    #[error("Connection lost before the server acknowledged")]
    ConnectionLost,

    #[error("Server rejected invocation: {0}")]
    Invocation(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<ProtocolError> for TransportError {
    fn from(e: ProtocolError) -> Self {
        TransportError::Protocol(e.to_string())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
