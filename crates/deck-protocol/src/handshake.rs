//! Connection handshake

use crate::error::{ProtocolError, ProtocolResult};
use crate::RECORD_SEPARATOR;
use serde::{Deserialize, Serialize};

/// Sent by the client immediately after the socket opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub protocol: String,
    pub version: u32,
}

impl HandshakeRequest {
    /// The JSON protocol, version 1
    pub fn json() -> Self {
        Self {
            protocol: "json".into(),
            version: 1,
        }
    }

    pub fn to_text(&self) -> ProtocolResult<String> {
        let mut text = serde_json::to_string(self)?;
        text.push(RECORD_SEPARATOR as char);
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct HandshakeResponse {
    #[serde(default)]
    error: Option<String>,
}

/// Check the server's handshake answer (a frame without its separator)
pub fn check_response(frame: &str) -> ProtocolResult<()> {
    let response: HandshakeResponse = serde_json::from_str(frame)?;
    match response.error {
        Some(error) => Err(ProtocolError::HandshakeRejected(error)),
        None => Ok(()),
    }
}
