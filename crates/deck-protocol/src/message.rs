//! Hub message types

use crate::error::{ProtocolError, ProtocolResult};
use crate::RECORD_SEPARATOR;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const INVOCATION: u8 = 1;
const COMPLETION: u8 = 3;
const PING: u8 = 6;
const CLOSE: u8 = 7;

/// A hub protocol message
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Remote procedure call. Without an invocation ID no completion is expected.
    Invocation {
        invocation_id: Option<String>,
        target: String,
        arguments: Vec<Value>,
    },

    /// Acknowledgement of an invocation
    Completion {
        invocation_id: String,
        result: Option<Value>,
        error: Option<String>,
    },

    /// Keep-alive
    Ping,

    /// Server is closing the connection
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },

    /// A message kind this client does not handle (streaming, acks, ...)
    Unsupported(u8),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invocation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arguments: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_reconnect: Option<bool>,
}

impl HubMessage {
    pub fn invocation(invocation_id: Option<String>, target: impl Into<String>, arguments: Vec<Value>) -> Self {
        HubMessage::Invocation {
            invocation_id,
            target: target.into(),
            arguments,
        }
    }

    pub fn completion(invocation_id: impl Into<String>, result: Option<Value>) -> Self {
        HubMessage::Completion {
            invocation_id: invocation_id.into(),
            result,
            error: None,
        }
    }

    pub fn completion_error(invocation_id: impl Into<String>, error: impl Into<String>) -> Self {
        HubMessage::Completion {
            invocation_id: invocation_id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn ping() -> Self {
        HubMessage::Ping
    }

    pub fn close(error: Option<String>, allow_reconnect: bool) -> Self {
        HubMessage::Close { error, allow_reconnect }
    }

    /// Decode a single frame (without its record separator)
    pub fn decode(frame: &str) -> ProtocolResult<Self> {
        let raw: RawMessage = serde_json::from_str(frame)?;

        match raw.kind {
            INVOCATION => Ok(HubMessage::Invocation {
                invocation_id: raw.invocation_id,
                target: raw.target.ok_or(ProtocolError::MissingField("target"))?,
                arguments: raw.arguments.unwrap_or_default(),
            }),
            COMPLETION => Ok(HubMessage::Completion {
                invocation_id: raw
                    .invocation_id
                    .ok_or(ProtocolError::MissingField("invocationId"))?,
                result: raw.result,
                error: raw.error,
            }),
            PING => Ok(HubMessage::Ping),
            CLOSE => Ok(HubMessage::Close {
                error: raw.error,
                allow_reconnect: raw.allow_reconnect.unwrap_or(false),
            }),
            other => Ok(HubMessage::Unsupported(other)),
        }
    }

    /// Encode the message, including the trailing record separator
    pub fn encode(&self) -> ProtocolResult<BytesMut> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Encode the message into an existing buffer
    pub fn encode_into(&self, buf: &mut BytesMut) -> ProtocolResult<()> {
        let raw = match self {
            HubMessage::Invocation { invocation_id, target, arguments } => RawMessage {
                kind: INVOCATION,
                invocation_id: invocation_id.clone(),
                target: Some(target.clone()),
                arguments: Some(arguments.clone()),
                ..Default::default()
            },
            HubMessage::Completion { invocation_id, result, error } => RawMessage {
                kind: COMPLETION,
                invocation_id: Some(invocation_id.clone()),
                result: result.clone(),
                error: error.clone(),
                ..Default::default()
            },
            HubMessage::Ping => RawMessage {
                kind: PING,
                ..Default::default()
            },
            HubMessage::Close { error, allow_reconnect } => RawMessage {
                kind: CLOSE,
                error: error.clone(),
                allow_reconnect: Some(*allow_reconnect),
                ..Default::default()
            },
            HubMessage::Unsupported(kind) => RawMessage {
                kind: *kind,
                ..Default::default()
            },
        };

        buf.put_slice(&serde_json::to_vec(&raw)?);
        buf.put_u8(RECORD_SEPARATOR);
        Ok(())
    }

    /// Encode as a text frame payload
    pub fn to_text(&self) -> ProtocolResult<String> {
        let buf = self.encode()?;
        String::from_utf8(buf.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
    }
}
