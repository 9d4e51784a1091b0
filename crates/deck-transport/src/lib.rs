//! Deck Transport Layer
//!
//! Realtime link between a client and the presentation hub:
//! - Channel: lifecycle wrapper with a synchronous connected check
//! - WebSocket: negotiated hub connection with keep-alive and reconnect
//! - Memory: in-process hub for tests and demos (optional feature)

pub mod channel;
pub mod dispatch;
pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "websocket")]
pub mod negotiate;
pub mod reconnect;
#[cfg(feature = "websocket")]
pub mod websocket;

use async_trait::async_trait;
use deck_core::Event;
use deck_protocol::Command;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

pub use channel::{Invocation, RealtimeChannel};
pub use error::{TransportError, TransportResult};
#[cfg(feature = "memory")]
pub use memory::{MemoryConnector, MemoryHub};
pub use reconnect::ReconnectPolicy;
#[cfg(feature = "websocket")]
pub use websocket::{HubConfig, WebSocketConnector};

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// What a live connection reports to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A server-pushed event, in arrival order
    Event(Event),
    /// The link dropped; the transport is retrying
    Reconnecting { error: Option<String> },
    /// The link is back, possibly under a new connection id
    Reconnected { connection_id: Option<String> },
    /// The connection is gone for good
    Closed { error: Option<String> },
}

pub type InboundSender = mpsc::UnboundedSender<Inbound>;
pub type InboundReceiver = mpsc::UnboundedReceiver<Inbound>;

/// Creates started connections to a hub
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open, negotiate and handshake a new connection.
    ///
    /// Everything the server pushes afterwards is delivered to `inbound`.
    async fn connect(&self, inbound: InboundSender) -> TransportResult<Arc<dyn Connection>>;
}

/// A started hub connection
#[async_trait]
pub trait Connection: Send + Sync {
    fn state(&self) -> ConnectionState;

    /// Server-assigned id, when the hub negotiated one
    fn connection_id(&self) -> Option<String>;

    /// Send a command and wait for the server's completion
    async fn invoke(&self, command: Command) -> TransportResult<Value>;

    /// Stop the connection; safe to call more than once
    async fn stop(&self);
}
