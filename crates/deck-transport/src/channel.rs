//! Realtime channel - owns the current hub connection

use crate::{Connection, ConnectionState, Connector, InboundSender, TransportError, TransportResult};
use deck_protocol::Command;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// A dispatched command awaiting the server's completion
pub type Invocation = BoxFuture<'static, TransportResult<Value>>;

/// Wraps one hub connection at a time
pub struct RealtimeChannel {
    connector: Arc<dyn Connector>,
    connection: Option<Arc<dyn Connection>>,
}

impl RealtimeChannel {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connection: None,
        }
    }

    /// Build and start a fresh connection, stopping any previous one first
    pub async fn connect(&mut self, inbound: InboundSender) -> TransportResult<Arc<dyn Connection>> {
        self.disconnect().await;

        let connection = self.connector.connect(inbound).await?;
        info!(
            connection_id = ?connection.connection_id(),
            "Realtime connection started"
        );
        self.connection = Some(connection.clone());
        Ok(connection)
    }

    /// Stop and discard the current connection; no-op when there is none
    pub async fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.stop().await;
            debug!("Realtime connection stopped");
        }
    }

    /// The current connection, if it is connected right now
    pub fn ensure_connected(&self) -> TransportResult<&Arc<dyn Connection>> {
        match &self.connection {
            Some(connection) if connection.state() == ConnectionState::Connected => Ok(connection),
            _ => Err(TransportError::NotConnected),
        }
    }

    /// Dispatch a command.
    ///
    /// Fails immediately with [`TransportError::NotConnected`] when there is
    /// no connected link; nothing is sent in that case. Otherwise the returned
    /// future resolves with the server's completion.
    pub fn invoke(&self, command: Command) -> TransportResult<Invocation> {
        let connection = self.ensure_connected()?.clone();
        debug!(target = command.target(), "Dispatching command");
        Ok(Box::pin(async move { connection.invoke(command).await }))
    }

    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.connection.clone()
    }

    pub fn connection_id(&self) -> Option<String> {
        self.connection.as_ref().and_then(|c| c.connection_id())
    }

    pub fn state(&self) -> ConnectionState {
        self.connection
            .as_ref()
            .map(|c| c.state())
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("state", &self.state())
            .field("connection_id", &self.connection_id())
            .finish()
    }
}
