//! In-memory hub
//!
//! A [`MemoryHub`] plays the server side for tests and demos: it records
//! every invocation, answers with scripted completions, and lets the caller
//! push events or simulate a dropped link.

use crate::{
    Connection, ConnectionState, Connector, Inbound, InboundSender, TransportError,
    TransportResult,
};
use async_trait::async_trait;
use deck_core::Event;
use deck_protocol::Command;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct HubInner {
    invocations: Mutex<Vec<Command>>,
    /// Completion per command target; unscripted targets complete with null
    responses: Mutex<HashMap<&'static str, Result<Value, String>>>,
    /// Events pushed in reply to JoinPresentation, before its completion
    on_join: Mutex<Vec<Event>>,
    /// Fail the next connect attempt with this error
    fail_next_start: Mutex<Option<String>>,
    /// Every connection ever opened, oldest first
    connections: Mutex<Vec<Arc<MemoryConnection>>>,
    next_id: AtomicU64,
}

impl HubInner {
    fn active(&self) -> Option<Arc<MemoryConnection>> {
        self.connections
            .lock()
            .iter()
            .rev()
            .find(|c| c.state() != ConnectionState::Disconnected)
            .cloned()
    }

    fn next_connection_id(&self) -> String {
        format!("mem-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Server side of the in-memory transport
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose connections talk to this hub
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            inner: self.inner.clone(),
        }
    }

    /// Every command received, in order
    pub fn invocations(&self) -> Vec<Command> {
        self.inner.invocations.lock().clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.inner.invocations.lock().len()
    }

    /// Script the completion for every command with `target`
    pub fn respond(&self, target: &'static str, result: Result<Value, String>) {
        self.inner.responses.lock().insert(target, result);
    }

    /// Events to push when a client joins (e.g. `InitialUsers`)
    pub fn on_join(&self, events: Vec<Event>) {
        *self.inner.on_join.lock() = events;
    }

    /// Make the next connect attempt fail
    pub fn fail_next_start(&self, error: impl Into<String>) {
        *self.inner.fail_next_start.lock() = Some(error.into());
    }

    /// Push an event to the live connection; false if there is none
    pub fn emit(&self, event: Event) -> bool {
        match self.inner.active() {
            Some(connection) => connection.deliver(Inbound::Event(event)),
            None => false,
        }
    }

    /// Simulate a dropped link; the connection starts reconnecting
    pub fn drop_connection(&self) -> bool {
        match self.inner.active() {
            Some(connection) => {
                connection.set_state(ConnectionState::Reconnecting);
                connection.deliver(Inbound::Reconnecting {
                    error: Some("connection dropped".into()),
                })
            }
            None => false,
        }
    }

    /// Complete a reconnect under a fresh connection id
    pub fn resume(&self) -> Option<String> {
        let connection = self.inner.active()?;
        let id = self.inner.next_connection_id();
        *connection.id.write() = Some(id.clone());
        connection.set_state(ConnectionState::Connected);
        connection.deliver(Inbound::Reconnected {
            connection_id: Some(id.clone()),
        });
        Some(id)
    }

    /// Close the live connection for good
    pub fn close(&self, error: Option<String>) -> bool {
        match self.inner.active() {
            Some(connection) => {
                connection.set_state(ConnectionState::Disconnected);
                connection.deliver(Inbound::Closed { error })
            }
            None => false,
        }
    }

    /// State of every connection ever opened, oldest first
    pub fn connection_states(&self) -> Vec<ConnectionState> {
        self.inner
            .connections
            .lock()
            .iter()
            .map(|c| c.state())
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.connections.lock().len()
    }
}

/// Client side of the in-memory transport
#[derive(Clone)]
pub struct MemoryConnector {
    inner: Arc<HubInner>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, inbound: InboundSender) -> TransportResult<Arc<dyn Connection>> {
        if let Some(error) = self.inner.fail_next_start.lock().take() {
            return Err(TransportError::Start(error));
        }

        let connection = Arc::new(MemoryConnection {
            id: RwLock::new(Some(self.inner.next_connection_id())),
            state: RwLock::new(ConnectionState::Connected),
            inbound,
            hub: self.inner.clone(),
        });
        self.inner.connections.lock().push(connection.clone());
        debug!(connection_id = ?connection.connection_id(), "Memory connection opened");

        Ok(connection)
    }
}

pub struct MemoryConnection {
    id: RwLock<Option<String>>,
    state: RwLock<ConnectionState>,
    inbound: InboundSender,
    hub: Arc<HubInner>,
}

impl MemoryConnection {
    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    fn deliver(&self, inbound: Inbound) -> bool {
        self.inbound.send(inbound).is_ok()
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn connection_id(&self) -> Option<String> {
        self.id.read().clone()
    }

    async fn invoke(&self, command: Command) -> TransportResult<Value> {
        if self.state() != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }

        let target = command.target();
        let is_join = matches!(command, Command::JoinPresentation { .. });
        self.hub.invocations.lock().push(command);

        if is_join {
            let events = self.hub.on_join.lock().clone();
            for event in events {
                self.deliver(Inbound::Event(event));
            }
        }

        // Completions never arrive synchronously
        tokio::task::yield_now().await;

        let response = self.hub.responses.lock().get(target).cloned();
        match response {
            Some(Err(message)) => Err(TransportError::Invocation(message)),
            Some(Ok(value)) => Ok(value),
            None => Ok(Value::Null),
        }
    }

    async fn stop(&self) {
        self.set_state(ConnectionState::Disconnected);
    }
}
