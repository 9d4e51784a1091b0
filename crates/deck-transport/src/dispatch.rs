//! Inbound frame dispatch - routes hub messages to waiters and the event queue

use crate::{Inbound, InboundSender, TransportError, TransportResult};
use dashmap::DashMap;
use deck_protocol::{decode_event, HubMessage, Parser, ProtocolError};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

type Waiter = oneshot::Sender<TransportResult<Value>>;

/// Invocations sent but not yet completed, keyed by invocation id
#[derive(Default)]
pub struct PendingInvocations {
    waiters: DashMap<String, Waiter>,
}

impl PendingInvocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `invocation_id`
    pub fn register(&self, invocation_id: &str) -> oneshot::Receiver<TransportResult<Value>> {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(invocation_id.to_string(), tx);
        rx
    }

    /// Resolve a waiter; returns false if nobody was waiting
    pub fn complete(&self, invocation_id: &str, result: TransportResult<Value>) -> bool {
        match self.waiters.remove(invocation_id) {
            Some((_, tx)) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    pub fn cancel(&self, invocation_id: &str) {
        self.waiters.remove(invocation_id);
    }

    /// Fail every outstanding invocation
    pub fn fail_all(&self, error: TransportError) {
        let ids: Vec<String> = self.waiters.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.complete(&id, Err(error.clone()));
        }
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

/// What the session loop should do after a batch of frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The server sent Close
    Close {
        error: Option<String>,
        allow_reconnect: bool,
    },
}

/// Parses inbound bytes and routes each message
pub struct FrameHandler {
    parser: Parser,
    inbound: InboundSender,
}

impl FrameHandler {
    pub fn new(inbound: InboundSender) -> Self {
        Self {
            parser: Parser::new(),
            inbound,
        }
    }

    /// Start from a parser that already holds bytes read during the handshake
    pub fn with_parser(parser: Parser, inbound: InboundSender) -> Self {
        Self { parser, inbound }
    }

    /// Feed raw bytes and handle every complete frame
    pub fn process(&mut self, data: &[u8], pending: &PendingInvocations) -> Flow {
        if let Err(e) = self.parser.feed(data) {
            warn!(error = %e, "Dropping oversized inbound frame");
        }

        loop {
            match self.parser.parse() {
                Ok(Some(message)) => {
                    if let Some(flow) = self.handle(message, pending) {
                        return flow;
                    }
                }
                Ok(None) => return Flow::Continue,
                Err(e) => warn!(error = %e, "Skipping malformed frame"),
            }
        }
    }

    fn handle(&mut self, message: HubMessage, pending: &PendingInvocations) -> Option<Flow> {
        match message {
            HubMessage::Invocation {
                invocation_id: None,
                target,
                arguments,
            } => match decode_event(&target, arguments) {
                Ok(event) => {
                    trace!(event = event.name(), "Event received");
                    let _ = self.inbound.send(Inbound::Event(event));
                }
                Err(ProtocolError::UnknownEvent(name)) => {
                    debug!(event = %name, "Ignoring unknown event");
                }
                Err(e) => warn!(event = %target, error = %e, "Dropping malformed event"),
            },
            HubMessage::Invocation {
                invocation_id: Some(id),
                target,
                ..
            } => {
                warn!(invocation_id = %id, target = %target, "Server invocations expecting a result are not supported");
            }
            HubMessage::Completion {
                invocation_id,
                result,
                error,
            } => {
                let outcome = match error {
                    Some(message) => Err(TransportError::Invocation(message)),
                    None => Ok(result.unwrap_or(Value::Null)),
                };
                if !pending.complete(&invocation_id, outcome) {
                    debug!(invocation_id = %invocation_id, "Completion for unknown invocation");
                }
            }
            HubMessage::Ping => trace!("Ping"),
            HubMessage::Close {
                error,
                allow_reconnect,
            } => {
                return Some(Flow::Close {
                    error,
                    allow_reconnect,
                })
            }
            HubMessage::Unsupported(kind) => debug!(kind, "Ignoring unsupported message type"),
        }
        None
    }
}
