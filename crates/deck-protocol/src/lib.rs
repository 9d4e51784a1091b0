//! Deck hub protocol
//!
//! JSON messages exchanged with the presentation hub, one per frame,
//! each terminated by the ASCII record separator.
//!
//! ## Session
//! ```text
//! -> {"protocol":"json","version":1}\x1e     # handshake request
//! <- {}\x1e                                  # handshake accepted
//! -> {"type":1,"invocationId":"0","target":"JoinPresentation","arguments":[..]}\x1e
//! <- {"type":1,"target":"InitialUsers","arguments":[[..]]}\x1e
//! <- {"type":3,"invocationId":"0","result":null}\x1e
//! ```
//!
//! ## Message Types
//! ```text
//! 1  Invocation   # command (with invocationId) or event (without)
//! 3  Completion   # acknowledgement: result or error
//! 6  Ping         # keep-alive
//! 7  Close        # server closing, optionally allowing reconnect
//! ```

mod args;
pub mod command;
pub mod error;
pub mod event;
pub mod handshake;
pub mod message;
pub mod parser;

/// Frame terminator
pub const RECORD_SEPARATOR: u8 = 0x1e;

pub use command::Command;
pub use error::{ProtocolError, ProtocolResult};
pub use event::{decode_event, event_arguments, event_message};
pub use handshake::HandshakeRequest;
pub use message::HubMessage;
pub use parser::Parser;
