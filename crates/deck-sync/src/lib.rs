//! Deck Synchronization Engine
//!
//! Mirrors one presentation room into a [`StateStore`](deck_core::StateStore):
//! - Connect: start the realtime channel, join, then replace slides and
//!   elements with a fetched snapshot
//! - Events: folded into the store in arrival order by a single task
//! - Mutations: connected precondition, optional optimistic apply, then invoke
//!
//! ## Phases
//! ```text
//! Idle -> Connecting -> Joined -> Synced -> Disconnected
//!           |  failure                |  reconnect (resync)
//!           v                         v
//!          Idle                     Joined -> Synced
//! ```

pub mod config;
mod engine;
pub mod error;
mod session;

pub use config::EngineConfig;
pub use engine::{PendingAck, PendingUpload, SyncEngine};
pub use error::{SyncError, SyncResult};

/// Where the engine is in the connect sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Connecting,
    Joined,
    Synced,
    Disconnected,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Connecting => "connecting",
            SyncPhase::Joined => "joined",
            SyncPhase::Synced => "synced",
            SyncPhase::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}
