//! Engine error types

use deck_snapshot::SnapshotError;
use deck_transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Precondition failure; nothing was sent
    #[error("Not connected")]
    NotConnected,

    #[error("Connection has no server-assigned id")]
    NoConnectionId,

    #[error("Transport error: {0}")]
    Transport(TransportError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Core(#[from] deck_core::Error),
}

impl From<TransportError> for SyncError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotConnected => SyncError::NotConnected,
            other => SyncError::Transport(other),
        }
    }
}

impl SyncError {
    /// True for failures raised before anything reached the network
    pub fn is_precondition(&self) -> bool {
        matches!(self, SyncError::NotConnected | SyncError::NoConnectionId)
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
