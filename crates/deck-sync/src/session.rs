//! One joined room: join/snapshot sequencing and the inbound event loop

use crate::{EngineConfig, SyncPhase, SyncResult};
use deck_core::{reconcile, PresentationId, StateStore};
use deck_protocol::Command;
use deck_snapshot::SnapshotFetcher;
use deck_transport::{Connection, Inbound, InboundReceiver};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Everything a joined room needs, shared by the engine and its event loop
pub(crate) struct SessionContext {
    pub presentation_id: PresentationId,
    pub user_name: String,
    pub store: Arc<StateStore>,
    pub fetcher: Arc<dyn SnapshotFetcher>,
    pub phase: Arc<watch::Sender<SyncPhase>>,
    pub config: EngineConfig,
}

impl SessionContext {
    /// Join the presentation, then overwrite slides and elements with a fresh snapshot
    pub async fn join_and_snapshot(&self, connection: &dyn Connection) -> SyncResult<()> {
        connection
            .invoke(Command::join(
                self.presentation_id.clone(),
                self.user_name.clone(),
            ))
            .await?;
        self.phase.send_replace(SyncPhase::Joined);
        debug!(presentation = %self.presentation_id, user = %self.user_name, "Joined");

        let presentation = self.fetcher.get_by_id(&self.presentation_id).await?;
        self.store.replace_document(&presentation);
        self.phase.send_replace(SyncPhase::Synced);
        info!(
            presentation = %self.presentation_id,
            slides = presentation.slides.len(),
            "Snapshot applied"
        );
        Ok(())
    }
}

enum Step {
    Inbound(Option<Inbound>),
    Resynced(SyncResult<()>),
}

/// Folds inbound notifications into the store, one at a time, in arrival order
pub(crate) struct EventLoop {
    inbound: InboundReceiver,
    connection: Arc<dyn Connection>,
    context: Arc<SessionContext>,
}

impl EventLoop {
    pub fn new(
        inbound: InboundReceiver,
        connection: Arc<dyn Connection>,
        context: Arc<SessionContext>,
    ) -> Self {
        Self {
            inbound,
            connection,
            context,
        }
    }

    pub async fn run(mut self) {
        // At most one resync in flight; a newer resume replaces it
        let mut resync: Option<BoxFuture<'static, SyncResult<()>>> = None;

        loop {
            let step = match resync.as_mut() {
                Some(task) => tokio::select! {
                    result = task => Step::Resynced(result),
                    inbound = self.inbound.recv() => Step::Inbound(inbound),
                },
                None => Step::Inbound(self.inbound.recv().await),
            };

            match step {
                Step::Resynced(result) => {
                    resync = None;
                    if let Err(e) = result {
                        warn!(presentation = %self.context.presentation_id, error = %e, "Resync failed");
                    }
                }
                Step::Inbound(None) => break,
                Step::Inbound(Some(inbound)) => {
                    if let Some(task) = self.handle(inbound) {
                        resync = Some(task);
                    }
                    if *self.context.phase.borrow() == SyncPhase::Disconnected {
                        break;
                    }
                }
            }
        }
        debug!(presentation = %self.context.presentation_id, "Event loop finished");
    }

    fn handle(&self, inbound: Inbound) -> Option<BoxFuture<'static, SyncResult<()>>> {
        let store = &self.context.store;
        match inbound {
            Inbound::Event(event) => {
                reconcile::apply(store, &event, Some(&self.context.user_name));
                None
            }
            Inbound::Reconnecting { error } => {
                warn!(error = ?error, "Realtime link dropped");
                store.set_connected(false);
                None
            }
            Inbound::Reconnected { connection_id } => {
                info!(connection_id = ?connection_id, "Realtime link resumed");
                store.set_connected(true);
                if !self.context.config.resync_on_reconnect {
                    return None;
                }
                let context = self.context.clone();
                let connection = self.connection.clone();
                Some(Box::pin(async move {
                    context.join_and_snapshot(connection.as_ref()).await
                }))
            }
            Inbound::Closed { error } => {
                warn!(error = ?error, "Realtime connection closed");
                store.set_connected(false);
                self.context.phase.send_replace(SyncPhase::Disconnected);
                None
            }
        }
    }
}
