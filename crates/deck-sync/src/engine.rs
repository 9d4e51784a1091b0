//! Synchronization engine

use crate::session::{EventLoop, SessionContext};
use crate::{EngineConfig, SyncError, SyncPhase, SyncResult};
use deck_core::{
    reconcile, AssignableRole, Event, IdentityProvider, Presentation, PresentationId,
    SlideElement, StateStore,
};
use deck_protocol::Command;
use deck_snapshot::{ImageUpload, SnapshotFetcher};
use deck_transport::{Connector, RealtimeChannel};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A dispatched mutation awaiting the server's acknowledgement
pub type PendingAck = BoxFuture<'static, SyncResult<Value>>;

/// A dispatched image upload
pub type PendingUpload = BoxFuture<'static, SyncResult<()>>;

struct Session {
    context: Arc<SessionContext>,
    events: JoinHandle<()>,
}

/// Keeps a [`StateStore`] in sync with one presentation room.
///
/// Create one per room visit and drop it (or call [`disconnect`](Self::disconnect))
/// on exit. Mutations are two-phase: the call itself checks the connected
/// precondition and applies any optimistic change, the returned future
/// carries the server round trip.
pub struct SyncEngine {
    store: Arc<StateStore>,
    channel: RealtimeChannel,
    fetcher: Arc<dyn SnapshotFetcher>,
    identity: Arc<dyn IdentityProvider>,
    config: EngineConfig,
    phase: Arc<watch::Sender<SyncPhase>>,
    session: Option<Session>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<StateStore>,
        connector: Arc<dyn Connector>,
        fetcher: Arc<dyn SnapshotFetcher>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            store,
            channel: RealtimeChannel::new(connector),
            fetcher,
            identity,
            config: EngineConfig::default(),
            phase: Arc::new(phase),
            session: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Connect, join `presentation_id` and load its snapshot.
    ///
    /// Any previous connection is stopped and the store is reset first. On
    /// failure the engine is back in [`SyncPhase::Idle`] and disconnected.
    pub async fn connect(&mut self, presentation_id: PresentationId) -> SyncResult<()> {
        self.teardown().await;
        self.store.reset();
        self.phase.send_replace(SyncPhase::Connecting);

        let user_name = self.identity.name_or_anonymous();
        info!(presentation = %presentation_id, user = %user_name, "Connecting");

        // Created before start so nothing pushed after start is lost
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let connection = match self.channel.connect(inbound_tx).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(presentation = %presentation_id, error = %e, "Failed to start connection");
                self.phase.send_replace(SyncPhase::Idle);
                return Err(e.into());
            }
        };
        self.store.set_connected(true);

        let context = Arc::new(SessionContext {
            presentation_id,
            user_name,
            store: self.store.clone(),
            fetcher: self.fetcher.clone(),
            phase: self.phase.clone(),
            config: self.config.clone(),
        });
        let events = tokio::spawn(
            EventLoop::new(inbound_rx, connection.clone(), context.clone()).run(),
        );
        self.session = Some(Session {
            context: context.clone(),
            events,
        });

        if let Err(e) = context.join_and_snapshot(connection.as_ref()).await {
            warn!(presentation = %context.presentation_id, error = %e, "Failed to join");
            self.teardown().await;
            self.phase.send_replace(SyncPhase::Idle);
            return Err(e);
        }

        Ok(())
    }

    /// Stop the connection and clear the connected flag.
    ///
    /// Slides, elements and roster keep their last observed values. Safe to
    /// call when never connected.
    pub async fn disconnect(&mut self) {
        let had_session = self.session.is_some();
        self.teardown().await;
        if had_session {
            self.phase.send_replace(SyncPhase::Disconnected);
            info!("Disconnected");
        }
    }

    async fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            session.events.abort();
        }
        self.channel.disconnect().await;
        self.store.set_connected(false);
    }

    /// Presentation targeted by mutations, once connected
    fn target(&self) -> SyncResult<&SessionContext> {
        if !self.store.is_connected() {
            return Err(SyncError::NotConnected);
        }
        self.channel.ensure_connected()?;
        self.session
            .as_ref()
            .map(|s| s.context.as_ref())
            .ok_or(SyncError::NotConnected)
    }

    fn dispatch(&self, command: Command) -> SyncResult<PendingAck> {
        let invocation = self.channel.invoke(command)?;
        Ok(Box::pin(async move { invocation.await.map_err(SyncError::from) }))
    }

    pub fn add_slide(&self) -> SyncResult<PendingAck> {
        let target = self.target()?;
        self.dispatch(Command::add_slide(target.presentation_id.clone()))
    }

    pub fn add_text_block(&self, slide_id: &str, text: &str) -> SyncResult<PendingAck> {
        let target = self.target()?;
        self.dispatch(Command::add_text_block(
            target.presentation_id.clone(),
            slide_id.to_string(),
            text.to_string(),
        ))
    }

    pub fn add_image_block(&self, slide_id: &str, url: &str) -> SyncResult<PendingAck> {
        let target = self.target()?;
        self.dispatch(Command::add_image_block(
            target.presentation_id.clone(),
            slide_id.to_string(),
            url.to_string(),
        ))
    }

    /// Replace an element locally, then send the update
    pub fn update_element(&self, slide_id: &str, element: SlideElement) -> SyncResult<PendingAck> {
        let target = self.target()?;
        let command = Command::update_element(
            target.presentation_id.clone(),
            slide_id.to_string(),
            element.clone(),
        );

        self.apply_optimistic(Event::ElementUpdated {
            slide_id: slide_id.to_string(),
            element,
        });
        self.dispatch(command)
    }

    /// Remove an element locally, then send the removal
    pub fn remove_element(&self, slide_id: &str, element_id: &str) -> SyncResult<PendingAck> {
        let target = self.target()?;
        let command = Command::remove_element(
            target.presentation_id.clone(),
            slide_id.to_string(),
            element_id.to_string(),
        );

        self.apply_optimistic(Event::ElementRemoved {
            slide_id: slide_id.to_string(),
            element_id: element_id.to_string(),
        });
        self.dispatch(command)
    }

    /// Ask the server to change another participant's role
    pub fn change_role(&self, target_user: &str, role: AssignableRole) -> SyncResult<PendingAck> {
        let target = self.target()?;
        self.dispatch(Command::change_role(
            target.presentation_id.clone(),
            target_user.to_string(),
            role,
        ))
    }

    /// Upload an image onto a slide, tied to the live connection
    pub fn upload_image(&self, slide_id: &str, file: ImageUpload) -> SyncResult<PendingUpload> {
        let target = self.target()?;
        let connection_id = self
            .channel
            .connection_id()
            .ok_or(SyncError::NoConnectionId)?;
        let presentation_id = target.presentation_id.clone();
        let slide_id = slide_id.to_string();
        let fetcher = self.fetcher.clone();

        debug!(presentation = %presentation_id, slide = %slide_id, "Uploading image");
        Ok(Box::pin(async move {
            fetcher
                .upload_image(&presentation_id, &slide_id, file, &connection_id)
                .await
                .map_err(SyncError::from)
        }))
    }

    /// Every presentation the server knows about
    pub async fn list_presentations(&self) -> SyncResult<Vec<Presentation>> {
        Ok(self.fetcher.get_all().await?)
    }

    fn apply_optimistic(&self, event: Event) {
        let user = self.session.as_ref().map(|s| s.context.user_name.as_str());
        reconcile::apply(&self.store, &event, user);
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    pub fn watch_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    /// Whether the local user may mutate slides right now
    pub fn can_edit(&self) -> bool {
        self.store.current_role().can_edit()
    }

    /// Identifier used to correlate out-of-band uploads with this connection
    pub fn connection_id(&self) -> Option<String> {
        self.channel.connection_id()
    }

    pub fn presentation_id(&self) -> Option<&PresentationId> {
        self.session.as_ref().map(|s| &s.context.presentation_id)
    }

    /// Name the last connect joined with
    pub fn user_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.context.user_name.as_str())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.events.abort();
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("phase", &self.phase())
            .field("presentation", &self.presentation_id())
            .field("channel", &self.channel)
            .finish()
    }
}
