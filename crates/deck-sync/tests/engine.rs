//! Engine scenarios over the in-memory hub and snapshot table

use deck_core::{
    AssignableRole, Event, IdentityProvider, Participant, Presentation, PresentationId, Role,
    Slide, SlideElement, StateStore, StaticIdentity, TextBlock,
};
use deck_protocol::Command;
use deck_snapshot::{ImageUpload, MemorySnapshots, SnapshotError, SnapshotFetcher};
use deck_sync::{EngineConfig, SyncEngine, SyncError, SyncPhase};
use deck_transport::{ConnectionState, Connector, MemoryHub, TransportError};
use std::sync::Arc;
use std::time::Duration;

fn pid() -> PresentationId {
    PresentationId::new("p1").unwrap()
}

fn text(id: &str, x: f64, y: f64) -> SlideElement {
    SlideElement::Text(TextBlock {
        id: id.into(),
        x,
        y,
        width: 10.0,
        height: 10.0,
        text: "hi".into(),
        font_size: 18.0,
        font_family: "Arial".into(),
        color: "#000000".into(),
    })
}

fn presentation() -> Presentation {
    let mut slide = Slide::new("s1", 0);
    slide.elements.push(text("e1", 0.0, 0.0));
    Presentation {
        id: pid(),
        title: "Quarterly review".into(),
        creator_name: "carol".into(),
        slides: vec![slide],
    }
}

struct Room {
    hub: MemoryHub,
    snapshots: Arc<MemorySnapshots>,
    store: Arc<StateStore>,
    engine: SyncEngine,
}

fn room_with(identity: StaticIdentity, config: EngineConfig) -> Room {
    let hub = MemoryHub::new();
    let snapshots = Arc::new(MemorySnapshots::new());
    snapshots.insert(presentation());
    let store = Arc::new(StateStore::new());

    let connector: Arc<dyn Connector> = Arc::new(hub.connector());
    let fetcher: Arc<dyn SnapshotFetcher> = snapshots.clone();
    let identity: Arc<dyn IdentityProvider> = Arc::new(identity);
    let engine = SyncEngine::new(store.clone(), connector, fetcher, identity).with_config(config);

    Room {
        hub,
        snapshots,
        store,
        engine,
    }
}

fn room() -> Room {
    room_with(StaticIdentity::named("alice"), EngineConfig::default())
}

async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn joins(hub: &MemoryHub) -> usize {
    hub.invocations()
        .iter()
        .filter(|c| matches!(c, Command::JoinPresentation { .. }))
        .count()
}

#[tokio::test]
async fn test_connect_replaces_store_with_snapshot() {
    let mut room = room();
    room.store.update_slides(|_| Some(vec![Slide::new("stale", 9)]));

    room.engine.connect(pid()).await.unwrap();

    let expected = presentation();
    assert_eq!(*room.store.slides(), expected.slides);
    assert_eq!(room.store.elements_of("s1"), expected.slides[0].elements);
    assert_eq!(room.store.elements().len(), 1);
    assert!(room.store.is_connected());
    assert_eq!(room.engine.phase(), SyncPhase::Synced);
    assert_eq!(room.hub.invocations(), vec![Command::join(pid(), "alice")]);
    assert_eq!(room.engine.user_name(), Some("alice"));
}

#[tokio::test]
async fn test_join_falls_back_to_anonymous() {
    let mut room = room_with(StaticIdentity::anonymous(), EngineConfig::default());

    room.engine.connect(pid()).await.unwrap();

    assert_eq!(room.hub.invocations(), vec![Command::join(pid(), "anonymous")]);
}

#[tokio::test]
async fn test_initial_users_during_join() {
    let mut room = room();
    room.hub.on_join(vec![Event::InitialUsers(vec![
        Participant::new("carol", Role::Creator),
        Participant::new("alice", Role::Editor),
    ])]);

    room.engine.connect(pid()).await.unwrap();

    let store = room.store.clone();
    eventually(|| store.current_role() == Role::Editor).await;
    assert_eq!(room.store.participants().len(), 2);
    assert!(room.engine.can_edit());
}

#[tokio::test]
async fn test_mutations_require_connection() {
    let room = room();
    let engine = &room.engine;

    assert!(matches!(engine.add_slide(), Err(SyncError::NotConnected)));
    assert!(matches!(engine.add_text_block("s1", "hi"), Err(SyncError::NotConnected)));
    assert!(matches!(
        engine.add_image_block("s1", "http://img/cat.png"),
        Err(SyncError::NotConnected)
    ));
    assert!(matches!(
        engine.update_element("s1", text("e1", 1.0, 1.0)),
        Err(SyncError::NotConnected)
    ));
    assert!(matches!(engine.remove_element("s1", "e1"), Err(SyncError::NotConnected)));
    assert!(matches!(
        engine.change_role("bob", AssignableRole::Viewer),
        Err(SyncError::NotConnected)
    ));
    assert!(matches!(
        engine.upload_image("s1", ImageUpload::new("a.png", vec![1])),
        Err(SyncError::NotConnected)
    ));

    assert_eq!(room.hub.invocation_count(), 0);
    assert_eq!(room.hub.connect_count(), 0);
}

#[tokio::test]
async fn test_mutations_fail_after_disconnect() {
    let mut room = room();
    room.engine.connect(pid()).await.unwrap();
    room.engine.disconnect().await;

    let before = room.hub.invocation_count();
    let result = room.engine.update_element("s1", text("e1", 3.0, 3.0));

    assert!(matches!(result, Err(SyncError::NotConnected)));
    assert_eq!(room.hub.invocation_count(), before);
    // Precondition failed before the optimistic apply
    assert_eq!(room.store.elements_of("s1"), vec![text("e1", 0.0, 0.0)]);
}

#[tokio::test]
async fn test_failed_start_returns_to_idle() {
    let mut room = room();
    room.hub.fail_next_start("hub offline");

    let result = room.engine.connect(pid()).await;

    assert!(matches!(
        result,
        Err(SyncError::Transport(TransportError::Start(_)))
    ));
    assert_eq!(room.engine.phase(), SyncPhase::Idle);
    assert!(!room.store.is_connected());

    // The UI may retry
    room.engine.connect(pid()).await.unwrap();
    assert_eq!(room.engine.phase(), SyncPhase::Synced);
}

#[tokio::test]
async fn test_failed_snapshot_returns_to_idle() {
    let mut room = room();
    room.snapshots.remove(&pid());

    let result = room.engine.connect(pid()).await;

    assert!(matches!(
        result,
        Err(SyncError::Snapshot(SnapshotError::NotFound(_)))
    ));
    assert_eq!(room.engine.phase(), SyncPhase::Idle);
    assert!(!room.store.is_connected());
    assert_eq!(room.hub.connection_states(), vec![ConnectionState::Disconnected]);
}

#[tokio::test]
async fn test_rejected_join_returns_to_idle() {
    let mut room = room();
    room.hub.respond("JoinPresentation", Err("presentation closed".into()));

    let result = room.engine.connect(pid()).await;

    assert!(matches!(
        result,
        Err(SyncError::Transport(TransportError::Invocation(_)))
    ));
    assert_eq!(room.engine.phase(), SyncPhase::Idle);
    assert_eq!(room.snapshots.fetch_count(), 0);
}

#[tokio::test]
async fn test_role_updates() {
    let mut room = room();
    room.engine.connect(pid()).await.unwrap();
    let store = room.store.clone();

    room.hub.emit(Event::InitialUsers(vec![Participant::new("alice", Role::Editor)]));
    eventually(|| store.current_role() == Role::Editor).await;

    room.hub.emit(Event::UserRoleUpdated {
        name: "alice".into(),
        role: Role::Viewer,
    });
    eventually(|| store.current_role() == Role::Viewer).await;
    assert_eq!(
        *room.store.participants(),
        vec![Participant::new("alice", Role::Viewer)]
    );
    assert!(!room.engine.can_edit());
}

#[tokio::test]
async fn test_slide_and_element_events() {
    let mut room = room();
    room.engine.connect(pid()).await.unwrap();
    let store = room.store.clone();

    room.hub.emit(Event::SlideAdded(Slide::new("s2", 1)));
    room.hub.emit(Event::ElementAdded {
        slide_id: "s2".into(),
        element: text("e9", 0.0, 0.0),
    });
    eventually(|| store.elements_of("s2") == vec![text("e9", 0.0, 0.0)]).await;
    assert_eq!(room.store.slides().len(), 2);

    room.hub.emit(Event::ElementRemoved {
        slide_id: "s2".into(),
        element_id: "e9".into(),
    });
    eventually(|| store.elements_of("s2").is_empty()).await;
}

#[tokio::test]
async fn test_authoritative_event_overrides_optimistic_move() {
    let mut room = room();
    room.engine.connect(pid()).await.unwrap();
    let store = room.store.clone();

    let ack = room.engine.update_element("s1", text("e1", 5.0, 5.0)).unwrap();
    assert_eq!(store.elements_of("s1")[0].position(), (5.0, 5.0));

    room.hub.emit(Event::ElementUpdated {
        slide_id: "s1".into(),
        element: text("e1", 7.0, 7.0),
    });
    eventually(|| store.elements_of("s1")[0].position() == (7.0, 7.0)).await;

    ack.await.unwrap();
    assert_eq!(store.elements_of("s1")[0].position(), (7.0, 7.0));
    assert_eq!(
        room.hub.invocations().last(),
        Some(&Command::update_element(pid(), "s1".into(), text("e1", 5.0, 5.0)))
    );
}

#[tokio::test]
async fn test_failed_removal_is_not_rolled_back() {
    let mut room = room();
    room.hub.respond("RemoveElement", Err("Only editors can remove elements".into()));
    room.engine.connect(pid()).await.unwrap();

    let ack = room.engine.remove_element("s1", "e1").unwrap();
    assert!(room.store.elements_of("s1").is_empty());

    let result = ack.await;
    assert!(matches!(
        result,
        Err(SyncError::Transport(TransportError::Invocation(_)))
    ));
    assert!(room.store.elements_of("s1").is_empty());
}

#[tokio::test]
async fn test_add_commands_are_not_optimistic() {
    let mut room = room();
    room.engine.connect(pid()).await.unwrap();

    room.engine.add_slide().unwrap().await.unwrap();
    room.engine.add_text_block("s1", "hello").unwrap().await.unwrap();
    room.engine
        .add_image_block("s1", "http://img/cat.png")
        .unwrap()
        .await
        .unwrap();

    assert_eq!(room.store.slides().len(), 1);
    assert_eq!(room.store.elements_of("s1").len(), 1);
    assert_eq!(
        room.hub.invocations()[1..],
        [
            Command::add_slide(pid()),
            Command::add_text_block(pid(), "s1".into(), "hello".into()),
            Command::add_image_block(pid(), "s1".into(), "http://img/cat.png".into()),
        ]
    );
}

#[tokio::test]
async fn test_change_role_command() {
    let mut room = room();
    room.engine.connect(pid()).await.unwrap();

    room.engine
        .change_role("bob", AssignableRole::Editor)
        .unwrap()
        .await
        .unwrap();

    assert_eq!(
        room.hub.invocations().last(),
        Some(&Command::change_role(pid(), "bob".into(), AssignableRole::Editor))
    );
}

#[tokio::test]
async fn test_upload_carries_connection_id() {
    let mut room = room();
    room.engine.connect(pid()).await.unwrap();
    let connection_id = room.engine.connection_id().unwrap();

    room.engine
        .upload_image("s1", ImageUpload::new("cat.png", vec![0x89, 0x50]))
        .unwrap()
        .await
        .unwrap();

    let uploads = room.snapshots.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].connection_id, connection_id);
    assert_eq!(uploads[0].slide_id, "s1");
}

#[tokio::test]
async fn test_resync_after_reconnect() {
    let mut room = room();
    room.engine.connect(pid()).await.unwrap();
    let store = room.store.clone();

    room.hub.drop_connection();
    eventually(|| !store.is_connected()).await;
    assert!(matches!(room.engine.add_slide(), Err(SyncError::NotConnected)));

    room.snapshots.modify(&pid(), |p| p.slides.push(Slide::new("s2", 1)));
    let new_id = room.hub.resume();

    eventually(|| store.slides().len() == 2).await;
    assert!(room.store.is_connected());
    assert_eq!(joins(&room.hub), 2);
    assert_eq!(room.engine.connection_id(), new_id);
    assert_eq!(room.engine.phase(), SyncPhase::Synced);
}

#[tokio::test]
async fn test_no_resync_when_disabled() {
    let config = EngineConfig {
        resync_on_reconnect: false,
    };
    let mut room = room_with(StaticIdentity::named("alice"), config);
    room.engine.connect(pid()).await.unwrap();
    let store = room.store.clone();

    room.hub.drop_connection();
    eventually(|| !store.is_connected()).await;
    room.hub.resume();
    eventually(|| store.is_connected()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(joins(&room.hub), 1);
    assert_eq!(room.snapshots.fetch_count(), 1);
}

#[tokio::test]
async fn test_closed_connection_disconnects() {
    let mut room = room();
    room.engine.connect(pid()).await.unwrap();
    let mut phase = room.engine.watch_phase();

    room.hub.close(Some("presentation deleted".into()));

    tokio::time::timeout(Duration::from_secs(2), phase.wait_for(|p| *p == SyncPhase::Disconnected))
        .await
        .unwrap()
        .unwrap();
    assert!(!room.store.is_connected());
    // Last observed content stays
    assert_eq!(room.store.slides().len(), 1);
}

#[tokio::test]
async fn test_reconnect_to_other_presentation() {
    let mut room = room();
    let mut other = presentation();
    other.id = PresentationId::new("p2").unwrap();
    other.slides = vec![Slide::new("x1", 0), Slide::new("x2", 1)];
    room.snapshots.insert(other);

    room.engine.connect(pid()).await.unwrap();
    room.engine.connect(PresentationId::new("p2").unwrap()).await.unwrap();

    assert_eq!(
        room.hub.connection_states(),
        vec![ConnectionState::Disconnected, ConnectionState::Connected]
    );
    assert_eq!(room.store.slides().len(), 2);
    assert!(room.store.elements_of("s1").is_empty());
    assert_eq!(room.engine.presentation_id().map(|p| p.as_str()), Some("p2"));

    room.engine.add_slide().unwrap().await.unwrap();
    assert_eq!(
        room.hub.invocations().last(),
        Some(&Command::add_slide(PresentationId::new("p2").unwrap()))
    );
}

#[tokio::test]
async fn test_disconnect_keeps_content() {
    let mut room = room();
    room.engine.disconnect().await;
    assert_eq!(room.engine.phase(), SyncPhase::Idle);

    room.engine.connect(pid()).await.unwrap();
    room.engine.disconnect().await;
    room.engine.disconnect().await;

    assert_eq!(room.engine.phase(), SyncPhase::Disconnected);
    assert!(!room.store.is_connected());
    assert_eq!(room.store.slides().len(), 1);
    assert_eq!(room.store.elements_of("s1").len(), 1);
}

#[tokio::test]
async fn test_list_presentations() {
    let room = room();
    let all = room.engine.list_presentations().await.unwrap();
    assert_eq!(all, vec![presentation()]);
}
