//! Room Example
//!
//! Runs the synchronization engine against the in-memory hub: connect,
//! receive the roster, make an optimistic edit, and watch an authoritative
//! event override it.
//!
//! Run with: cargo run --example room

use std::sync::Arc;
use std::time::Duration;

use deck_core::{
    Event, Participant, Presentation, PresentationId, Role, Slide, SlideElement, StateStore,
    StaticIdentity, TextBlock,
};
use deck_snapshot::MemorySnapshots;
use deck_sync::SyncEngine;
use deck_transport::MemoryHub;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("Deck Room Example\n");

    let id = PresentationId::new("demo")?;
    let title = SlideElement::Text(TextBlock {
        id: "title".into(),
        x: 40.0,
        y: 40.0,
        width: 400.0,
        height: 60.0,
        text: "Quarterly review".into(),
        font_size: 32.0,
        font_family: "Inter".into(),
        color: "#111111".into(),
    });
    let mut first = Slide::new("s1", 0);
    first.elements.push(title.clone());

    let snapshots = Arc::new(MemorySnapshots::new());
    snapshots.insert(Presentation {
        id: id.clone(),
        title: "Demo deck".into(),
        creator_name: "carol".into(),
        slides: vec![first],
    });

    let hub = MemoryHub::new();
    hub.on_join(vec![Event::InitialUsers(vec![
        Participant::new("carol", Role::Creator),
        Participant::new("alice", Role::Editor),
    ])]);

    let store = Arc::new(StateStore::new());
    let mut engine = SyncEngine::new(
        store.clone(),
        Arc::new(hub.connector()),
        snapshots.clone(),
        Arc::new(StaticIdentity::named("alice")),
    );

    engine.connect(id).await?;
    tokio::time::sleep(Duration::from_millis(20)).await;
    println!("Phase: {}", engine.phase());
    println!("Role: {}", store.current_role());
    println!("Users: {:?}", store.participants());
    println!("Slides: {}", store.slides().len());

    // Optimistic move, visible before the server answers
    let ack = engine.update_element("s1", title.moved_to(100.0, 100.0))?;
    println!("Local position: {:?}", store.elements_of("s1")[0].position());

    // Another editor's move arrives first and wins
    hub.emit(Event::ElementUpdated {
        slide_id: "s1".into(),
        element: title.moved_to(120.0, 80.0),
    });
    ack.await?;
    tokio::time::sleep(Duration::from_millis(20)).await;
    println!("After server event: {:?}", store.elements_of("s1")[0].position());

    engine.add_slide()?.await?;
    hub.emit(Event::SlideAdded(Slide::new("s2", 1)));
    tokio::time::sleep(Duration::from_millis(20)).await;
    println!("Slides: {}", store.slides().len());

    println!("\nCommands sent:");
    for command in hub.invocations() {
        println!("  {} {}", command.target(), serde_json::to_string(&command.arguments()?)?);
    }

    engine.disconnect().await;
    println!("\nPhase: {}", engine.phase());
    Ok(())
}
