//! Interactive room session

use crate::config::Settings;
use crate::repl::{print_help, ReplCommand};
use anyhow::{Context, Result};
use colored::*;
use deck_core::{PresentationId, SlideElement, StateStore, StoreField};
use deck_snapshot::{HttpSnapshotFetcher, ImageUpload};
use deck_sync::{PendingAck, SyncEngine, SyncResult};
use deck_transport::WebSocketConnector;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

pub async fn run(settings: &Settings, id: &str) -> Result<()> {
    let presentation_id = PresentationId::new(id)?;
    let store = Arc::new(StateStore::new());
    let mut engine = SyncEngine::new(
        store.clone(),
        Arc::new(WebSocketConnector::new(settings.hub_config())),
        Arc::new(HttpSnapshotFetcher::new(&settings.server)),
        settings.identity(),
    )
    .with_config(settings.engine.clone());

    engine
        .connect(presentation_id.clone())
        .await
        .with_context(|| format!("Failed to join presentation {}", presentation_id))?;

    println!(
        "{}",
        format!(
            "Joined {} as {} ({} slides). Type 'help' for commands.",
            presentation_id,
            engine.user_name().unwrap_or_default(),
            store.slides().len()
        )
        .cyan()
    );

    let watcher = tokio::spawn(watch_changes(store.clone()));
    let result = repl(&engine).await;

    watcher.abort();
    engine.disconnect().await;
    result
}

async fn repl(engine: &SyncEngine) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history_path = dirs_next::home_dir()
        .map(|p| p.join(".deck_history"))
        .unwrap_or_default();
    let _ = rl.load_history(&history_path);

    loop {
        let prompt = format!("{}> ", engine.store().current_role().to_string().green());
        let line = tokio::task::block_in_place(|| rl.readline(&prompt));

        match line {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                let command = match ReplCommand::parse(line) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{} {}", "Error:".red(), e);
                        continue;
                    }
                };
                if command == ReplCommand::Quit {
                    break;
                }
                execute(engine, command).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

async fn execute(engine: &SyncEngine, command: ReplCommand) {
    let store = engine.store();
    if let Err(reason) = command.permitted(store.current_role()) {
        eprintln!("{} {}", "Denied:".red(), reason);
        return;
    }

    match command {
        ReplCommand::Slides => print_slides(store),
        ReplCommand::Users => {
            for participant in store.participants().iter() {
                println!("  {} ({})", participant.name.bold(), participant.role);
            }
        }
        ReplCommand::Role => println!("{}", store.current_role()),
        ReplCommand::AddSlide => report(engine.add_slide()).await,
        ReplCommand::Text { slide, text } => report(engine.add_text_block(&slide, &text)).await,
        ReplCommand::Image { slide, url } => report(engine.add_image_block(&slide, &url)).await,
        ReplCommand::Move { slide, element, x, y } => {
            let current = store
                .elements_of(&slide)
                .into_iter()
                .find(|e| e.id() == element);
            match current {
                Some(current) => report(engine.update_element(&slide, current.moved_to(x, y))).await,
                None => eprintln!("{} no element {} on slide {}", "Error:".red(), element, slide),
            }
        }
        ReplCommand::Remove { slide, element } => {
            report(engine.remove_element(&slide, &element)).await
        }
        ReplCommand::Grant { user, role } => report(engine.change_role(&user, role)).await,
        ReplCommand::Upload { slide, path } => {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    eprintln!("{} {}: {}", "Error:".red(), path.display(), e);
                    return;
                }
            };
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "upload".to_string());

            match engine.upload_image(&slide, ImageUpload::new(file_name, bytes)) {
                Ok(upload) => match upload.await {
                    Ok(()) => println!("{}", "OK".green()),
                    Err(e) => eprintln!("{} {}", "failed to upload:".red(), e),
                },
                Err(e) => eprintln!("{} {}", "Error:".red(), e),
            }
        }
        ReplCommand::Help => print_help(),
        ReplCommand::Quit => {}
    }
}

/// Await a dispatched mutation and print the outcome
async fn report(dispatched: SyncResult<PendingAck>) {
    match dispatched {
        Ok(ack) => match ack.await {
            Ok(_) => println!("{}", "OK".green()),
            Err(e) => eprintln!("{} {}", "failed to save:".red(), e),
        },
        Err(e) => eprintln!("{} {}", "Error:".red(), e),
    }
}

fn print_slides(store: &StateStore) {
    let slides = store.slides();
    if slides.is_empty() {
        println!("{}", "(no slides)".dimmed());
        return;
    }

    for slide in slides.iter() {
        println!("{} {}", "slide".yellow(), slide.id.bold());
        for element in store.elements_of(&slide.id) {
            println!("  {}", describe(&element));
        }
    }
}

fn describe(element: &SlideElement) -> String {
    let (x, y) = element.position();
    let (w, h) = element.size();
    let detail = match element {
        SlideElement::Text(text) => format!("{:?}", text.text),
        SlideElement::Image(image) => image.url.clone(),
    };
    format!(
        "{} {} @({}, {}) {}x{} {}",
        element.kind().dimmed(),
        element.id(),
        x,
        y,
        w,
        h,
        detail
    )
}

/// Print a line whenever the room changes underneath the prompt
async fn watch_changes(store: Arc<StateStore>) {
    let mut changes = store.subscribe();
    loop {
        let field = match changes.recv().await {
            Ok(field) => field,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "Change notifications lagged");
                continue;
            }
            Err(RecvError::Closed) => return,
        };

        let line = match field {
            StoreField::Slides => format!("slides: {}", store.slides().len()),
            StoreField::Elements => continue,
            StoreField::Participants => {
                let names: Vec<String> = store
                    .participants()
                    .iter()
                    .map(|p| format!("{}({})", p.name, p.role))
                    .collect();
                format!("users: {}", names.join(", "))
            }
            StoreField::CurrentRole => format!("your role is now {}", store.current_role()),
            StoreField::Connected if store.is_connected() => "connected".to_string(),
            StoreField::Connected => "connection lost, retrying".to_string(),
        };
        println!("{} {}", "*".blue(), line.blue());
    }
}
