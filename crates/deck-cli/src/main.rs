//! Deck CLI Client
//!
//! Terminal client for Deck collaborative presentations.
//!
//! # Usage
//!
//! ```bash
//! # Remember who you are
//! deck login alice
//!
//! # Browse presentations
//! deck list
//!
//! # Join a room and edit live
//! deck room 8f2c1e
//!
//! # Against a remote server, without negotiation
//! deck --server https://deck.example --skip-negotiation room 8f2c1e
//! ```

mod config;
mod repl;
mod room;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use deck_core::IdentityProvider;
use deck_snapshot::{HttpSnapshotFetcher, SnapshotFetcher};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{FileConfig, Overrides, Settings};

/// Deck Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "deck")]
#[command(author, version, about = "Deck CLI - collaborative presentations from the terminal")]
struct Args {
    /// Server base URL (REST API and hub)
    #[arg(short, long, env = "DECK_SERVER")]
    server: Option<String>,

    /// Hub path below the server URL
    #[arg(long, env = "DECK_HUB_PATH")]
    hub_path: Option<String>,

    /// Display name to join with (overrides the stored login)
    #[arg(short, long, env = "DECK_USER")]
    user: Option<String>,

    /// Identity file used by login/logout
    #[arg(long, env = "DECK_IDENTITY")]
    identity_file: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "DECK_CONFIG")]
    config: Option<PathBuf>,

    /// Connect to the hub socket directly, without negotiation
    #[arg(long)]
    skip_negotiation: bool,

    /// Do not re-join and re-fetch after the link resumes
    #[arg(long)]
    no_resync: bool,

    /// Log level (trace, debug, info, warn, error) or a filter directive
    #[arg(long, env = "DECK_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a display name for joining rooms
    Login { name: String },
    /// Forget the stored display name
    Logout,
    /// Show the display name rooms will be joined with
    Whoami,
    /// List presentations on the server
    List,
    /// Join a presentation room
    Room { id: String },
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            server: self.server.clone(),
            hub_path: self.hub_path.clone(),
            user: self.user.clone(),
            identity_file: self.identity_file.clone(),
            skip_negotiation: self.skip_negotiation,
            no_resync: self.no_resync,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file = FileConfig::discover(args.config.as_deref())?;
    let settings = Settings::resolve(file, args.overrides());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    info!(server = %settings.server, hub = %settings.hub_url(), "Starting deck");

    match args.command {
        Command::Login { name } => {
            let user = settings.identity_store().set(&name)?;
            println!("{} {}", "Logged in as".green(), user.name.bold());
        }
        Command::Logout => {
            settings.identity_store().clear()?;
            println!("{}", "Logged out.".green());
        }
        Command::Whoami => match settings.identity().display_name() {
            Some(name) => println!("{}", name),
            None => println!("{}", "(anonymous)".dimmed()),
        },
        Command::List => list(&settings).await?,
        Command::Room { id } => room::run(&settings, &id).await?,
    }

    Ok(())
}

async fn list(settings: &Settings) -> Result<()> {
    let fetcher = HttpSnapshotFetcher::new(&settings.server);
    let presentations = fetcher
        .get_all()
        .await
        .with_context(|| format!("Failed to list presentations from {}", settings.server))?;

    if presentations.is_empty() {
        println!("{}", "(no presentations)".dimmed());
        return Ok(());
    }

    for presentation in presentations {
        println!(
            "{}  {}  {} {}  {}",
            presentation.id.as_str().yellow(),
            presentation.title.bold(),
            "by".dimmed(),
            presentation.creator_name,
            format!("{} slides", presentation.slides.len()).dimmed()
        );
    }
    Ok(())
}
