//! Client configuration: TOML file, overridden by flags and environment

use anyhow::{Context, Result};
use deck_core::{FileIdentity, IdentityProvider, StaticIdentity};
use deck_sync::EngineConfig;
use deck_transport::{HubConfig, ReconnectPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_SERVER: &str = "http://localhost:5000";
pub const DEFAULT_HUB_PATH: &str = "/hubs/presentation";
pub const IDENTITY_FILE_NAME: &str = ".deck_user.json";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: Option<String>,
    pub hub_path: Option<String>,
    pub user: Option<String>,
    pub identity_file: Option<PathBuf>,
    pub skip_negotiation: Option<bool>,
    pub resync_on_reconnect: Option<bool>,
    pub reconnect_delays_ms: Option<Vec<u64>>,
    pub log_level: Option<String>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("In {}", path.display()))
    }

    /// Load an explicit path, or the default location if it exists
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub hub_path: Option<String>,
    pub user: Option<String>,
    pub identity_file: Option<PathBuf>,
    pub skip_negotiation: bool,
    pub no_resync: bool,
    pub log_level: Option<String>,
}

/// Effective settings after merging defaults, file and overrides
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: String,
    pub hub_path: String,
    pub user: Option<String>,
    pub identity_file: PathBuf,
    pub skip_negotiation: bool,
    pub reconnect: ReconnectPolicy,
    pub engine: EngineConfig,
    pub log_level: String,
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Self {
        let engine = EngineConfig {
            resync_on_reconnect: !overrides.no_resync
                && file
                    .resync_on_reconnect
                    .unwrap_or(EngineConfig::default().resync_on_reconnect),
        };
        let reconnect = file
            .reconnect_delays_ms
            .map(|delays_ms| ReconnectPolicy { delays_ms })
            .unwrap_or_default();

        Self {
            server: overrides
                .server
                .or(file.server)
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            hub_path: overrides
                .hub_path
                .or(file.hub_path)
                .unwrap_or_else(|| DEFAULT_HUB_PATH.to_string()),
            user: overrides.user.or(file.user),
            identity_file: overrides
                .identity_file
                .or(file.identity_file)
                .unwrap_or_else(default_identity_path),
            skip_negotiation: overrides.skip_negotiation || file.skip_negotiation.unwrap_or(false),
            reconnect,
            engine,
            log_level: overrides
                .log_level
                .or(file.log_level)
                .unwrap_or_else(|| "warn".to_string()),
        }
    }

    /// Base URL with the hub path appended
    pub fn hub_url(&self) -> String {
        format!(
            "{}/{}",
            self.server.trim_end_matches('/'),
            self.hub_path.trim_start_matches('/')
        )
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig::new(self.hub_url())
            .with_skip_negotiation(self.skip_negotiation)
            .with_reconnect(self.reconnect.clone())
    }

    pub fn identity_store(&self) -> FileIdentity {
        FileIdentity::load(&self.identity_file)
    }

    /// Explicit user name if configured, otherwise the stored identity
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        match &self.user {
            Some(name) => Arc::new(StaticIdentity::named(name.clone())),
            None => Arc::new(self.identity_store()),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("deck").join("config.toml"))
}

pub fn default_identity_path() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_default()
        .join(IDENTITY_FILE_NAME)
}
