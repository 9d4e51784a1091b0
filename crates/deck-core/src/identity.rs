//! Local user identity

use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Display name used when no identity is set
pub const ANONYMOUS: &str = "anonymous";

/// Supplies the local user's display name
pub trait IdentityProvider: Send + Sync {
    /// Current display name, if the user has one
    fn display_name(&self) -> Option<String>;

    /// Display name, falling back to [`ANONYMOUS`]
    fn name_or_anonymous(&self) -> String {
        self.display_name().unwrap_or_else(|| ANONYMOUS.to_string())
    }
}

/// Fixed identity, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    pub fn named(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn display_name(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Stored user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
}

/// Identity persisted as a small JSON file
pub struct FileIdentity {
    path: PathBuf,
    user: RwLock<Option<User>>,
}

impl FileIdentity {
    /// Load the identity at `path`.
    ///
    /// A missing file means no identity. A malformed file is removed and
    /// also treated as no identity.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let user = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<User>(&bytes) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding malformed identity file");
                    let _ = std::fs::remove_file(&path);
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            path,
            user: RwLock::new(user),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.read().is_some()
    }

    /// Store a new identity; the name is trimmed and must not be empty
    pub fn set(&self, name: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Identity("Name cannot be empty".into()));
        }

        let user = User { name: name.to_string() };
        let bytes = serde_json::to_vec(&user)?;
        std::fs::write(&self.path, bytes)
            .map_err(|e| Error::Identity(format!("{}: {}", self.path.display(), e)))?;

        *self.user.write() = Some(user.clone());
        Ok(user)
    }

    /// Forget the identity and delete the file
    pub fn clear(&self) -> Result<()> {
        *self.user.write() = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Identity(format!("{}: {}", self.path.display(), e))),
        }
    }
}

impl IdentityProvider for FileIdentity {
    fn display_name(&self) -> Option<String> {
        self.user.read().as_ref().map(|u| u.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity_fallback() {
        assert_eq!(StaticIdentity::named("alice").name_or_anonymous(), "alice");
        assert_eq!(StaticIdentity::anonymous().name_or_anonymous(), ANONYMOUS);
    }

    #[test]
    fn test_file_identity_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.json");

        let identity = FileIdentity::load(&path);
        assert!(!identity.is_logged_in());

        identity.set("  alice ").unwrap();
        assert_eq!(identity.display_name().as_deref(), Some("alice"));

        let reloaded = FileIdentity::load(&path);
        assert_eq!(reloaded.user(), Some(User { name: "alice".into() }));

        reloaded.clear().unwrap();
        assert!(!path.exists());
        assert!(reloaded.display_name().is_none());
    }

    #[test]
    fn test_malformed_identity_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.json");
        std::fs::write(&path, b"{not json").unwrap();

        let identity = FileIdentity::load(&path);

        assert!(identity.display_name().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let identity = FileIdentity::load(dir.path().join("user.json"));
        assert!(identity.set("   ").is_err());
    }
}
