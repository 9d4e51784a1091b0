//! Engine configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Re-run join and snapshot after the transport resumes a dropped link
    pub resync_on_reconnect: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resync_on_reconnect: true,
        }
    }
}
