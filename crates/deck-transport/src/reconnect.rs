//! Automatic reconnect schedule

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delays between reconnect attempts
///
/// Attempt `n` waits `delays[n]`; once the list is exhausted the
/// transport gives up and reports the connection closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay before each attempt, in milliseconds
    pub delays_ms: Vec<u64>,
}

impl ReconnectPolicy {
    pub fn new(delays: &[Duration]) -> Self {
        Self {
            delays_ms: delays.iter().map(|d| d.as_millis() as u64).collect(),
        }
    }

    /// Never reconnect
    pub fn disabled() -> Self {
        Self { delays_ms: Vec::new() }
    }

    /// Delay before attempt `attempt` (zero-based), or `None` to give up
    pub fn next_delay(&self, attempt: usize) -> Option<Duration> {
        self.delays_ms
            .get(attempt)
            .map(|ms| Duration::from_millis(*ms))
    }

    pub fn max_attempts(&self) -> usize {
        self.delays_ms.len()
    }

    pub fn is_enabled(&self) -> bool {
        !self.delays_ms.is_empty()
    }
}

impl Default for ReconnectPolicy {
    /// 0s, 2s, 10s, 30s, then give up
    fn default() -> Self {
        Self {
            delays_ms: vec![0, 2_000, 10_000, 30_000],
        }
    }
}
