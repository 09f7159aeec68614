//! `/health` endpoint: whether the relay still admits sessions.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Relay node health as reported by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` while upgrades are admitted, `"saturated"` at the session limit.
    pub status: String,
    /// Seconds since the node started.
    pub uptime_secs: u64,
    /// Live relay sessions.
    pub connections: usize,
    /// Session limit.
    pub max_connections: usize,
    /// Sessions that can still be admitted.
    pub available: usize,
}

impl HealthResponse {
    /// Whether a new `/ws` upgrade would be admitted right now.
    pub fn is_accepting(&self) -> bool {
        self.available > 0
    }
}

/// Snapshot the relay's session counters.
pub fn health_check(start_time: Instant, connections: usize, max_connections: usize) -> HealthResponse {
    let available = max_connections.saturating_sub(connections);
    HealthResponse {
        status: if available > 0 { "ok" } else { "saturated" }.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        max_connections,
        available,
    }
}
