//! Collaboration engine configuration.

use serde::{Deserialize, Serialize};

/// Limits and timings of the real-time collaboration engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollabConfig {
    /// Hard cap on concurrent connections per session (cluster-wide).
    #[serde(default = "default_max_connections_per_session")]
    pub max_connections_per_session: u32,
    /// How long a disconnected host may come back before the session is torn down.
    #[serde(default = "default_host_grace")]
    pub host_grace_seconds: u64,
    /// Capacity of each connection's outbound queue.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Largest accepted inbound frame, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Upper bound on the number of pages in a draft.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Maximum title length, in characters.
    #[serde(default = "default_max_title_chars")]
    pub max_title_chars: usize,
    /// Lifetime of a freshly created session, in hours.
    #[serde(default = "default_session_duration")]
    pub session_duration_hours: i64,
    /// Maximum number of distinct participants admitted through the lobby.
    #[serde(default = "default_max_participants")]
    pub max_participants: u32,
    /// Text edits between two auto-save checkpoints.
    #[serde(default = "default_autosave_every")]
    pub autosave_every_operations: u32,
    /// Seconds between two auto-save checkpoints.
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_seconds: i64,
}

impl CollabConfig {
    /// Host reconnection grace window.
    pub fn host_grace(&self) -> chrono::Duration {
        let seconds = i64::try_from(self.host_grace_seconds).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(seconds).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            max_connections_per_session: default_max_connections_per_session(),
            host_grace_seconds: default_host_grace(),
            outbound_buffer: default_outbound_buffer(),
            max_message_bytes: default_max_message_bytes(),
            max_pages: default_max_pages(),
            max_title_chars: default_max_title_chars(),
            session_duration_hours: default_session_duration(),
            max_participants: default_max_participants(),
            autosave_every_operations: default_autosave_every(),
            autosave_interval_seconds: default_autosave_interval(),
        }
    }
}

fn default_max_connections_per_session() -> u32 {
    10
}

fn default_host_grace() -> u64 {
    300
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_max_message_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_max_pages() -> usize {
    200
}

fn default_max_title_chars() -> usize {
    200
}

fn default_session_duration() -> i64 {
    24
}

fn default_max_participants() -> u32 {
    10
}

fn default_autosave_every() -> u32 {
    10
}

fn default_autosave_interval() -> i64 {
    30
}
