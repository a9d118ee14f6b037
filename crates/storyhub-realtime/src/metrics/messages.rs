//! Message metrics helpers.

use std::sync::atomic::Ordering;

use super::EngineMetrics;

/// Record a frame queued to a client
pub fn record_sent(metrics: &EngineMetrics) {
    metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
}

/// Record a frame received from a client
pub fn record_received(metrics: &EngineMetrics) {
    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
}

/// Record a frame answered with a private error
pub fn record_rejected(metrics: &EngineMetrics) {
    metrics.messages_rejected.fetch_add(1, Ordering::Relaxed);
}

/// Record a peer dropped for overflowing its queue
pub fn record_dropped_peer(metrics: &EngineMetrics) {
    metrics.peers_dropped.fetch_add(1, Ordering::Relaxed);
}

/// Record a session finalized into a story
pub fn record_finalized(metrics: &EngineMetrics) {
    metrics.stories_finalized.fetch_add(1, Ordering::Relaxed);
}
