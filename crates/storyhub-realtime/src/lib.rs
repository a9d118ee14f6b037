//! # storyhub-realtime
//!
//! Real-time collaboration engine for StoryHub. Provides:
//!
//! - WebSocket admission with JWT authentication and a cluster-wide connection cap
//! - One fan-out group per session with bounded, non-blocking delivery
//! - Authoritative draft and page editing with a sequenced operation log
//! - Participant presence, cursor colours and page viewers
//! - The finalize-and-publish vote
//! - Host reconnection grace and session teardown
//! - Multi-process relay via an optional Redis pub/sub bridge

pub mod bridge;
pub mod channel;
pub mod collab;
pub mod connection;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod server;
pub mod session_control;

pub use channel::{Audience, Broadcaster, ChannelRegistry};
pub use connection::{AuthenticatedUser, CloseReason, ConnectionHandle, WsAuthenticator};
pub use metrics::MetricsSnapshot;
pub use server::CollabEngine;
pub use session_control::SessionSeed;
