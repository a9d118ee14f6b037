//! Per-session broadcast groups.

pub mod broadcast;
pub mod registry;

pub use broadcast::{Audience, Broadcaster};
pub use registry::ChannelRegistry;
