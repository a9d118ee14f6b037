//! Cross-process relay of broadcast frames.

pub mod redis_pubsub;

pub use redis_pubsub::RedisPubSubBridge;
