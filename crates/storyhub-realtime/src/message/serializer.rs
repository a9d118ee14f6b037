//! JSON serialization for WebSocket messages.

use serde::Deserialize;
use serde_json::Value;

use super::types::{InboundMessage, OutboundMessage};

/// Serialize an outbound message
pub fn serialize_outbound(msg: &OutboundMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Deserialize an inbound frame, keeping the raw JSON for the operation log.
pub fn deserialize_inbound(text: &str) -> Result<(InboundMessage, Value), serde_json::Error> {
    let raw: Value = serde_json::from_str(text)?;
    let msg = InboundMessage::deserialize(&raw)?;
    Ok((msg, raw))
}
