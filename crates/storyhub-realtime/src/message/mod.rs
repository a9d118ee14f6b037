//! Wire protocol: message types, validation and JSON encoding.

pub mod serializer;
pub mod types;
pub mod validator;

pub use types::{InboundMessage, OutboundMessage, VoteSummary};
pub use validator::MessageLimits;
