//! # storyhub-database
//!
//! Persistence for collaborative sessions. [`SessionStore`] hides whether
//! state lives in process memory or in PostgreSQL; both backends serialize
//! read-modify-write cycles per session through
//! [`SessionStore::transact`].

pub mod connection;
pub mod migration;
pub mod store;

pub use connection::DatabasePool;
pub use store::{SessionState, SessionStore, UserSessions, normalize_join_code};
