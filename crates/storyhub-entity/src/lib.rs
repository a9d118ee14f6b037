//! # storyhub-entity
//!
//! Domain models for StoryHub. Every struct in this crate is either a
//! database row or a value object stored inside one. State transitions
//! that must hold regardless of storage backend (page growth, vote tally,
//! auto-save bookkeeping) live on the models themselves.

pub mod operation;
pub mod participant;
pub mod session;
pub mod story;
