//! Core type definitions used across the StoryHub workspace.

pub mod id;

pub use id::*;
