//! Finalized stories.

pub mod model;

pub use model::{Story, StoryPage, UNTITLED_STORY};
