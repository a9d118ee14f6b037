//! Collaborative session aggregate and the value objects stored inside it.

pub mod autosave;
pub mod canvas;
pub mod draft;
pub mod model;
pub mod vote;

pub use autosave::AutosaveState;
pub use canvas::{CanvasData, CanvasLayers, CanvasTarget};
pub use draft::{DEFAULT_DRAFT_TITLE, DraftPage, StoryDraft};
pub use model::{CollabSession, NewSession};
pub use vote::{VoteOutcome, VoteState, VoteStatus, VoteTally};
