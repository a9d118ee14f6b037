//! Participant presence: roster, page viewers and page occupancy.

pub mod roster;

pub use roster::{PageViewer, ParticipantSummary, occupants, page_viewers, roster};
