//! Session participants and their display colours.

pub mod color;
pub mod model;

pub use color::{CURSOR_PALETTE, pick_cursor_color};
pub use model::{Participant, ParticipantRole};
