//! Session lifecycle: admission guard, lobby operations and termination.

pub mod guard;
pub mod lobby;
pub mod terminator;

pub use guard::{GuardPolicy, Verdict};
pub use lobby::SessionSeed;
