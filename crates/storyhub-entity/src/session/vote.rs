//! Finalize-and-publish vote state machine.
//!
//! `Idle → Voting → {Passed, Failed}`. A failed vote drops straight back to
//! `Idle`; a passed vote stays `Passed` until the story is finalized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::types::id::UserId;

/// Phase of the vote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatus {
    /// No vote running.
    #[default]
    Idle,
    /// Ballots are being collected.
    Voting,
    /// Everybody agreed; waiting for the initiator to finalize.
    Passed,
}

/// Result of casting one ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Not everybody has voted yet.
    Pending,
    /// All required ballots are in and all are yes.
    Approved,
    /// All required ballots are in and at least one is no. State is reset.
    Failed,
}

/// Ballots and counters observed right after a cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    /// Ballots as they stood when the last one was cast.
    pub votes: BTreeMap<UserId, bool>,
    /// Yes ballots.
    pub yes: u32,
    /// No ballots.
    pub no: u32,
    /// Ballots needed to close the vote.
    pub required: u32,
    /// Round the ballots belong to.
    pub round: u64,
    /// Resulting transition.
    pub outcome: VoteOutcome,
}

/// Persistent vote state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteState {
    /// Current phase.
    #[serde(default)]
    pub status: VoteStatus,
    /// Who started the current round.
    #[serde(default)]
    pub initiator: Option<UserId>,
    /// Active participants captured when the round started.
    #[serde(default)]
    pub required: u32,
    /// One ballot per participant; recasting overwrites.
    #[serde(default)]
    pub votes: BTreeMap<UserId, bool>,
    /// Monotonic round counter.
    #[serde(default)]
    pub round: u64,
}

impl VoteState {
    /// Opens a new round with an empty ballot box.
    pub fn start(&mut self, initiator: UserId, required: u32) -> AppResult<()> {
        if self.status != VoteStatus::Idle {
            return Err(AppError::conflict("A vote is already in progress"));
        }
        if required == 0 {
            return Err(AppError::validation("No active participants to vote"));
        }
        self.status = VoteStatus::Voting;
        self.initiator = Some(initiator);
        self.required = required;
        self.votes.clear();
        self.round += 1;
        Ok(())
    }

    /// Records a ballot and closes the round once enough are in.
    pub fn cast(&mut self, voter: UserId, vote: bool) -> AppResult<VoteTally> {
        if self.status != VoteStatus::Voting {
            return Err(AppError::conflict("No vote is in progress"));
        }
        self.votes.insert(voter, vote);

        let yes = self.votes.values().filter(|v| **v).count() as u32;
        let no = self.votes.len() as u32 - yes;
        let complete = self.votes.len() as u32 >= self.required;
        let outcome = match (complete, no) {
            (false, _) => VoteOutcome::Pending,
            (true, 0) => VoteOutcome::Approved,
            (true, _) => VoteOutcome::Failed,
        };

        let tally = VoteTally {
            votes: self.votes.clone(),
            yes,
            no,
            required: self.required,
            round: self.round,
            outcome,
        };

        match outcome {
            VoteOutcome::Approved => self.status = VoteStatus::Passed,
            VoteOutcome::Failed => self.reset(),
            VoteOutcome::Pending => {}
        }
        Ok(tally)
    }

    /// Closes a running round as failed when `departed` leaves without voting.
    ///
    /// The round was sized to include them, so it could never complete.
    /// Returns the final tally, or `None` when the round is unaffected.
    pub fn abandon(&mut self, departed: UserId) -> Option<VoteTally> {
        if self.status != VoteStatus::Voting || self.votes.contains_key(&departed) {
            return None;
        }
        let yes = self.votes.values().filter(|v| **v).count() as u32;
        let tally = VoteTally {
            votes: self.votes.clone(),
            yes,
            no: self.votes.len() as u32 - yes,
            required: self.required,
            round: self.round,
            outcome: VoteOutcome::Failed,
        };
        self.reset();
        Some(tally)
    }

    /// Back to `Idle` with an empty ballot box.
    pub fn reset(&mut self) {
        self.status = VoteStatus::Idle;
        self.initiator = None;
        self.required = 0;
        self.votes.clear();
    }
}
