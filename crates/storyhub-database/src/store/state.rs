//! In-transaction view of one session.

use chrono::{DateTime, Utc};

use storyhub_core::types::id::UserId;
use storyhub_entity::operation::{NewOperation, Operation};
use storyhub_entity::participant::Participant;
use storyhub_entity::session::CollabSession;
use storyhub_entity::story::Story;

/// Everything a unit of work may read or change for one session.
///
/// Built by [`SessionStore::transact`](super::SessionStore::transact)
/// while the session is locked; written back only when the closure
/// returns `Ok`.
#[derive(Debug)]
pub struct SessionState {
    /// Session row.
    pub session: CollabSession,
    /// Every membership row, active or not.
    pub participants: Vec<Participant>,
    pending_operations: Vec<Operation>,
    pending_story: Option<Story>,
    now: DateTime<Utc>,
}

impl SessionState {
    pub(crate) fn new(
        session: CollabSession,
        participants: Vec<Participant>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session,
            participants,
            pending_operations: Vec::new(),
            pending_story: None,
            now,
        }
    }

    /// Clock reading taken when the lock was acquired.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn participant(&self, user: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user)
    }

    pub fn participant_mut(&mut self, user: UserId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.user_id == user)
    }

    /// Inserts a membership row, or replaces the row for the same user.
    pub fn upsert_participant(&mut self, participant: Participant) {
        match self.participant_mut(participant.user_id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
    }

    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_active)
    }

    /// Appends to the operation log and returns the assigned sequence number.
    pub fn append_operation(&mut self, op: NewOperation) -> i64 {
        let sequence = self.session.next_sequence;
        self.session.next_sequence += 1;
        self.pending_operations
            .push(op.commit(self.session.id, sequence, self.now));
        sequence
    }

    /// Operations appended in this unit of work.
    pub fn pending_operations(&self) -> &[Operation] {
        &self.pending_operations
    }

    /// Queues a finalized story for insertion with the session write.
    pub fn publish_story(&mut self, story: Story) {
        self.pending_story = Some(story);
    }

    pub(crate) fn into_parts(
        mut self,
    ) -> (CollabSession, Vec<Participant>, Vec<Operation>, Option<Story>) {
        self.session.updated_at = self.now;
        (
            self.session,
            self.participants,
            self.pending_operations,
            self.pending_story,
        )
    }
}
