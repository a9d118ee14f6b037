//! Voting coordinator: initiate, cast and finalize.

use tracing::info;

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::types::id::SessionId;
use storyhub_entity::session::{VoteOutcome, VoteStatus, VoteTally};
use storyhub_entity::story::Story;

use crate::channel::Audience;
use crate::connection::ConnectionHandle;
use crate::message::types::OutboundMessage;
use crate::metrics::messages;
use crate::server::CollabEngine;
use crate::session_control::terminator;

use super::require_member;

impl CollabEngine {
    /// Opens a round sized to the participants active right now.
    pub(crate) async fn on_initiate_vote(&self, conn: &ConnectionHandle) -> AppResult<()> {
        let user = conn.user_id;

        let (required, round) = self
            .store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                let required = u32::try_from(state.active_participants().count())
                    .map_err(|_| AppError::internal("Participant count overflow"))?;
                state.session.vote.start(user, required)?;
                Ok((required, state.session.vote.round))
            })
            .await?;

        info!(session_id = %conn.session_id, initiated_by = %user, required, round, "Vote initiated");
        self.broadcaster.broadcast(
            conn.session_id,
            Audience::All,
            &OutboundMessage::VoteInitiated {
                initiated_by: user,
                username: conn.username.clone(),
                required_votes: required,
                round,
            },
        );
        Ok(())
    }

    /// Records one ballot and announces the outcome once the round closes.
    pub(crate) async fn on_vote_save(&self, conn: &ConnectionHandle, vote: bool) -> AppResult<()> {
        let user = conn.user_id;

        let (tally, initiator) = self
            .store
            .transact(conn.session_id, move |state| {
                require_member(state, user)?;
                let initiator = state.session.vote.initiator;
                let tally = state.session.vote.cast(user, vote)?;
                Ok((tally, initiator))
            })
            .await?;

        let session_id = conn.session_id;
        self.broadcaster.broadcast(
            session_id,
            Audience::All,
            &OutboundMessage::VoteUpdate {
                user_id: user,
                vote,
                votes: tally.votes.clone(),
                yes_votes: tally.yes,
                no_votes: tally.no,
                required_votes: tally.required,
            },
        );

        match tally.outcome {
            VoteOutcome::Pending => {}
            VoteOutcome::Approved => {
                info!(session_id = %session_id, round = tally.round, "Vote approved");
                self.broadcaster.broadcast(
                    session_id,
                    Audience::All,
                    &OutboundMessage::VoteResult {
                        approved: true,
                        initiated_by: initiator,
                        yes_votes: tally.yes,
                        required_votes: tally.required,
                    },
                );
            }
            VoteOutcome::Failed => {
                info!(session_id = %session_id, round = tally.round, no = tally.no, "Vote failed");
                self.broadcaster.broadcast(
                    session_id,
                    Audience::All,
                    &OutboundMessage::VoteFailed {
                        yes_votes: tally.yes,
                        no_votes: tally.no,
                        required_votes: tally.required,
                    },
                );
            }
        }
        Ok(())
    }

    /// Announces a round closed because a voter left before casting.
    pub(crate) fn announce_abandoned_vote(&self, session_id: SessionId, tally: &VoteTally) {
        info!(session_id = %session_id, round = tally.round, yes = tally.yes, "Vote abandoned");
        self.broadcaster.broadcast(
            session_id,
            Audience::All,
            &OutboundMessage::VoteFailed {
                yes_votes: tally.yes,
                no_votes: tally.no,
                required_votes: tally.required,
            },
        );
    }

    /// Turns a passed vote into an unpublished story and ends the session.
    ///
    /// Only the initiator may finalize; the host may step in once the
    /// initiator is no longer active.
    pub(crate) async fn on_finalize(
        &self,
        conn: &ConnectionHandle,
        title: Option<String>,
        genres: Vec<String>,
    ) -> AppResult<()> {
        let user = conn.user_id;
        let genres: Vec<String> = genres
            .into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        let story = self
            .store
            .transact(conn.session_id, move |state| {
                state.session.ensure_active()?;
                let vote = &state.session.vote;
                if vote.status != VoteStatus::Passed {
                    return Err(AppError::conflict("The vote has not passed"));
                }
                let initiator_active = vote
                    .initiator
                    .and_then(|id| state.participant(id))
                    .is_some_and(|p| p.is_active);
                let allowed = vote.initiator == Some(user)
                    || (state.session.is_host(user) && !initiator_active);
                if !allowed {
                    return Err(AppError::authorization(
                        "Only the vote initiator can finalize the story",
                    ));
                }

                let co_authors: Vec<_> = state.active_participants().map(|p| p.user_id).collect();
                let story = Story::from_session(
                    &state.session,
                    title.as_deref(),
                    genres,
                    co_authors,
                    state.now(),
                );
                state.publish_story(story.clone());
                state.session.deactivate();
                Ok(story)
            })
            .await?;

        messages::record_finalized(&self.metrics);
        info!(
            session_id = %conn.session_id,
            story_id = %story.id,
            co_authors = story.co_author_ids.len(),
            "Story finalized"
        );

        self.broadcaster.broadcast(
            conn.session_id,
            Audience::All,
            &OutboundMessage::StoryFinalized {
                story_id: story.id,
                title: story.title.clone(),
                finalized_by: user,
            },
        );
        terminator::end_session(&self.broadcaster, conn.session_id, story.title, "vote");
        Ok(())
    }
}
