//! Durable story produced by finalizing a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use storyhub_core::types::id::{SessionId, StoryId, UserId};

use crate::session::{CanvasTarget, CollabSession};

/// Title used when a session is finalized without one.
pub const UNTITLED_STORY: &str = "Untitled Collaborative Story";

/// One page of a published story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryPage {
    /// Page id carried over from the draft.
    pub id: String,
    /// Page text.
    pub text: String,
    /// Canvas payload for the page, if any was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<Value>,
}

/// Permanent story record. Created unpublished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub session_id: SessionId,
    pub title: String,
    pub pages: Vec<StoryPage>,
    pub cover_image: Option<Value>,
    pub author_id: UserId,
    pub co_author_ids: Vec<UserId>,
    pub genres: Vec<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Story {
    /// Copies the session's draft and canvas into a story authored by the
    /// host, with `co_authors` attached (the host is never listed twice).
    pub fn from_session(
        session: &CollabSession,
        title: Option<&str>,
        genres: Vec<String>,
        co_authors: impl IntoIterator<Item = UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or_else(|| Some(session.draft.title.trim()).filter(|t| !t.is_empty()))
            .unwrap_or(UNTITLED_STORY)
            .to_string();

        let pages = session
            .draft
            .pages
            .iter()
            .enumerate()
            .map(|(index, page)| {
                let canvas = session
                    .canvas
                    .authoritative(&CanvasTarget::Page(page.id.clone()))
                    .or_else(|| {
                        session
                            .canvas
                            .authoritative(&CanvasTarget::Page(index.to_string()))
                    })
                    .cloned();
                StoryPage {
                    id: page.id.clone(),
                    text: page.text.clone(),
                    canvas,
                }
            })
            .collect();

        let mut co_author_ids: Vec<UserId> = co_authors
            .into_iter()
            .filter(|id| *id != session.host_id)
            .collect();
        co_author_ids.sort();
        co_author_ids.dedup();

        Self {
            id: StoryId::new(),
            session_id: session.id,
            title,
            pages,
            cover_image: session.canvas.authoritative(&CanvasTarget::Cover).cloned(),
            author_id: session.host_id,
            co_author_ids,
            genres,
            is_published: false,
            created_at: now,
        }
    }
}
