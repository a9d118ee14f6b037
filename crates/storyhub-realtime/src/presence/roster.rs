//! Who is connected and which page each participant is looking at.

use std::collections::BTreeMap;

use serde::Serialize;

use storyhub_core::types::id::UserId;
use storyhub_entity::participant::{Participant, ParticipantRole};

/// Public view of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantSummary {
    pub user_id: UserId,
    pub username: String,
    pub cursor_color: String,
    pub role: ParticipantRole,
}

impl From<&Participant> for ParticipantSummary {
    fn from(p: &Participant) -> Self {
        Self {
            user_id: p.user_id,
            username: p.username.clone(),
            cursor_color: p.cursor_color.clone(),
            role: p.role,
        }
    }
}

/// Entry of a `page_viewers_response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageViewer {
    pub user_id: UserId,
    pub username: String,
    pub cursor_color: String,
}

/// Active participants in join order.
pub fn roster(participants: &[Participant]) -> Vec<ParticipantSummary> {
    participants
        .iter()
        .filter(|p| p.is_active)
        .map(ParticipantSummary::from)
        .collect()
}

/// Groups active participants by the page they last navigated to.
///
/// A participant who never navigated is listed on page 0.
pub fn page_viewers(participants: &[Participant]) -> BTreeMap<u32, Vec<PageViewer>> {
    let mut pages: BTreeMap<u32, Vec<PageViewer>> = BTreeMap::new();
    for p in participants.iter().filter(|p| p.is_active) {
        let page = p
            .current_page
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);
        pages.entry(page).or_default().push(PageViewer {
            user_id: p.user_id,
            username: p.username.clone(),
            cursor_color: p.cursor_color.clone(),
        });
    }
    pages
}

/// Active participants other than `requester` whose latest navigation is `page`.
///
/// Participants who never navigated do not count as occupying any page.
pub fn occupants(participants: &[Participant], page: usize, requester: UserId) -> Vec<&Participant> {
    participants
        .iter()
        .filter(|p| p.is_active && p.user_id != requester)
        .filter(|p| {
            p.current_page
                .and_then(|n| usize::try_from(n).ok())
                .is_some_and(|n| n == page)
        })
        .collect()
}
