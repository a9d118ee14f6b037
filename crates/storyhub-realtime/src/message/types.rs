//! Inbound and outbound WebSocket message type definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use storyhub_core::types::id::{SessionId, StoryId, UserId};
use storyhub_entity::session::{CanvasData, StoryDraft, VoteState, VoteStatus};

use crate::presence::{PageViewer, ParticipantSummary};

/// Messages sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Freehand stroke, optionally with a fresh rendered snapshot.
    Draw {
        data: Value,
        page_id: Option<Value>,
        page_index: Option<i64>,
        #[serde(default)]
        is_cover_image: bool,
        canvas_snapshot: Option<Value>,
    },
    /// Pointer position.
    Cursor {
        position: Value,
        page_id: Option<Value>,
        page_index: Option<i64>,
        #[serde(default)]
        is_cover_image: bool,
    },
    /// Clear a canvas.
    Clear {
        page_id: Option<Value>,
        page_index: Option<i64>,
        #[serde(default)]
        is_cover_image: bool,
    },
    Transform {
        data: Value,
    },
    Delete {
        data: Value,
    },
    /// Replace the text of one page.
    TextEdit {
        page_index: Option<i64>,
        page_id: Option<Value>,
        text: String,
    },
    TextEditAdvanced {
        data: Value,
    },
    /// Navigate to a page.
    PageChange {
        page_number: i64,
    },
    /// Cursor, tool or activity update.
    PresenceUpdate {
        cursor_position: Option<Value>,
        current_tool: Option<String>,
        activity: Option<Value>,
    },
    TitleEdit {
        title: String,
    },
    /// Host-only removal of a participant.
    KickUser {
        user_id: UserId,
    },
    InitiateVote {},
    VoteSave {
        vote: bool,
    },
    /// Persist the draft as a story after a passed vote.
    FinalizeCollaborativeStory {
        #[serde(default)]
        genres: Vec<String>,
        title: Option<String>,
    },
    /// Insert a page at `page_index`, or append.
    AddPage {
        page_index: Option<i64>,
        page_data: Option<Value>,
    },
    DeletePage {
        page_index: Option<i64>,
        page_id: Option<Value>,
    },
    LayerOperation {
        operation: Value,
        #[serde(default)]
        data: Value,
    },
    TransformOperation {
        data: Value,
    },
    DeleteItem {
        data: Value,
    },
    /// Rendered snapshot of one canvas.
    CanvasSnapshot {
        page_id: Option<Value>,
        page_index: Option<i64>,
        #[serde(default)]
        is_cover_image: bool,
        canvas_data_url: Value,
    },
    /// Ask for the current canvas of a page after (re)joining.
    RequestSync {
        page_id: Option<Value>,
        page_index: Option<i64>,
        #[serde(default)]
        is_cover_image: bool,
    },
    /// Full canvas state, either answering a peer or as an auto-save.
    CanvasState {
        target_user_id: Option<UserId>,
        canvas_data: Value,
        page_id: Option<Value>,
        page_index: Option<i64>,
        #[serde(default)]
        is_cover_image: bool,
    },
    GetPageViewers {},
}

impl InboundMessage {
    /// Wire name of the message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Draw { .. } => "draw",
            Self::Cursor { .. } => "cursor",
            Self::Clear { .. } => "clear",
            Self::Transform { .. } => "transform",
            Self::Delete { .. } => "delete",
            Self::TextEdit { .. } => "text_edit",
            Self::TextEditAdvanced { .. } => "text_edit_advanced",
            Self::PageChange { .. } => "page_change",
            Self::PresenceUpdate { .. } => "presence_update",
            Self::TitleEdit { .. } => "title_edit",
            Self::KickUser { .. } => "kick_user",
            Self::InitiateVote {} => "initiate_vote",
            Self::VoteSave { .. } => "vote_save",
            Self::FinalizeCollaborativeStory { .. } => "finalize_collaborative_story",
            Self::AddPage { .. } => "add_page",
            Self::DeletePage { .. } => "delete_page",
            Self::LayerOperation { .. } => "layer_operation",
            Self::TransformOperation { .. } => "transform_operation",
            Self::DeleteItem { .. } => "delete_item",
            Self::CanvasSnapshot { .. } => "canvas_snapshot",
            Self::RequestSync { .. } => "request_sync",
            Self::CanvasState { .. } => "canvas_state",
            Self::GetPageViewers {} => "get_page_viewers",
        }
    }
}

/// Vote progress as shown to clients.
#[derive(Debug, Clone, Serialize)]
pub struct VoteSummary {
    pub status: VoteStatus,
    pub required_votes: u32,
    pub votes: BTreeMap<UserId, bool>,
    pub initiated_by: Option<UserId>,
}

impl From<&VoteState> for VoteSummary {
    fn from(vote: &VoteState) -> Self {
        Self {
            status: vote.status,
            required_votes: vote.required,
            votes: vote.votes.clone(),
            initiated_by: vote.initiator,
        }
    }
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Full snapshot sent privately right after admission.
    Init {
        session_id: SessionId,
        canvas_data: CanvasData,
        story_draft: StoryDraft,
        participants: Vec<ParticipantSummary>,
        your_color: String,
        current_user_id: UserId,
        current_username: String,
        is_host: bool,
        is_lobby_open: bool,
        current_page: i32,
        vote: VoteSummary,
    },
    /// Private failure reply.
    Error {
        code: String,
        message: String,
    },

    // -- Drawing relays --
    Draw {
        user_id: UserId,
        username: String,
        data: Value,
        page_id: Option<Value>,
        page_index: Option<i64>,
        is_cover_image: bool,
        sequence_number: i64,
    },
    Cursor {
        user_id: UserId,
        username: String,
        cursor_color: String,
        position: Value,
        page_id: Option<Value>,
        page_index: Option<i64>,
        is_cover_image: bool,
    },
    Clear {
        user_id: UserId,
        page_id: Option<Value>,
        page_index: Option<i64>,
        is_cover_image: bool,
        sequence_number: i64,
    },
    Transform {
        user_id: UserId,
        data: Value,
        sequence_number: i64,
    },
    Delete {
        user_id: UserId,
        data: Value,
        sequence_number: i64,
    },
    TextEditAdvanced {
        user_id: UserId,
        data: Value,
        sequence_number: i64,
    },
    LayerOperation {
        user_id: UserId,
        operation: Value,
        data: Value,
        sequence_number: i64,
    },
    TransformOperation {
        user_id: UserId,
        data: Value,
        sequence_number: i64,
    },
    DeleteItem {
        user_id: UserId,
        data: Value,
        sequence_number: i64,
    },

    // -- Draft --
    TextEdit {
        user_id: UserId,
        username: String,
        page_index: usize,
        page_id: String,
        text: String,
        sequence_number: i64,
    },
    TitleEdit {
        user_id: UserId,
        title: String,
    },
    PageAdded {
        user_id: UserId,
        page_index: usize,
        page_id: String,
        page_data: Option<Value>,
        page_count: usize,
        sequence_number: i64,
    },
    PageDeleted {
        user_id: UserId,
        page_index: usize,
        page_id: String,
        page_count: usize,
        sequence_number: i64,
    },

    // -- Presence --
    PageChange {
        user_id: UserId,
        username: String,
        page_number: i32,
        sequence_number: i64,
    },
    PresenceUpdate {
        user_id: UserId,
        username: String,
        cursor_position: Option<Value>,
        current_tool: Option<String>,
        activity: Option<Value>,
    },
    UserJoined {
        user_id: UserId,
        username: String,
        cursor_color: String,
    },
    /// A participant's last connection closed. `temporary` marks a host
    /// who may still come back within the grace window.
    UserLeft {
        user_id: UserId,
        username: String,
        is_host: bool,
        temporary: bool,
    },
    /// The host is gone for good; the session is over.
    HostLeft {
        session_id: SessionId,
        username: String,
    },
    UserKicked {
        kicked_user_id: UserId,
        by_user: UserId,
    },
    PageViewersResponse {
        page_viewers: BTreeMap<u32, Vec<PageViewer>>,
    },

    // -- Voting --
    VoteInitiated {
        initiated_by: UserId,
        username: String,
        required_votes: u32,
        round: u64,
    },
    VoteUpdate {
        user_id: UserId,
        vote: bool,
        votes: BTreeMap<UserId, bool>,
        yes_votes: u32,
        no_votes: u32,
        required_votes: u32,
    },
    /// Everybody agreed; the initiator may now finalize.
    VoteResult {
        approved: bool,
        initiated_by: Option<UserId>,
        yes_votes: u32,
        required_votes: u32,
    },
    VoteFailed {
        yes_votes: u32,
        no_votes: u32,
        required_votes: u32,
    },
    StoryFinalized {
        story_id: StoryId,
        title: String,
        finalized_by: UserId,
    },

    // -- Session lifecycle --
    SessionStarted {
        session_id: SessionId,
        story_title: String,
    },
    SessionEnded {
        session_id: SessionId,
        story_title: String,
        ended_by: String,
    },

    // -- Sync --
    /// Stored or peer-provided canvas for one target. `sender_user_id` is
    /// `"server"` when it comes from storage.
    CanvasState {
        sender_user_id: String,
        canvas_data: Value,
        page_id: Option<Value>,
        page_index: Option<i64>,
        is_cover_image: bool,
    },
    /// Asks peers to replay their canvas for a rejoining user.
    RequestCanvasState {
        requester_id: UserId,
        page_id: Option<Value>,
        page_index: Option<i64>,
        is_cover_image: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_frames() {
        let msg: InboundMessage =
            serde_json::from_value(json!({"type": "initiate_vote"})).expect("parse");
        assert!(matches!(msg, InboundMessage::InitiateVote {}));

        let msg: InboundMessage =
            serde_json::from_value(json!({"type": "add_page"})).expect("parse");
        assert!(matches!(
            msg,
            InboundMessage::AddPage {
                page_index: None,
                page_data: None
            }
        ));

        let msg: InboundMessage = serde_json::from_value(
            json!({"type": "draw", "data": {"points": [1, 2]}, "page_id": 3}),
        )
        .expect("parse");
        match msg {
            InboundMessage::Draw {
                page_id,
                is_cover_image,
                ..
            } => {
                assert_eq!(page_id, Some(json!(3)));
                assert!(!is_cover_image);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_value::<InboundMessage>(json!({"type": "teleport"})).is_err());
        assert!(
            serde_json::from_value::<InboundMessage>(json!({"type": "vote_save"})).is_err()
        );
    }

    #[test]
    fn test_outbound_tagging() {
        let user = UserId::new();
        let value = serde_json::to_value(OutboundMessage::UserLeft {
            user_id: user,
            username: "host".into(),
            is_host: true,
            temporary: true,
        })
        .expect("serialize");
        assert_eq!(value["type"], "user_left");
        assert_eq!(value["temporary"], true);
        assert_eq!(value["user_id"], user.to_string());
    }

    #[test]
    fn test_page_viewers_keys_serialize_as_strings() {
        let mut page_viewers = BTreeMap::new();
        page_viewers.insert(2u32, Vec::new());
        let value =
            serde_json::to_value(OutboundMessage::PageViewersResponse { page_viewers }).unwrap();
        assert!(value["page_viewers"]["2"].is_array());
    }
}
