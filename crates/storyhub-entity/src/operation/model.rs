//! Operation log entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use storyhub_core::types::id::{SessionId, UserId};

/// Kind of a logged mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "operation_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Freehand stroke.
    Draw,
    /// Canvas cleared.
    Clear,
    /// Object transformed.
    Transform,
    /// Object deleted.
    Delete,
    /// Page text replaced.
    TextEdit,
    /// Rich text edit.
    TextEditAdvanced,
    /// Page navigation.
    PageChange,
    /// Page inserted.
    AddPage,
    /// Page removed.
    DeletePage,
    /// Layer reordering or visibility change.
    LayerOperation,
    /// Multi-object transform.
    TransformOperation,
    /// Single canvas item deleted.
    DeleteItem,
}

impl OperationKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draw => "draw",
            Self::Clear => "clear",
            Self::Transform => "transform",
            Self::Delete => "delete",
            Self::TextEdit => "text_edit",
            Self::TextEditAdvanced => "text_edit_advanced",
            Self::PageChange => "page_change",
            Self::AddPage => "add_page",
            Self::DeletePage => "delete_page",
            Self::LayerOperation => "layer_operation",
            Self::TransformOperation => "transform_operation",
            Self::DeleteItem => "delete_item",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed, sequenced entry of the operation log.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Operation {
    /// Session.
    pub session_id: SessionId,
    /// Author.
    pub user_id: UserId,
    /// Kind.
    pub kind: OperationKind,
    /// Payload as received.
    pub payload: serde_json::Value,
    /// Page the operation applies to.
    pub page_number: i32,
    /// Position in the session's log, gapless from zero.
    pub sequence_number: i64,
    /// Commit time.
    pub created_at: DateTime<Utc>,
}

/// An operation about to be appended; the store assigns the sequence.
#[derive(Debug, Clone)]
pub struct NewOperation {
    /// Author.
    pub user_id: UserId,
    /// Kind.
    pub kind: OperationKind,
    /// Payload.
    pub payload: serde_json::Value,
    /// Page number.
    pub page_number: i32,
}

impl NewOperation {
    /// Builds an operation for `user`.
    pub fn new(
        user_id: UserId,
        kind: OperationKind,
        payload: serde_json::Value,
        page_number: i32,
    ) -> Self {
        Self {
            user_id,
            kind,
            payload,
            page_number,
        }
    }

    /// Seals the operation at `sequence_number`.
    pub fn commit(self, session_id: SessionId, sequence_number: i64, now: DateTime<Utc>) -> Operation {
        Operation {
            session_id,
            user_id: self.user_id,
            kind: self.kind,
            payload: self.payload,
            page_number: self.page_number,
            sequence_number,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names_match_serde() {
        for kind in [
            OperationKind::Draw,
            OperationKind::TextEditAdvanced,
            OperationKind::PageChange,
            OperationKind::DeleteItem,
        ] {
            let json = serde_json::to_value(kind).expect("serialize");
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_string()));
        }
    }
}
