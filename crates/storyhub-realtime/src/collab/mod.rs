//! Inbound message handlers.
//!
//! Every handler validates first, mutates inside one
//! [`SessionStore::transact`](storyhub_database::SessionStore::transact)
//! unit of work, and broadcasts only after that unit committed.

pub mod dispatcher;
pub mod draft;
pub mod drawing;
pub mod moderation;
pub mod navigation;
pub mod sync;
pub mod voting;

use serde_json::Value;

use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;
use storyhub_core::types::id::UserId;
use storyhub_database::SessionState;
use storyhub_entity::participant::Participant;

/// Rejects callers that are not active members of a live session.
pub(crate) fn require_member(state: &SessionState, user: UserId) -> AppResult<&Participant> {
    state.session.ensure_active()?;
    state
        .participant(user)
        .filter(|p| p.is_active && !p.is_kicked())
        .ok_or_else(|| AppError::authorization("You are not an active participant"))
}

/// Page number recorded with a logged operation.
pub(crate) fn page_number(index: Option<i64>) -> i32 {
    index.and_then(|i| i32::try_from(i).ok()).unwrap_or(0)
}

/// Page number carried inside a free-form `data` payload.
pub(crate) fn page_number_in(data: &Value) -> i32 {
    page_number(data.get("pageIndex").and_then(Value::as_i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_number_defaults_to_zero() {
        assert_eq!(page_number(None), 0);
        assert_eq!(page_number(Some(4)), 4);
        assert_eq!(page_number(Some(i64::MAX)), 0);
        assert_eq!(page_number_in(&json!({"pageIndex": 2})), 2);
        assert_eq!(page_number_in(&json!({"page": 2})), 0);
    }
}
