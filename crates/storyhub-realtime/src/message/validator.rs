//! Message validation rules.
//!
//! Validation runs before any store access; a frame that fails here never
//! mutates state and is never broadcast.

use storyhub_core::config::CollabConfig;
use storyhub_core::error::AppError;
use storyhub_core::result::AppResult;

use super::types::InboundMessage;

/// Limits applied to inbound frames.
#[derive(Debug, Clone, Copy)]
pub struct MessageLimits {
    pub max_message_bytes: usize,
    pub max_pages: usize,
    pub max_title_chars: usize,
}

impl From<&CollabConfig> for MessageLimits {
    fn from(config: &CollabConfig) -> Self {
        Self {
            max_message_bytes: config.max_message_bytes,
            max_pages: config.max_pages,
            max_title_chars: config.max_title_chars,
        }
    }
}

/// Validates a raw frame before parsing.
pub fn validate_inbound(raw: &str, limits: &MessageLimits) -> AppResult<()> {
    if raw.len() > limits.max_message_bytes {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {} bytes",
            limits.max_message_bytes
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates the fields of a parsed message.
pub fn validate_message(msg: &InboundMessage, limits: &MessageLimits) -> AppResult<()> {
    match msg {
        InboundMessage::Draw { page_index, .. }
        | InboundMessage::Cursor { page_index, .. }
        | InboundMessage::Clear { page_index, .. }
        | InboundMessage::TextEdit { page_index, .. }
        | InboundMessage::AddPage { page_index, .. }
        | InboundMessage::DeletePage { page_index, .. }
        | InboundMessage::CanvasSnapshot { page_index, .. }
        | InboundMessage::RequestSync { page_index, .. }
        | InboundMessage::CanvasState { page_index, .. } => {
            if let Some(index) = page_index {
                page_in_range(*index, limits)?;
            }
        }
        InboundMessage::PageChange { page_number } => {
            page_in_range(*page_number, limits)?;
        }
        InboundMessage::TitleEdit { title } => {
            validate_title(title, limits)?;
        }
        InboundMessage::FinalizeCollaborativeStory {
            title: Some(title), ..
        } => {
            validate_title(title, limits)?;
        }
        _ => {}
    }

    if let InboundMessage::TextEdit {
        page_index: None,
        page_id: None,
        ..
    }
    | InboundMessage::DeletePage {
        page_index: None,
        page_id: None,
    } = msg
    {
        return Err(AppError::validation("page_index or page_id is required"));
    }

    Ok(())
}

/// Converts and bounds-checks a client page index.
pub fn page_in_range(index: i64, limits: &MessageLimits) -> AppResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < limits.max_pages)
        .ok_or_else(|| {
            AppError::validation(format!(
                "Page index {index} is outside 0..{}",
                limits.max_pages
            ))
        })
}

fn validate_title(title: &str, limits: &MessageLimits) -> AppResult<()> {
    if title.trim().chars().count() > limits.max_title_chars {
        return Err(AppError::validation(format!(
            "Title exceeds {} characters",
            limits.max_title_chars
        )));
    }
    Ok(())
}
