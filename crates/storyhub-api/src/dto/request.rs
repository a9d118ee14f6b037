//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use storyhub_core::error::AppError;
use storyhub_realtime::SessionSeed;

/// Create-session request body. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateSessionRequest {
    /// Initial draft title.
    #[validate(length(max = 200, message = "Title is too long"))]
    pub title: Option<String>,
    /// Initial page texts.
    #[serde(default)]
    pub pages: Vec<String>,
}

impl From<CreateSessionRequest> for SessionSeed {
    fn from(req: CreateSessionRequest) -> Self {
        SessionSeed {
            title: req.title,
            pages: req.pages,
        }
    }
}

/// Join-by-code request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JoinSessionRequest {
    /// Join code as typed by the user; case and separators are ignored.
    #[validate(length(min = 1, max = 32, message = "Join code is required"))]
    pub join_code: String,
}

/// Runs `validator` rules, mapping failures to a validation error.
pub fn validate_request<T: Validate>(req: &T) -> Result<(), AppError> {
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))
}
