//! Claims carried by a connection credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storyhub_core::types::id::UserId;

/// JWT payload identifying the connecting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user id.
    pub sub: UserId,
    /// Display name shown to collaborators.
    pub username: String,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> UserId {
        self.sub
    }

    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}
