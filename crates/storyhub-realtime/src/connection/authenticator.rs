//! WebSocket authentication. Validates the bearer credential presented on connect.

use std::sync::Arc;

use tracing::warn;

use storyhub_auth::jwt::JwtDecoder;
use storyhub_core::types::id::UserId;

use super::close::CloseReason;

/// Identity extracted from a valid credential.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
}

/// Authenticates WebSocket connections using JWT credentials.
#[derive(Clone)]
pub struct WsAuthenticator {
    decoder: Arc<JwtDecoder>,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator").finish()
    }
}

impl WsAuthenticator {
    pub fn new(decoder: Arc<JwtDecoder>) -> Self {
        Self { decoder }
    }

    /// Validates the credential, mapping every failure to an `unauthenticated` close.
    pub fn authenticate(&self, token: Option<&str>) -> Result<AuthenticatedUser, CloseReason> {
        let Some(token) = token else {
            warn!("WebSocket connect without credential");
            return Err(CloseReason::Unauthenticated);
        };
        match self.decoder.decode(token) {
            Ok(claims) => Ok(AuthenticatedUser {
                user_id: claims.user_id(),
                username: claims.username,
            }),
            Err(e) => {
                warn!(error = %e, "WebSocket credential rejected");
                Err(CloseReason::Unauthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyhub_auth::jwt::JwtEncoder;
    use storyhub_core::config::AuthConfig;

    #[test]
    fn test_missing_and_bad_tokens_are_unauthenticated() {
        let auth = WsAuthenticator::new(Arc::new(JwtDecoder::new(&AuthConfig::default())));
        assert_eq!(auth.authenticate(None).unwrap_err(), CloseReason::Unauthenticated);
        assert_eq!(
            auth.authenticate(Some("garbage")).unwrap_err(),
            CloseReason::Unauthenticated
        );
    }

    #[test]
    fn test_valid_token_yields_identity() {
        let config = AuthConfig::default();
        let user = UserId::new();
        let token = JwtEncoder::new(&config).issue(user, "noor").unwrap();
        let auth = WsAuthenticator::new(Arc::new(JwtDecoder::new(&config)));

        let identity = auth.authenticate(Some(&token)).unwrap();
        assert_eq!(identity.user_id, user);
        assert_eq!(identity.username, "noor");
    }
}
