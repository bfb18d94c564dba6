use super::{AccountId, AuthorityLevel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Fixed lifetime of a primary session. Not sliding: activity does not
/// extend the deadline.
pub const SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Opaque id of a primary auth session, carried in the `sessionId` cookie.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payload of a live primary session.
///
/// `oauth_provider_token` is present only for OAuth sign-ins; it is kept so
/// sign-out and account deletion can revoke/unlink at the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub account_id: AccountId,
    pub authority_level: AuthorityLevel,
    pub oauth_provider_token: Option<String>,
}
