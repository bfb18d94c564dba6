use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const RESET_TTL: Duration = Duration::from_secs(5 * 60);

/// Opaque id of a password-reset grant, carried in the `passwordChangeAuthId`
/// cookie. One use only.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ResetTokenId(pub String);

impl fmt::Display for ResetTokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The account identity whose password the holder is allowed to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetSession {
    pub username: String,
    pub phone_number: String,
}
