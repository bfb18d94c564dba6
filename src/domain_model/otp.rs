use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const OTP_TTL: Duration = Duration::from_secs(5 * 60);

/// Opaque id of an OTP session, carried in the `smsAuthId` cookie.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct OtpSessionId(pub String);

impl fmt::Display for OtpSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stored state of one phone verification attempt. The code itself is never
/// stored; only its keyed digest is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpSession {
    pub code_digest: String,
    pub phone_number: String,
    pub verified: bool,
}
