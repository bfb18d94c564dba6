use crate::application_port::AuthError;
use crate::domain_model::{OtpSessionId, ResetTokenId};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ResetRequestInput {
    pub username: String,
    pub phone_number: String,
    pub otp_session_id: OtpSessionId,
}

#[derive(Debug, Clone)]
pub struct ResetIssued {
    pub reset_token_id: ResetTokenId,
    pub ttl: Duration,
}

#[async_trait::async_trait]
pub trait PasswordResetService: Send + Sync {
    /// Step one: verified OTP plus a matching active account buys a one-use
    /// reset grant.
    async fn request_reset(&self, request: ResetRequestInput) -> Result<ResetIssued, AuthError>;
    /// Step two: consumes the grant (success or failure) and updates the
    /// password if the account still matches.
    async fn complete_reset(
        &self,
        reset_token_id: &ResetTokenId,
        new_password: &str,
    ) -> Result<(), AuthError>;
}
