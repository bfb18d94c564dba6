use crate::application_port::AuthError;
use crate::domain_model::OtpSessionId;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OtpIssued {
    pub otp_session_id: OtpSessionId,
    pub ttl: Duration,
    /// Dispatch is unreliable and non-fatal; the session stands either way.
    pub delivery_ok: bool,
}

#[async_trait::async_trait]
pub trait OtpService: Send + Sync {
    async fn request_code(&self, phone_number: &str) -> Result<OtpIssued, AuthError>;
    /// Validate without consuming; a success marks the session verified so a
    /// follow-up request can pass the one-time gate.
    async fn confirm_code(
        &self,
        otp_session_id: &OtpSessionId,
        phone_number: &str,
        code: &str,
    ) -> Result<(), AuthError>;
}
