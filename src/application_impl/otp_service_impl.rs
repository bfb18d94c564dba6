use super::otp_session::OtpSessionManager;
use crate::application_port::{AuthError, OtpIssued, OtpService};
use crate::domain_model::OtpSessionId;
use std::sync::Arc;

pub struct RealOtpService {
    otp_manager: Arc<OtpSessionManager>,
}

impl RealOtpService {
    pub fn new(otp_manager: Arc<OtpSessionManager>) -> Self {
        Self { otp_manager }
    }
}

#[async_trait::async_trait]
impl OtpService for RealOtpService {
    async fn request_code(&self, phone_number: &str) -> Result<OtpIssued, AuthError> {
        self.otp_manager.create(phone_number).await
    }

    async fn confirm_code(
        &self,
        otp_session_id: &OtpSessionId,
        phone_number: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        // Non-consuming on purpose: the verified session is the proof the
        // follow-up request (sign-up, reset, recovery) redeems.
        self.otp_manager
            .validate(otp_session_id, phone_number, code, false)
            .await
    }
}
