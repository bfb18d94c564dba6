use super::otp_session::OtpSessionManager;
use super::reset_session::PasswordResetManager;
use crate::application_port::{
    AuthError, CredentialHasher, PasswordResetService, ResetIssued, ResetRequestInput,
};
use crate::domain_model::ResetTokenId;
use crate::domain_port::AccountRepo;
use crate::logger::*;
use std::sync::Arc;

pub struct RealPasswordResetService {
    reset_manager: Arc<PasswordResetManager>,
    otp_manager: Arc<OtpSessionManager>,
    account_repo: Arc<dyn AccountRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
}

impl RealPasswordResetService {
    pub fn new(
        reset_manager: Arc<PasswordResetManager>,
        otp_manager: Arc<OtpSessionManager>,
        account_repo: Arc<dyn AccountRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            reset_manager,
            otp_manager,
            account_repo,
            credential_hasher,
        }
    }
}

#[async_trait::async_trait]
impl PasswordResetService for RealPasswordResetService {
    async fn request_reset(&self, request: ResetRequestInput) -> Result<ResetIssued, AuthError> {
        let ResetRequestInput {
            username,
            phone_number,
            otp_session_id,
        } = request;

        self.otp_manager
            .take_verified(&otp_session_id, &phone_number)
            .await?;

        if !self
            .account_repo
            .active_account_matches(&username, &phone_number)
            .await?
        {
            return Err(AuthError::AccountNotFound);
        }

        let reset_token_id = self.reset_manager.create(&username, &phone_number).await?;
        Ok(ResetIssued {
            reset_token_id,
            ttl: self.reset_manager.ttl(),
        })
    }

    async fn complete_reset(
        &self,
        reset_token_id: &ResetTokenId,
        new_password: &str,
    ) -> Result<(), AuthError> {
        // Take first: the grant burns even if a later step fails.
        let Some(grant) = self.reset_manager.take(reset_token_id).await? else {
            return Err(AuthError::InvalidResetToken);
        };

        // The account may have been deleted or re-keyed since step one.
        if !self
            .account_repo
            .active_account_matches(&grant.username, &grant.phone_number)
            .await?
        {
            return Err(AuthError::AccountMismatch);
        }

        let password_hash = self.credential_hasher.hash_password(new_password).await?;
        let affected = self
            .account_repo
            .update_password_if_matches(&grant.username, &grant.phone_number, &password_hash)
            .await?;
        if affected == 0 {
            return Err(AuthError::AccountMismatch);
        }

        info!("password reset completed");
        Ok(())
    }
}
