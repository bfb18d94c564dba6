use super::token_namespace::TokenNamespace;
use crate::application_port::AuthError;
use crate::domain_model::{PasswordResetSession, ResetTokenId};
use crate::domain_port::TokenStore;
use std::sync::Arc;
use std::time::Duration;

/// One-use password-reset grants. Callers confirm the account matches before
/// `create`; `take` burns the grant no matter what happens afterwards.
pub struct PasswordResetManager {
    grants: TokenNamespace<PasswordResetSession>,
}

impl PasswordResetManager {
    pub fn new(store: Arc<dyn TokenStore>, ttl: Duration) -> Self {
        Self {
            grants: TokenNamespace::new(store, "passwordChangeAuth", ttl),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.grants.ttl()
    }

    pub async fn create(
        &self,
        username: &str,
        phone_number: &str,
    ) -> Result<ResetTokenId, AuthError> {
        let grant = PasswordResetSession {
            username: username.to_string(),
            phone_number: phone_number.to_string(),
        };
        let id = self.grants.issue(&grant).await?;
        Ok(ResetTokenId(id))
    }

    /// Atomic consume. The first caller gets the grant; everyone after gets
    /// `None`.
    pub async fn take(
        &self,
        reset_token_id: &ResetTokenId,
    ) -> Result<Option<PasswordResetSession>, AuthError> {
        Ok(self.grants.take(&reset_token_id.0).await?)
    }
}
