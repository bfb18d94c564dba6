use crate::application_port::AuthError;
use crate::domain_port::{OAuthClient, OAuthIdentity};
use std::sync::Mutex;

/// Provider double for development and tests. Tokens embed the auth code, so
/// repeated callbacks with one code resolve to one provider identity.
#[derive(Debug)]
pub struct FakeOAuthClient {
    revoked: Mutex<Vec<String>>,
    unlinked: Mutex<Vec<String>>,
}

impl FakeOAuthClient {
    /// Sentinel code the provider rejects.
    pub const BAD_CODE: &'static str = "expired-auth-code";

    pub fn new() -> Self {
        Self {
            revoked: Mutex::new(Vec::new()),
            unlinked: Mutex::new(Vec::new()),
        }
    }

    pub fn revoked_tokens(&self) -> Vec<String> {
        self.revoked.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn unlinked_tokens(&self) -> Vec<String> {
        self.unlinked.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl OAuthClient for FakeOAuthClient {
    async fn exchange_auth_code(&self, auth_code: &str) -> Result<String, AuthError> {
        if auth_code == Self::BAD_CODE {
            return Err(AuthError::InvalidAuthCode);
        }
        Ok(format!("fake-provider-token:{}", auth_code))
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<OAuthIdentity, AuthError> {
        match access_token.strip_prefix("fake-provider-token:") {
            Some(auth_code) => Ok(OAuthIdentity {
                provider_user_id: format!("fake:{}", auth_code),
            }),
            None => Err(AuthError::InvalidProviderToken),
        }
    }

    async fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
        if let Ok(mut revoked) = self.revoked.lock() {
            revoked.push(access_token.to_string());
        }
        Ok(())
    }

    async fn unlink(&self, access_token: &str) -> Result<(), AuthError> {
        if let Ok(mut unlinked) = self.unlinked.lock() {
            unlinked.push(access_token.to_string());
        }
        Ok(())
    }
}
