use crate::application_port::AuthError;

#[derive(Debug, Clone)]
pub struct OAuthIdentity {
    pub provider_user_id: String,
}

#[async_trait::async_trait]
pub trait OAuthClient: Send + Sync {
    /// Redeem an authorization code for a provider access token.
    async fn exchange_auth_code(&self, auth_code: &str) -> Result<String, AuthError>;

    async fn fetch_identity(&self, access_token: &str) -> Result<OAuthIdentity, AuthError>;

    /// Provider-side sign-out. Callers treat failures as best-effort.
    async fn revoke(&self, access_token: &str) -> Result<(), AuthError>;

    /// Remove the provider-to-app link. Callers treat failures as
    /// best-effort.
    async fn unlink(&self, access_token: &str) -> Result<(), AuthError>;
}
