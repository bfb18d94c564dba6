use crate::domain_model::*;
use crate::domain_port::StoreError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid authorization code")]
    InvalidAuthCode,
    #[error("invalid provider token")]
    InvalidProviderToken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("already signed in")]
    AlreadySignedIn,
    #[error("not signed in")]
    NotSignedIn,
    #[error("invalid verification code")]
    InvalidOtp,
    #[error("invalid or expired reset token")]
    InvalidResetToken,
    #[error("account no longer matches")]
    AccountMismatch,
    #[error("username or phone number already in use")]
    SignupConflict,
    #[error("account provisioning failed")]
    ProvisioningFailed,
    #[error("account not found")]
    AccountNotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Store(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct SigninInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub password: String,
    pub phone_number: String,
    pub otp_session_id: OtpSessionId,
}

#[derive(Debug, Clone)]
pub struct SigninResult {
    pub session_id: SessionId,
    pub account_id: AccountId,
    pub ttl: Duration,
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// OAuth callback flow: code exchange, identity fetch, provisioning,
    /// session issuance.
    async fn oauth_signin(&self, auth_code: &str) -> Result<SigninResult, AuthError>;
    /// Local credential sign-in.
    async fn signin(&self, request: SigninInput) -> Result<SigninResult, AuthError>;
    /// Credential sign-up through the verified-OTP gate.
    async fn signup(&self, request: SignupInput) -> Result<AccountId, AuthError>;
    async fn signout(&self, session_id: &SessionId) -> Result<(), AuthError>;
    /// Resolve a live session or fail with `NotSignedIn`.
    async fn session(&self, session_id: &SessionId) -> Result<AuthSession, AuthError>;
}
