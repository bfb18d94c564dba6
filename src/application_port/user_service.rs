use crate::application_port::AuthError;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ProfileView {
    pub account_id: AccountId,
    pub nickname: String,
    /// Present only when the viewer has admin authority.
    pub is_banned: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountSearchFilter {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub is_banned: Option<bool>,
    pub page: u32,
}

#[derive(Debug, Clone)]
pub struct AccountSummary {
    pub account_id: AccountId,
    pub username: Option<String>,
    pub nickname: String,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AccountSearchPage {
    pub last_page: u32,
    pub list: Vec<AccountSummary>,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn profile(
        &self,
        account_id: AccountId,
        viewer: &AuthSession,
    ) -> Result<ProfileView, AuthError>;
    /// Returns the stored display name (`nickname#tag`).
    async fn update_nickname(
        &self,
        account_id: AccountId,
        nickname: &str,
    ) -> Result<String, AuthError>;
    async fn username_available(&self, username: &str) -> Result<bool, AuthError>;
    /// Username recovery through the verified-OTP gate.
    async fn recover_username(
        &self,
        phone_number: &str,
        otp_session_id: &OtpSessionId,
    ) -> Result<String, AuthError>;
    /// Tears down the account: provider unlink when linked, identifier
    /// release, session destruction.
    async fn delete_account(&self, session_id: &SessionId) -> Result<(), AuthError>;
    async fn search(&self, filter: AccountSearchFilter) -> Result<AccountSearchPage, AuthError>;
}
