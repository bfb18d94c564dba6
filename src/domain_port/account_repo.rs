use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub account_id: AccountId,
    pub username: Option<String>,
    pub nickname: String,
    pub phone_number: Option<String>,
    pub oauth_id: Option<String>,
    pub authority_level: AuthorityLevel,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CredentialsRecord {
    pub account_id: AccountId,
    pub password_hash: String,
    pub authority_level: AuthorityLevel,
}

/// Account persistence. Soft-deleted rows are invisible to every lookup here;
/// deletion releases username/phone/provider identifiers for reuse.
#[async_trait::async_trait]
pub trait AccountRepo: Send + Sync {
    /// Insert a provider-linked account unless an active one already holds
    /// `oauth_id`. Returns whether a row was inserted.
    async fn insert_oauth_if_absent(
        &self,
        account_id: AccountId,
        oauth_id: &str,
        nickname: &str,
    ) -> Result<bool, AuthError>;

    /// Insert a credential account unless an active one already holds the
    /// username or the phone number. Returns whether a row was inserted.
    async fn insert_local_if_absent(
        &self,
        account_id: AccountId,
        username: &str,
        password_hash: &str,
        phone_number: &str,
        nickname: &str,
    ) -> Result<bool, AuthError>;

    async fn find_active_by_oauth_id(&self, oauth_id: &str)
    -> Result<Option<AccountRecord>, AuthError>;

    async fn find_active_by_id(
        &self,
        account_id: AccountId,
    ) -> Result<Option<AccountRecord>, AuthError>;

    async fn find_credentials_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialsRecord>, AuthError>;

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError>;

    async fn find_username_by_phone(&self, phone_number: &str)
    -> Result<Option<String>, AuthError>;

    /// True iff an active account matches both identity fields.
    async fn active_account_matches(
        &self,
        username: &str,
        phone_number: &str,
    ) -> Result<bool, AuthError>;

    /// Conditional password update over `{username, phone_number, active}`.
    /// Returns affected rows; zero means the account no longer matches.
    async fn update_password_if_matches(
        &self,
        username: &str,
        phone_number: &str,
        password_hash: &str,
    ) -> Result<u64, AuthError>;

    /// Returns affected rows; zero means no active account has the id.
    async fn update_nickname(&self, account_id: AccountId, nickname: &str)
    -> Result<u64, AuthError>;

    /// Soft delete: clears username/phone/provider id and marks the row
    /// deleted, keeping it for referential history.
    async fn release_and_soft_delete(&self, account_id: AccountId) -> Result<(), AuthError>;

    async fn search(
        &self,
        filter: &AccountSearchFilter,
        page_size: u32,
    ) -> Result<AccountSearchPage, AuthError>;
}
