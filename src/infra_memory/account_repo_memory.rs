use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{AccountRecord, AccountRepo, CredentialsRecord};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredAccount {
    account_id: AccountId,
    username: Option<String>,
    password_hash: Option<String>,
    nickname: String,
    phone_number: Option<String>,
    oauth_id: Option<String>,
    authority_level: AuthorityLevel,
    is_banned: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
}

impl StoredAccount {
    fn active(&self) -> bool {
        !self.is_deleted
    }

    fn record(&self) -> AccountRecord {
        AccountRecord {
            account_id: self.account_id,
            username: self.username.clone(),
            nickname: self.nickname.clone(),
            phone_number: self.phone_number.clone(),
            oauth_id: self.oauth_id.clone(),
            authority_level: self.authority_level,
            is_banned: self.is_banned,
            created_at: self.created_at,
        }
    }

    fn summary(&self) -> AccountSummary {
        AccountSummary {
            account_id: self.account_id,
            username: self.username.clone(),
            nickname: self.nickname.clone(),
            is_banned: self.is_banned,
            created_at: self.created_at,
        }
    }
}

/// In-process `AccountRepo` for development and tests. Conditional inserts
/// and updates run under one lock, matching the transactional backend.
pub struct MemoryAccountRepo {
    rows: Mutex<Vec<StoredAccount>>,
}

impl MemoryAccountRepo {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    fn rows(&self) -> Result<MutexGuard<'_, Vec<StoredAccount>>, AuthError> {
        self.rows
            .lock()
            .map_err(|_| AuthError::InternalError("account rows lock poisoned".to_string()))
    }

    pub fn active_row_count(&self) -> usize {
        match self.rows.lock() {
            Ok(rows) => rows.iter().filter(|row| row.active()).count(),
            Err(_) => 0,
        }
    }

    pub fn find_account_id_by_username(&self, username: &str) -> Option<AccountId> {
        let rows = self.rows.lock().ok()?;
        rows.iter()
            .find(|row| row.active() && row.username.as_deref() == Some(username))
            .map(|row| row.account_id)
    }

    pub fn set_banned(&self, account_id: AccountId, is_banned: bool) {
        if let Ok(mut rows) = self.rows.lock() {
            if let Some(row) = rows.iter_mut().find(|row| row.account_id == account_id) {
                row.is_banned = is_banned;
            }
        }
    }
}

#[async_trait::async_trait]
impl AccountRepo for MemoryAccountRepo {
    async fn insert_oauth_if_absent(
        &self,
        account_id: AccountId,
        oauth_id: &str,
        nickname: &str,
    ) -> Result<bool, AuthError> {
        let mut rows = self.rows()?;
        let taken = rows
            .iter()
            .any(|row| row.active() && row.oauth_id.as_deref() == Some(oauth_id));
        if taken {
            return Ok(false);
        }
        rows.push(StoredAccount {
            account_id,
            username: None,
            password_hash: None,
            nickname: nickname.to_string(),
            phone_number: None,
            oauth_id: Some(oauth_id.to_string()),
            authority_level: AuthorityLevel::Member,
            is_banned: false,
            is_deleted: false,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn insert_local_if_absent(
        &self,
        account_id: AccountId,
        username: &str,
        password_hash: &str,
        phone_number: &str,
        nickname: &str,
    ) -> Result<bool, AuthError> {
        let mut rows = self.rows()?;
        let taken = rows.iter().any(|row| {
            row.active()
                && (row.username.as_deref() == Some(username)
                    || row.phone_number.as_deref() == Some(phone_number))
        });
        if taken {
            return Ok(false);
        }
        rows.push(StoredAccount {
            account_id,
            username: Some(username.to_string()),
            password_hash: Some(password_hash.to_string()),
            nickname: nickname.to_string(),
            phone_number: Some(phone_number.to_string()),
            oauth_id: None,
            authority_level: AuthorityLevel::Member,
            is_banned: false,
            is_deleted: false,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn find_active_by_oauth_id(
        &self,
        oauth_id: &str,
    ) -> Result<Option<AccountRecord>, AuthError> {
        let rows = self.rows()?;
        Ok(rows
            .iter()
            .find(|row| row.active() && row.oauth_id.as_deref() == Some(oauth_id))
            .map(StoredAccount::record))
    }

    async fn find_active_by_id(
        &self,
        account_id: AccountId,
    ) -> Result<Option<AccountRecord>, AuthError> {
        let rows = self.rows()?;
        Ok(rows
            .iter()
            .find(|row| row.active() && row.account_id == account_id)
            .map(StoredAccount::record))
    }

    async fn find_credentials_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialsRecord>, AuthError> {
        let rows = self.rows()?;
        Ok(rows
            .iter()
            .find(|row| row.active() && row.username.as_deref() == Some(username))
            .and_then(|row| {
                row.password_hash
                    .clone()
                    .map(|password_hash| CredentialsRecord {
                        account_id: row.account_id,
                        password_hash,
                        authority_level: row.authority_level,
                    })
            }))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let rows = self.rows()?;
        Ok(rows
            .iter()
            .any(|row| row.active() && row.username.as_deref() == Some(username)))
    }

    async fn find_username_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<String>, AuthError> {
        let rows = self.rows()?;
        Ok(rows
            .iter()
            .find(|row| row.active() && row.phone_number.as_deref() == Some(phone_number))
            .and_then(|row| row.username.clone()))
    }

    async fn active_account_matches(
        &self,
        username: &str,
        phone_number: &str,
    ) -> Result<bool, AuthError> {
        let rows = self.rows()?;
        Ok(rows.iter().any(|row| {
            row.active()
                && row.username.as_deref() == Some(username)
                && row.phone_number.as_deref() == Some(phone_number)
        }))
    }

    async fn update_password_if_matches(
        &self,
        username: &str,
        phone_number: &str,
        password_hash: &str,
    ) -> Result<u64, AuthError> {
        let mut rows = self.rows()?;
        match rows.iter_mut().find(|row| {
            row.active()
                && row.username.as_deref() == Some(username)
                && row.phone_number.as_deref() == Some(phone_number)
        }) {
            Some(row) => {
                row.password_hash = Some(password_hash.to_string());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_nickname(
        &self,
        account_id: AccountId,
        nickname: &str,
    ) -> Result<u64, AuthError> {
        let mut rows = self.rows()?;
        match rows
            .iter_mut()
            .find(|row| row.active() && row.account_id == account_id)
        {
            Some(row) => {
                row.nickname = nickname.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn release_and_soft_delete(&self, account_id: AccountId) -> Result<(), AuthError> {
        let mut rows = self.rows()?;
        if let Some(row) = rows
            .iter_mut()
            .find(|row| row.active() && row.account_id == account_id)
        {
            row.username = None;
            row.phone_number = None;
            row.oauth_id = None;
            row.is_deleted = true;
        }
        Ok(())
    }

    async fn search(
        &self,
        filter: &AccountSearchFilter,
        page_size: u32,
    ) -> Result<AccountSearchPage, AuthError> {
        let rows = self.rows()?;
        // Newest first, like the backing table ordered by creation.
        let matches: Vec<&StoredAccount> = rows
            .iter()
            .rev()
            .filter(|row| {
                row.active()
                    && filter.username.as_deref().is_none_or(|needle| {
                        row.username
                            .as_deref()
                            .is_some_and(|username| username.contains(needle))
                    })
                    && filter
                        .nickname
                        .as_deref()
                        .is_none_or(|needle| row.nickname.contains(needle))
                    && filter
                        .is_banned
                        .is_none_or(|is_banned| row.is_banned == is_banned)
            })
            .collect();

        let last_page = (matches.len() as u32).div_ceil(page_size);
        let page = filter.page.max(1);
        let start = ((page - 1) * page_size) as usize;
        let list = matches
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .map(|row| row.summary())
            .collect();

        Ok(AccountSearchPage { last_page, list })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_insert_refuses_taken_username_or_phone() {
        let repo = MemoryAccountRepo::new();

        assert!(
            repo.insert_local_if_absent(AccountId::generate(), "bob", "h", "+821011112222", "bob")
                .await
                .unwrap()
        );
        assert!(
            !repo
                .insert_local_if_absent(AccountId::generate(), "bob", "h", "+821033334444", "b2")
                .await
                .unwrap()
        );
        assert!(
            !repo
                .insert_local_if_absent(AccountId::generate(), "carol", "h", "+821011112222", "c")
                .await
                .unwrap()
        );
        assert_eq!(repo.active_row_count(), 1);
    }

    #[tokio::test]
    async fn oauth_insert_refuses_taken_provider_id() {
        let repo = MemoryAccountRepo::new();

        assert!(
            repo.insert_oauth_if_absent(AccountId::generate(), "kakao:77", "user#aa")
                .await
                .unwrap()
        );
        assert!(
            !repo
                .insert_oauth_if_absent(AccountId::generate(), "kakao:77", "user#bb")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn soft_delete_releases_identifiers_for_reuse() {
        let repo = MemoryAccountRepo::new();

        let account_id = AccountId::generate();
        repo.insert_local_if_absent(account_id, "bob", "h", "+821011112222", "bob")
            .await
            .unwrap();
        repo.release_and_soft_delete(account_id).await.unwrap();

        assert!(repo.find_active_by_id(account_id).await.unwrap().is_none());
        assert!(!repo.username_exists("bob").await.unwrap());
        assert!(
            repo.insert_local_if_absent(AccountId::generate(), "bob", "h", "+821011112222", "bob")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn deleted_rows_do_not_match_credential_lookups() {
        let repo = MemoryAccountRepo::new();

        let account_id = AccountId::generate();
        repo.insert_local_if_absent(account_id, "bob", "h", "+821011112222", "bob")
            .await
            .unwrap();
        assert!(
            repo.find_credentials_by_username("bob")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            repo.active_account_matches("bob", "+821011112222")
                .await
                .unwrap()
        );

        repo.release_and_soft_delete(account_id).await.unwrap();
        assert!(
            repo.find_credentials_by_username("bob")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            !repo
                .active_account_matches("bob", "+821011112222")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn conditional_password_update_reports_zero_on_mismatch() {
        let repo = MemoryAccountRepo::new();

        repo.insert_local_if_absent(AccountId::generate(), "bob", "old", "+821011112222", "bob")
            .await
            .unwrap();

        assert_eq!(
            repo.update_password_if_matches("bob", "+821099990000", "new")
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            repo.update_password_if_matches("bob", "+821011112222", "new")
                .await
                .unwrap(),
            1
        );
        let credentials = repo
            .find_credentials_by_username("bob")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(credentials.password_hash, "new");
    }

    #[tokio::test]
    async fn search_pages_newest_first() {
        let repo = MemoryAccountRepo::new();

        for i in 0..23 {
            repo.insert_local_if_absent(
                AccountId::generate(),
                &format!("user{i:02}"),
                "h",
                &format!("+8210000000{i:02}"),
                &format!("nick{i:02}"),
            )
            .await
            .unwrap();
        }

        let page = repo
            .search(
                &AccountSearchFilter {
                    page: 1,
                    ..Default::default()
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(page.last_page, 3);
        assert_eq!(page.list.len(), 10);
        assert_eq!(page.list[0].username.as_deref(), Some("user22"));

        let tail = repo
            .search(
                &AccountSearchFilter {
                    page: 3,
                    ..Default::default()
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(tail.list.len(), 3);
        assert_eq!(tail.list[2].username.as_deref(), Some("user00"));
    }

    #[tokio::test]
    async fn search_filters_compose() {
        let repo = MemoryAccountRepo::new();

        repo.insert_local_if_absent(AccountId::generate(), "alpha", "h", "+821000000001", "red")
            .await
            .unwrap();
        repo.insert_local_if_absent(AccountId::generate(), "beta", "h", "+821000000002", "blue")
            .await
            .unwrap();
        let banned = AccountId::generate();
        repo.insert_local_if_absent(banned, "alphabet", "h", "+821000000003", "blue")
            .await
            .unwrap();
        repo.set_banned(banned, true);

        let page = repo
            .search(
                &AccountSearchFilter {
                    username: Some("alpha".to_string()),
                    nickname: Some("blue".to_string()),
                    is_banned: Some(true),
                    page: 1,
                },
                10,
            )
            .await
            .unwrap();
        assert_eq!(page.last_page, 1);
        assert_eq!(page.list.len(), 1);
        assert_eq!(page.list[0].username.as_deref(), Some("alphabet"));
    }

    #[tokio::test]
    async fn empty_search_reports_zero_pages() {
        let repo = MemoryAccountRepo::new();

        let page = repo
            .search(&AccountSearchFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(page.last_page, 0);
        assert!(page.list.is_empty());
    }
}
