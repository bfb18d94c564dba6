use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{AccountRecord, AccountRepo, CredentialsRecord};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlAccountRepo {
    pool: MySqlPool,
}

impl MySqlAccountRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlAccountRepo { pool }
    }
}

// authority_level is TINYINT: 0 member, 1 admin.
fn authority_from_db(level: i8) -> AuthorityLevel {
    if level >= 1 {
        AuthorityLevel::Admin
    } else {
        AuthorityLevel::Member
    }
}

fn record_from_row(row: &MySqlRow) -> AccountRecord {
    AccountRecord {
        account_id: row.get::<AccountId, _>("account_id"),
        username: row.get("username"),
        nickname: row.get("nickname"),
        phone_number: row.get("phone_number"),
        oauth_id: row.get("oauth_id"),
        authority_level: authority_from_db(row.get::<i8, _>("authority_level")),
        is_banned: row.get("is_banned"),
        created_at: row.get("created_at"),
    }
}

const RECORD_COLUMNS: &str = r#"account_id, username, nickname, phone_number, oauth_id,
       authority_level, is_banned, created_at"#;

#[async_trait::async_trait]
impl AccountRepo for MySqlAccountRepo {
    async fn insert_oauth_if_absent(
        &self,
        account_id: AccountId,
        oauth_id: &str,
        nickname: &str,
    ) -> Result<bool, AuthError> {
        // Unique keys on the identifier columns backstop the guarded insert;
        // a duplicate-key race reads as "already taken".
        let result = sqlx::query(
            r#"
INSERT INTO account (account_id, nickname, oauth_id)
SELECT ?, ?, ?
FROM DUAL
WHERE NOT EXISTS (
    SELECT 1 FROM account WHERE oauth_id = ? AND is_deleted = 0
)
"#,
        )
        .bind(account_id)
        .bind(nickname)
        .bind(oauth_id)
        .bind(oauth_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            Err(e) if is_dup_key(&e) => Ok(false),
            Err(e) => Err(AuthError::Store(e.to_string())),
        }
    }

    async fn insert_local_if_absent(
        &self,
        account_id: AccountId,
        username: &str,
        password_hash: &str,
        phone_number: &str,
        nickname: &str,
    ) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
INSERT INTO account (account_id, username, password_hash, phone_number, nickname)
SELECT ?, ?, ?, ?, ?
FROM DUAL
WHERE NOT EXISTS (
    SELECT 1 FROM account
    WHERE (username = ? OR phone_number = ?) AND is_deleted = 0
)
"#,
        )
        .bind(account_id)
        .bind(username)
        .bind(password_hash)
        .bind(phone_number)
        .bind(nickname)
        .bind(username)
        .bind(phone_number)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            Err(e) if is_dup_key(&e) => Ok(false),
            Err(e) => Err(AuthError::Store(e.to_string())),
        }
    }

    async fn find_active_by_oauth_id(
        &self,
        oauth_id: &str,
    ) -> Result<Option<AccountRecord>, AuthError> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM account WHERE oauth_id = ? AND is_deleted = 0"
        ))
        .bind(oauth_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn find_active_by_id(
        &self,
        account_id: AccountId,
    ) -> Result<Option<AccountRecord>, AuthError> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM account WHERE account_id = ? AND is_deleted = 0"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn find_credentials_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialsRecord>, AuthError> {
        let row = sqlx::query(
            r#"
SELECT account_id, password_hash, authority_level
FROM account
WHERE username = ? AND password_hash IS NOT NULL AND is_deleted = 0
"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(row.map(|row| CredentialsRecord {
            account_id: row.get::<AccountId, _>("account_id"),
            password_hash: row.get("password_hash"),
            authority_level: authority_from_db(row.get::<i8, _>("authority_level")),
        }))
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM account WHERE username = ? AND is_deleted = 0"#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(count > 0)
    }

    async fn find_username_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<String>, AuthError> {
        let username: Option<String> = sqlx::query_scalar(
            r#"
SELECT username FROM account
WHERE phone_number = ? AND username IS NOT NULL AND is_deleted = 0
"#,
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(username)
    }

    async fn active_account_matches(
        &self,
        username: &str,
        phone_number: &str,
    ) -> Result<bool, AuthError> {
        let count: i64 = sqlx::query_scalar(
            r#"
SELECT COUNT(1) FROM account
WHERE username = ? AND phone_number = ? AND is_deleted = 0
"#,
        )
        .bind(username)
        .bind(phone_number)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(count > 0)
    }

    async fn update_password_if_matches(
        &self,
        username: &str,
        phone_number: &str,
        password_hash: &str,
    ) -> Result<u64, AuthError> {
        let done = sqlx::query(
            r#"
UPDATE account
SET password_hash = ?
WHERE username = ? AND phone_number = ? AND is_deleted = 0
"#,
        )
        .bind(password_hash)
        .bind(username)
        .bind(phone_number)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(done.rows_affected())
    }

    async fn update_nickname(
        &self,
        account_id: AccountId,
        nickname: &str,
    ) -> Result<u64, AuthError> {
        let done = sqlx::query(
            r#"
UPDATE account SET nickname = ? WHERE account_id = ? AND is_deleted = 0
"#,
        )
        .bind(nickname)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(done.rows_affected())
    }

    async fn release_and_soft_delete(&self, account_id: AccountId) -> Result<(), AuthError> {
        sqlx::query(
            r#"
UPDATE account
SET username = NULL, phone_number = NULL, oauth_id = NULL, is_deleted = 1
WHERE account_id = ? AND is_deleted = 0
"#,
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        filter: &AccountSearchFilter,
        page_size: u32,
    ) -> Result<AccountSearchPage, AuthError> {
        let mut where_clause = String::from("WHERE is_deleted = 0");
        let mut like_binds: Vec<String> = Vec::new();

        if let Some(username) = &filter.username {
            where_clause.push_str(" AND username LIKE ?");
            like_binds.push(format!("%{}%", username));
        }
        if let Some(nickname) = &filter.nickname {
            where_clause.push_str(" AND nickname LIKE ?");
            like_binds.push(format!("%{}%", nickname));
        }
        if filter.is_banned.is_some() {
            where_clause.push_str(" AND is_banned = ?");
        }

        let count_sql = format!("SELECT COUNT(*) FROM account {where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for like in &like_binds {
            count_query = count_query.bind(like);
        }
        if let Some(is_banned) = filter.is_banned {
            count_query = count_query.bind(is_banned);
        }
        let total = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let page = filter.page.max(1);
        let page_sql = format!(
            r#"
SELECT {RECORD_COLUMNS} FROM account {where_clause}
ORDER BY created_at DESC, account_id DESC
LIMIT ? OFFSET ?
"#
        );
        let mut page_query = sqlx::query(&page_sql);
        for like in &like_binds {
            page_query = page_query.bind(like);
        }
        if let Some(is_banned) = filter.is_banned {
            page_query = page_query.bind(is_banned);
        }
        let rows = page_query
            .bind(page_size as i64)
            .bind(((page - 1) * page_size) as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let list = rows
            .iter()
            .map(|row| AccountSummary {
                account_id: row.get::<AccountId, _>("account_id"),
                username: row.get("username"),
                nickname: row.get("nickname"),
                is_banned: row.get("is_banned"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(AccountSearchPage {
            last_page: (total as u32).div_ceil(page_size),
            list,
        })
    }
}
