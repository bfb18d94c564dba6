use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct AccountId(pub uuid::Uuid);

impl AccountId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Short tag used to disambiguate display names (`nickname#tag`).
    pub fn tag(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(AccountId)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    Member,
    Admin,
}

impl AuthorityLevel {
    pub fn is_admin(&self) -> bool {
        matches!(self, AuthorityLevel::Admin)
    }
}
