use crate::application_port::AuthError;
use crate::domain_model::AccountId;
use crate::domain_port::{AccountRecord, AccountRepo};
use crate::logger::*;
use std::sync::Arc;

const DEFAULT_NICKNAME_BASE: &str = "user";

/// How an account resolution ended: this request inserted the row, or a
/// row (possibly inserted by a concurrent request) was already there.
#[derive(Debug, Clone)]
pub enum ProvisionOutcome {
    Created(AccountRecord),
    Existing(AccountRecord),
}

/// Resolves creation races through the repository's conditional inserts.
pub struct AccountProvisioner {
    account_repo: Arc<dyn AccountRepo>,
}

impl AccountProvisioner {
    pub fn new(account_repo: Arc<dyn AccountRepo>) -> Self {
        Self { account_repo }
    }

    fn default_nickname(account_id: AccountId) -> String {
        format!("{DEFAULT_NICKNAME_BASE}#{}", account_id.tag())
    }

    /// Resolve-or-create for a provider identity. Of two racing calls exactly
    /// one inserts; the other's zero-row insert falls through to the
    /// winner's row.
    pub async fn provision_oauth(&self, oauth_id: &str) -> Result<ProvisionOutcome, AuthError> {
        if let Some(existing) = self.account_repo.find_active_by_oauth_id(oauth_id).await? {
            return Ok(ProvisionOutcome::Existing(existing));
        }

        let account_id = AccountId::generate();
        let nickname = Self::default_nickname(account_id);
        let inserted = self
            .account_repo
            .insert_oauth_if_absent(account_id, oauth_id, &nickname)
            .await?;

        match self.account_repo.find_active_by_oauth_id(oauth_id).await? {
            Some(record) if inserted => {
                info!("provisioned account {} for provider identity", record.account_id);
                Ok(ProvisionOutcome::Created(record))
            }
            Some(record) => Ok(ProvisionOutcome::Existing(record)),
            // Neither our insert nor a concurrent one is visible.
            None => Err(AuthError::ProvisioningFailed),
        }
    }

    /// Conditional sign-up insert. A zero-row insert means an active account
    /// already holds the username or the phone number.
    pub async fn provision_local(
        &self,
        username: &str,
        password_hash: &str,
        phone_number: &str,
    ) -> Result<AccountId, AuthError> {
        let account_id = AccountId::generate();
        let nickname = Self::default_nickname(account_id);
        let inserted = self
            .account_repo
            .insert_local_if_absent(account_id, username, password_hash, phone_number, &nickname)
            .await?;
        if !inserted {
            return Err(AuthError::SignupConflict);
        }
        Ok(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemoryAccountRepo;

    fn provisioner() -> (AccountProvisioner, Arc<MemoryAccountRepo>) {
        let repo = Arc::new(MemoryAccountRepo::new());
        (AccountProvisioner::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn first_oauth_signin_creates_then_resolves_existing() {
        let (provisioner, _repo) = provisioner();

        let first = provisioner.provision_oauth("kakao:1001").await.unwrap();
        let ProvisionOutcome::Created(created) = first else {
            panic!("expected a created account");
        };
        assert_eq!(created.nickname, format!("user#{}", created.account_id.tag()));

        let second = provisioner.provision_oauth("kakao:1001").await.unwrap();
        let ProvisionOutcome::Existing(existing) = second else {
            panic!("expected the existing account");
        };
        assert_eq!(existing.account_id, created.account_id);
    }

    #[tokio::test]
    async fn racing_oauth_signins_share_one_account() {
        let (provisioner, repo) = provisioner();
        let provisioner = Arc::new(provisioner);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let provisioner = provisioner.clone();
            tasks.push(tokio::spawn(async move {
                provisioner.provision_oauth("kakao:2002").await
            }));
        }

        let mut created = 0;
        let mut ids = Vec::new();
        for task in tasks {
            match task.await.unwrap().unwrap() {
                ProvisionOutcome::Created(record) => {
                    created += 1;
                    ids.push(record.account_id);
                }
                ProvisionOutcome::Existing(record) => ids.push(record.account_id),
            }
        }

        assert_eq!(created, 1);
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(repo.active_row_count(), 1);
    }

    #[tokio::test]
    async fn local_signup_conflicts_on_held_username() {
        let (provisioner, _repo) = provisioner();

        provisioner
            .provision_local("bob", "phc-hash", "01000000000")
            .await
            .unwrap();

        let by_username = provisioner
            .provision_local("bob", "phc-hash", "01011111111")
            .await;
        assert!(matches!(by_username, Err(AuthError::SignupConflict)));

        let by_phone = provisioner
            .provision_local("alice", "phc-hash", "01000000000")
            .await;
        assert!(matches!(by_phone, Err(AuthError::SignupConflict)));
    }
}
