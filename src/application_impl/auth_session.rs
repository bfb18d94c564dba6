use super::token_namespace::{TokenNamespace, new_token_id};
use crate::application_port::AuthError;
use crate::domain_model::{AccountId, AuthSession, SessionId};
use crate::domain_port::TokenStore;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;

/// Owner slots must outlive their session, so an expired session can never
/// leave a gate that opens before its slot is reclaimed.
const OWNER_TTL_PAD: Duration = Duration::from_secs(1);

/// Primary session namespace plus the per-account owner slot that enforces
/// at most one live session per account.
///
/// The slot `sessionOwner:{accountId}` holds the id of the account's current
/// session and is claimed with an atomic create-if-absent. The session entry
/// is written before the claim, so a claimed slot always names a written
/// session and a slot whose session is missing is provably dead. Destroying a
/// session releases the slot only while it still names that session, so a
/// late destroy of a stale session cannot free a newer sign-in's slot.
pub struct AuthSessionManager {
    store: Arc<dyn TokenStore>,
    sessions: TokenNamespace<AuthSession>,
}

impl AuthSessionManager {
    pub fn new(store: Arc<dyn TokenStore>, ttl: Duration) -> Self {
        let sessions = TokenNamespace::new(store.clone(), "session", ttl);
        Self { store, sessions }
    }

    pub fn ttl(&self) -> Duration {
        self.sessions.ttl()
    }

    fn owner_key(account_id: AccountId) -> String {
        format!("sessionOwner:{account_id}")
    }

    /// Issues a session for the payload's account, failing with
    /// `AlreadySignedIn` while another session is live.
    pub async fn create(&self, payload: AuthSession) -> Result<SessionId, AuthError> {
        let owner_key = Self::owner_key(payload.account_id);
        let session_id = new_token_id();
        let owner_ttl = self.sessions.ttl() + OWNER_TTL_PAD;

        // Session entry first, slot second. An unclaimed entry is unreachable
        // (its id has not left this method) and expires on its own if the
        // claim below is lost or never happens.
        self.sessions.put(&session_id, &payload).await?;

        let mut claimed = self
            .store
            .put_if_absent(&owner_key, &session_id, owner_ttl)
            .await?;
        if !claimed && self.reclaim_if_stale(&owner_key).await? {
            // The previous holder left no live session; one retry after the
            // reclaim. A concurrent sign-in may still win the slot.
            claimed = self
                .store
                .put_if_absent(&owner_key, &session_id, owner_ttl)
                .await?;
        }
        if !claimed {
            if let Err(err) = self.sessions.remove(&session_id).await {
                warn!("orphan session cleanup failed: {err}");
            }
            return Err(AuthError::AlreadySignedIn);
        }

        Ok(SessionId(session_id))
    }

    pub async fn get(&self, session_id: &SessionId) -> Result<Option<AuthSession>, AuthError> {
        Ok(self.sessions.get(&session_id.0).await?)
    }

    /// True while a live session exists for the account.
    pub async fn is_signed_in(&self, account_id: AccountId) -> Result<bool, AuthError> {
        let owner_key = Self::owner_key(account_id);
        let Some(session_id) = self.store.get(&owner_key).await? else {
            return Ok(false);
        };
        if self.sessions.get(&session_id).await?.is_some() {
            return Ok(true);
        }
        // The session died before its slot; free the gate.
        self.store.remove_if_equals(&owner_key, &session_id).await?;
        Ok(false)
    }

    /// Destroys the session and releases its owner slot. Idempotent; returns
    /// the payload that was live, if any.
    pub async fn destroy(&self, session_id: &SessionId) -> Result<Option<AuthSession>, AuthError> {
        let taken = self.sessions.take(&session_id.0).await?;
        if let Some(session) = &taken {
            let owner_key = Self::owner_key(session.account_id);
            self.store.remove_if_equals(&owner_key, &session_id.0).await?;
        }
        Ok(taken)
    }

    /// A slot whose session is gone (expired inside the slot's TTL pad) is
    /// removed. True when the slot is clear afterwards.
    async fn reclaim_if_stale(&self, owner_key: &str) -> Result<bool, AuthError> {
        let Some(session_id) = self.store.get(owner_key).await? else {
            return Ok(true);
        };
        if self.sessions.get(&session_id).await?.is_some() {
            return Ok(false);
        }
        self.store.remove_if_equals(owner_key, &session_id).await?;
        Ok(true)
    }
}
