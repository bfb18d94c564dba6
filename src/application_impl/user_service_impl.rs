use super::auth_session::AuthSessionManager;
use super::otp_session::OtpSessionManager;
use crate::application_port::{
    AccountSearchFilter, AccountSearchPage, AuthError, ProfileView, UserService,
};
use crate::domain_model::{AccountId, AuthSession, OtpSessionId, SessionId};
use crate::domain_port::{AccountRepo, OAuthClient};
use crate::logger::*;
use std::sync::Arc;

const SEARCH_PAGE_SIZE: u32 = 10;

pub struct RealUserService {
    account_repo: Arc<dyn AccountRepo>,
    session_manager: Arc<AuthSessionManager>,
    otp_manager: Arc<OtpSessionManager>,
    oauth_client: Arc<dyn OAuthClient>,
}

impl RealUserService {
    pub fn new(
        account_repo: Arc<dyn AccountRepo>,
        session_manager: Arc<AuthSessionManager>,
        otp_manager: Arc<OtpSessionManager>,
        oauth_client: Arc<dyn OAuthClient>,
    ) -> Self {
        Self {
            account_repo,
            session_manager,
            otp_manager,
            oauth_client,
        }
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn profile(
        &self,
        account_id: AccountId,
        viewer: &AuthSession,
    ) -> Result<ProfileView, AuthError> {
        let record = self
            .account_repo
            .find_active_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let is_banned = viewer
            .authority_level
            .is_admin()
            .then_some(record.is_banned);
        Ok(ProfileView {
            account_id: record.account_id,
            nickname: record.nickname,
            is_banned,
        })
    }

    async fn update_nickname(
        &self,
        account_id: AccountId,
        nickname: &str,
    ) -> Result<String, AuthError> {
        let stored = format!("{}#{}", nickname, account_id.tag());
        let affected = self
            .account_repo
            .update_nickname(account_id, &stored)
            .await?;
        if affected == 0 {
            return Err(AuthError::AccountNotFound);
        }
        Ok(stored)
    }

    async fn username_available(&self, username: &str) -> Result<bool, AuthError> {
        Ok(!self.account_repo.username_exists(username).await?)
    }

    async fn recover_username(
        &self,
        phone_number: &str,
        otp_session_id: &OtpSessionId,
    ) -> Result<String, AuthError> {
        self.otp_manager
            .take_verified(otp_session_id, phone_number)
            .await?;
        self.account_repo
            .find_username_by_phone(phone_number)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    async fn delete_account(&self, session_id: &SessionId) -> Result<(), AuthError> {
        let Some(session) = self.session_manager.get(session_id).await? else {
            return Err(AuthError::NotSignedIn);
        };

        if let Some(token) = &session.oauth_provider_token {
            if let Err(err) = self.oauth_client.unlink(token).await {
                warn!("provider unlink failed during account deletion: {err}");
            }
        }

        self.account_repo
            .release_and_soft_delete(session.account_id)
            .await?;
        self.session_manager.destroy(session_id).await?;
        info!("account {} deleted", session.account_id);
        Ok(())
    }

    async fn search(&self, filter: AccountSearchFilter) -> Result<AccountSearchPage, AuthError> {
        self.account_repo.search(&filter, SEARCH_PAGE_SIZE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2PasswordHasher, RealAuthService, RealOtpService};
    use crate::application_port::{AuthService, OtpService, SignupInput};
    use crate::domain_model::{AuthorityLevel, OTP_TTL, SESSION_TTL};
    use crate::domain_port::TokenStore;
    use crate::infra_http::{FakeOAuthClient, FakeSmsCarrier};
    use crate::infra_memory::{MemoryAccountRepo, MemoryTokenStore};

    const PHONE: &str = "01000000000";

    struct Fixture {
        user: RealUserService,
        auth: RealAuthService,
        otp: RealOtpService,
        carrier: Arc<FakeSmsCarrier>,
        oauth: Arc<FakeOAuthClient>,
        repo: Arc<MemoryAccountRepo>,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let carrier = Arc::new(FakeSmsCarrier::new());
        let oauth = Arc::new(FakeOAuthClient::new());
        let repo = Arc::new(MemoryAccountRepo::new());

        let session_manager = Arc::new(AuthSessionManager::new(store.clone(), SESSION_TTL));
        let otp_manager = Arc::new(OtpSessionManager::new(
            store,
            OTP_TTL,
            b"test-digest-key".to_vec(),
            carrier.clone(),
        ));

        let user = RealUserService::new(
            repo.clone(),
            session_manager.clone(),
            otp_manager.clone(),
            oauth.clone(),
        );
        let auth = RealAuthService::new(
            session_manager,
            otp_manager.clone(),
            repo.clone(),
            oauth.clone(),
            Arc::new(Argon2PasswordHasher),
        );
        let otp = RealOtpService::new(otp_manager);
        Fixture {
            user,
            auth,
            otp,
            carrier,
            oauth,
            repo,
        }
    }

    async fn verified_otp(fx: &Fixture, phone: &str) -> OtpSessionId {
        let issued = fx.otp.request_code(phone).await.unwrap();
        let message = fx.carrier.last_message().unwrap();
        let code = message.rsplit(' ').next().unwrap().to_string();
        fx.otp
            .confirm_code(&issued.otp_session_id, phone, &code)
            .await
            .unwrap();
        issued.otp_session_id
    }

    async fn signup(fx: &Fixture, username: &str, phone: &str) -> AccountId {
        let otp_session_id = verified_otp(fx, phone).await;
        fx.auth
            .signup(SignupInput {
                username: username.into(),
                password: "hunter22".into(),
                phone_number: phone.into(),
                otp_session_id,
            })
            .await
            .unwrap()
    }

    fn admin_viewer() -> AuthSession {
        AuthSession {
            account_id: AccountId::generate(),
            authority_level: AuthorityLevel::Admin,
            oauth_provider_token: None,
        }
    }

    fn member_viewer() -> AuthSession {
        AuthSession {
            account_id: AccountId::generate(),
            authority_level: AuthorityLevel::Member,
            oauth_provider_token: None,
        }
    }

    #[tokio::test]
    async fn profile_hides_ban_state_from_members() {
        let fx = fixture();
        let account_id = signup(&fx, "bob", PHONE).await;

        let member_view = fx.user.profile(account_id, &member_viewer()).await.unwrap();
        assert!(member_view.is_banned.is_none());

        let admin_view = fx.user.profile(account_id, &admin_viewer()).await.unwrap();
        assert_eq!(admin_view.is_banned, Some(false));
    }

    #[tokio::test]
    async fn nickname_update_appends_the_account_tag() {
        let fx = fixture();
        let account_id = signup(&fx, "bob", PHONE).await;

        let stored = fx
            .user
            .update_nickname(account_id, "Wordsmith")
            .await
            .unwrap();
        assert_eq!(stored, format!("Wordsmith#{}", account_id.tag()));

        let view = fx.user.profile(account_id, &member_viewer()).await.unwrap();
        assert_eq!(view.nickname, stored);
    }

    #[tokio::test]
    async fn username_availability_flips_on_signup() {
        let fx = fixture();
        assert!(fx.user.username_available("bob").await.unwrap());

        signup(&fx, "bob", PHONE).await;
        assert!(!fx.user.username_available("bob").await.unwrap());
    }

    #[tokio::test]
    async fn recover_username_requires_the_verified_gate() {
        let fx = fixture();
        signup(&fx, "bob", PHONE).await;

        let issued = fx.otp.request_code(PHONE).await.unwrap();
        let unverified = fx
            .user
            .recover_username(PHONE, &issued.otp_session_id)
            .await;
        assert!(matches!(unverified, Err(AuthError::InvalidOtp)));

        let otp_session_id = verified_otp(&fx, PHONE).await;
        let username = fx
            .user
            .recover_username(PHONE, &otp_session_id)
            .await
            .unwrap();
        assert_eq!(username, "bob");

        // The gate consumed the proof.
        let reuse = fx.user.recover_username(PHONE, &otp_session_id).await;
        assert!(matches!(reuse, Err(AuthError::InvalidOtp)));
    }

    #[tokio::test]
    async fn deletion_releases_identifiers_and_ends_the_session() {
        let fx = fixture();
        signup(&fx, "bob", PHONE).await;
        let signin = fx
            .auth
            .signin(crate::application_port::SigninInput {
                username: "bob".into(),
                password: "hunter22".into(),
            })
            .await
            .unwrap();

        fx.user.delete_account(&signin.session_id).await.unwrap();

        let gone = fx.auth.session(&signin.session_id).await;
        assert!(matches!(gone, Err(AuthError::NotSignedIn)));
        assert_eq!(fx.repo.active_row_count(), 0);

        // Released identifiers are immediately reusable.
        assert!(fx.user.username_available("bob").await.unwrap());
        signup(&fx, "bob", PHONE).await;
    }

    #[tokio::test]
    async fn deletion_of_an_oauth_account_unlinks_the_provider() {
        let fx = fixture();
        let signin = fx.auth.oauth_signin("code-alpha").await.unwrap();
        let session = fx.auth.session(&signin.session_id).await.unwrap();
        let token = session.oauth_provider_token.unwrap();

        fx.user.delete_account(&signin.session_id).await.unwrap();
        assert!(fx.oauth.unlinked_tokens().contains(&token));

        // A fresh callback for the same provider identity provisions anew.
        let again = fx.auth.oauth_signin("code-alpha").await.unwrap();
        assert_ne!(again.account_id, signin.account_id);
    }

    #[tokio::test]
    async fn search_pages_newest_first() {
        let fx = fixture();
        for i in 0..13 {
            signup(&fx, &format!("user{i:02}"), &format!("010000000{i:02}")).await;
        }

        let first = fx
            .user
            .search(AccountSearchFilter {
                page: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(first.last_page, 2);
        assert_eq!(first.list.len(), 10);

        let second = fx
            .user
            .search(AccountSearchFilter {
                page: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.list.len(), 3);

        // Newest first across the page boundary.
        assert_eq!(
            second.list.last().unwrap().username.as_deref(),
            Some("user00")
        );
    }

    #[tokio::test]
    async fn search_filters_compose() {
        let fx = fixture();
        signup(&fx, "alpha", "01000000001").await;
        signup(&fx, "beta", "01000000002").await;
        let banned_id = signup(&fx, "gamma", "01000000003").await;
        fx.repo.set_banned(banned_id, true);

        let by_name = fx
            .user
            .search(AccountSearchFilter {
                username: Some("alph".into()),
                page: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.list.len(), 1);
        assert_eq!(by_name.list[0].username.as_deref(), Some("alpha"));

        let banned = fx
            .user
            .search(AccountSearchFilter {
                is_banned: Some(true),
                page: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(banned.list.len(), 1);
        assert_eq!(banned.list[0].username.as_deref(), Some("gamma"));
    }
}
