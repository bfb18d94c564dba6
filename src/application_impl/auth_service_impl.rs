use super::auth_session::AuthSessionManager;
use super::otp_session::OtpSessionManager;
use super::provisioning::{AccountProvisioner, ProvisionOutcome};
use crate::application_port::{
    AuthError, AuthService, CredentialHasher, SigninInput, SigninResult, SignupInput,
};
use crate::domain_model::{AccountId, AuthSession, AuthorityLevel, SessionId};
use crate::domain_port::{AccountRepo, OAuthClient};
use crate::logger::*;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::sync::Arc;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {e}"))),
        }
    }
}

pub struct RealAuthService {
    session_manager: Arc<AuthSessionManager>,
    otp_manager: Arc<OtpSessionManager>,
    account_repo: Arc<dyn AccountRepo>,
    oauth_client: Arc<dyn OAuthClient>,
    credential_hasher: Arc<dyn CredentialHasher>,
    provisioner: AccountProvisioner,
}

impl RealAuthService {
    pub fn new(
        session_manager: Arc<AuthSessionManager>,
        otp_manager: Arc<OtpSessionManager>,
        account_repo: Arc<dyn AccountRepo>,
        oauth_client: Arc<dyn OAuthClient>,
        credential_hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        let provisioner = AccountProvisioner::new(account_repo.clone());
        Self {
            session_manager,
            otp_manager,
            account_repo,
            oauth_client,
            credential_hasher,
            provisioner,
        }
    }

    async fn issue_session(
        &self,
        account_id: AccountId,
        authority_level: AuthorityLevel,
        oauth_provider_token: Option<String>,
    ) -> Result<SigninResult, AuthError> {
        let session_id = self
            .session_manager
            .create(AuthSession {
                account_id,
                authority_level,
                oauth_provider_token,
            })
            .await?;
        Ok(SigninResult {
            session_id,
            account_id,
            ttl: self.session_manager.ttl(),
        })
    }

    async fn revoke_best_effort(&self, access_token: &str) {
        if let Err(err) = self.oauth_client.revoke(access_token).await {
            warn!("provider token revocation failed: {err}");
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn oauth_signin(&self, auth_code: &str) -> Result<SigninResult, AuthError> {
        let access_token = self.oauth_client.exchange_auth_code(auth_code).await?;

        let identity = match self.oauth_client.fetch_identity(&access_token).await {
            Ok(identity) => identity,
            Err(err) => {
                self.revoke_best_effort(&access_token).await;
                return Err(err);
            }
        };

        let record = match self
            .provisioner
            .provision_oauth(&identity.provider_user_id)
            .await
        {
            Ok(ProvisionOutcome::Created(record)) | Ok(ProvisionOutcome::Existing(record)) => {
                record
            }
            Err(err) => {
                self.revoke_best_effort(&access_token).await;
                return Err(err);
            }
        };

        // Covers AlreadySignedIn too: a provider token we cannot hand to the
        // client must not stay usable.
        match self
            .issue_session(
                record.account_id,
                record.authority_level,
                Some(access_token.clone()),
            )
            .await
        {
            Ok(result) => Ok(result),
            Err(err) => {
                self.revoke_best_effort(&access_token).await;
                Err(err)
            }
        }
    }

    async fn signin(&self, request: SigninInput) -> Result<SigninResult, AuthError> {
        let SigninInput { username, password } = request;

        let rec = self
            .account_repo
            .find_credentials_by_username(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_session(rec.account_id, rec.authority_level, None)
            .await
    }

    async fn signup(&self, request: SignupInput) -> Result<AccountId, AuthError> {
        let SignupInput {
            username,
            password,
            phone_number,
            otp_session_id,
        } = request;

        // One-time gate: a failed sign-up afterwards burns the verification.
        self.otp_manager
            .take_verified(&otp_session_id, &phone_number)
            .await?;

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        let account_id = self
            .provisioner
            .provision_local(&username, &password_hash, &phone_number)
            .await?;
        info!("account {account_id} signed up");
        Ok(account_id)
    }

    async fn signout(&self, session_id: &SessionId) -> Result<(), AuthError> {
        let Some(session) = self.session_manager.get(session_id).await? else {
            return Err(AuthError::NotSignedIn);
        };
        if let Some(token) = &session.oauth_provider_token {
            self.revoke_best_effort(token).await;
        }
        self.session_manager.destroy(session_id).await?;
        Ok(())
    }

    async fn session(&self, session_id: &SessionId) -> Result<AuthSession, AuthError> {
        self.session_manager
            .get(session_id)
            .await?
            .ok_or(AuthError::NotSignedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::{OTP_TTL, SESSION_TTL};
    use crate::infra_http::{FakeOAuthClient, FakeSmsCarrier};
    use crate::infra_memory::{MemoryAccountRepo, MemoryTokenStore};
    use crate::application_impl::RealOtpService;
    use crate::application_port::OtpService;

    struct Fixture {
        auth: RealAuthService,
        otp: RealOtpService,
        carrier: Arc<FakeSmsCarrier>,
        oauth: Arc<FakeOAuthClient>,
        repo: Arc<MemoryAccountRepo>,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn crate::domain_port::TokenStore> = Arc::new(MemoryTokenStore::new());
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

        let auth = RealAuthService::new(
            session_manager,
            otp_manager.clone(),
            repo.clone(),
            oauth.clone(),
            Arc::new(Argon2PasswordHasher),
        );
        let otp = RealOtpService::new(otp_manager);
        Fixture {
            auth,
            otp,
            carrier,
            oauth,
            repo,
        }
    }

    async fn verified_otp(fx: &Fixture, phone: &str) -> crate::domain_model::OtpSessionId {
        let issued = fx.otp.request_code(phone).await.unwrap();
        let message = fx.carrier.last_message().unwrap();
        let code = message.rsplit(' ').next().unwrap().to_string();
        fx.otp
            .confirm_code(&issued.otp_session_id, phone, &code)
            .await
            .unwrap();
        issued.otp_session_id
    }

    async fn signup(fx: &Fixture, username: &str, password: &str, phone: &str) -> AccountId {
        let otp_session_id = verified_otp(fx, phone).await;
        fx.auth
            .signup(SignupInput {
                username: username.into(),
                password: password.into(),
                phone_number: phone.into(),
                otp_session_id,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn signup_then_signin_then_signout_roundtrip() {
        let fx = fixture();
        let account_id = signup(&fx, "bob", "hunter22", "01000000000").await;

        let result = fx
            .auth
            .signin(SigninInput {
                username: "bob".into(),
                password: "hunter22".into(),
            })
            .await
            .unwrap();
        assert_eq!(result.account_id, account_id);

        let session = fx.auth.session(&result.session_id).await.unwrap();
        assert_eq!(session.account_id, account_id);
        assert!(session.oauth_provider_token.is_none());

        fx.auth.signout(&result.session_id).await.unwrap();
        let gone = fx.auth.session(&result.session_id).await;
        assert!(matches!(gone, Err(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_username_are_equivalent() {
        let fx = fixture();
        signup(&fx, "bob", "hunter22", "01000000000").await;

        let wrong = fx
            .auth
            .signin(SigninInput {
                username: "bob".into(),
                password: "wrong".into(),
            })
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

        let unknown = fx
            .auth
            .signin(SigninInput {
                username: "nobody".into(),
                password: "hunter22".into(),
            })
            .await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn second_signin_conflicts_until_signout() {
        let fx = fixture();
        signup(&fx, "bob", "hunter22", "01000000000").await;

        let input = SigninInput {
            username: "bob".into(),
            password: "hunter22".into(),
        };
        let first = fx.auth.signin(input.clone()).await.unwrap();
        let second = fx.auth.signin(input.clone()).await;
        assert!(matches!(second, Err(AuthError::AlreadySignedIn)));

        fx.auth.signout(&first.session_id).await.unwrap();
        fx.auth.signin(input).await.unwrap();
    }

    #[tokio::test]
    async fn signup_without_verified_otp_is_rejected() {
        let fx = fixture();
        let issued = fx.otp.request_code("01000000000").await.unwrap();

        // Code never confirmed.
        let result = fx
            .auth
            .signup(SignupInput {
                username: "bob".into(),
                password: "hunter22".into(),
                phone_number: "01000000000".into(),
                otp_session_id: issued.otp_session_id,
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidOtp)));
        assert_eq!(fx.repo.active_row_count(), 0);
    }

    #[tokio::test]
    async fn signup_conflict_burns_the_verification() {
        let fx = fixture();
        signup(&fx, "bob", "hunter22", "01000000000").await;

        let otp_session_id = verified_otp(&fx, "01011111111").await;
        let conflict = fx
            .auth
            .signup(SignupInput {
                username: "bob".into(),
                password: "pw123456".into(),
                phone_number: "01011111111".into(),
                otp_session_id: otp_session_id.clone(),
            })
            .await;
        assert!(matches!(conflict, Err(AuthError::SignupConflict)));

        // The gate consumed the session; a retry needs a fresh code.
        let retry = fx
            .auth
            .signup(SignupInput {
                username: "bob2".into(),
                password: "pw123456".into(),
                phone_number: "01011111111".into(),
                otp_session_id,
            })
            .await;
        assert!(matches!(retry, Err(AuthError::InvalidOtp)));
    }

    #[tokio::test]
    async fn oauth_signin_provisions_once_and_carries_the_token() {
        let fx = fixture();

        let first = fx.auth.oauth_signin("code-alpha").await.unwrap();
        let session = fx.auth.session(&first.session_id).await.unwrap();
        let token = session.oauth_provider_token.clone().unwrap();
        assert_eq!(fx.repo.active_row_count(), 1);

        fx.auth.signout(&first.session_id).await.unwrap();
        // Sign-out revoked the provider token.
        assert!(fx.oauth.revoked_tokens().contains(&token));

        let second = fx.auth.oauth_signin("code-alpha").await.unwrap();
        assert_eq!(second.account_id, first.account_id);
        assert_eq!(fx.repo.active_row_count(), 1);
    }

    #[tokio::test]
    async fn oauth_signin_while_signed_in_revokes_the_fresh_token() {
        let fx = fixture();

        let first = fx.auth.oauth_signin("code-alpha").await.unwrap();
        let conflict = fx.auth.oauth_signin("code-alpha").await;
        assert!(matches!(conflict, Err(AuthError::AlreadySignedIn)));

        // The rejected attempt exchanged a real token; it must not stay live.
        assert_eq!(fx.oauth.revoked_tokens().len(), 1);

        // And the original session is untouched.
        fx.auth.session(&first.session_id).await.unwrap();
    }

    #[tokio::test]
    async fn bad_auth_code_is_rejected() {
        let fx = fixture();
        let result = fx.auth.oauth_signin(FakeOAuthClient::BAD_CODE).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthCode)));
        assert_eq!(fx.repo.active_row_count(), 0);
    }

    #[tokio::test]
    async fn password_hashes_are_salted_phc_strings() {
        let hasher = Argon2PasswordHasher;
        let one = hasher.hash_password("hunter22").await.unwrap();
        let two = hasher.hash_password("hunter22").await.unwrap();

        assert_ne!(one, two);
        assert!(one.starts_with("$argon2"));
        assert!(hasher.verify_password("hunter22", &one).await.unwrap());
        assert!(!hasher.verify_password("wrong", &one).await.unwrap());
    }
}
