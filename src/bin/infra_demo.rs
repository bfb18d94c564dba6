/// Drives the credential flows end to end against the memory and fake
/// backends, so it runs without redis, mysql, or provider credentials.
///
/// ```text
/// $ cargo run --bin infra_demo
/// ```
use portcullis::application_impl::*;
use portcullis::application_port::*;
use portcullis::domain_model::*;
use portcullis::infra_http::*;
use portcullis::infra_memory::*;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::new("infra_demo=debug");

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    // region initialization

    let token_store = Arc::new(MemoryTokenStore::new());
    let account_repo = Arc::new(MemoryAccountRepo::new());
    let oauth_client = Arc::new(FakeOAuthClient::new());
    let sms_carrier = Arc::new(FakeSmsCarrier::new());

    let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);

    let session_manager = Arc::new(AuthSessionManager::new(token_store.clone(), SESSION_TTL));
    let otp_manager = Arc::new(OtpSessionManager::new(
        token_store.clone(),
        OTP_TTL,
        b"demo-digest-key".to_vec(),
        sms_carrier.clone(),
    ));
    let reset_manager = Arc::new(PasswordResetManager::new(token_store.clone(), RESET_TTL));

    let auth_service = RealAuthService::new(
        session_manager.clone(),
        otp_manager.clone(),
        account_repo.clone(),
        oauth_client.clone(),
        credential_hasher.clone(),
    );
    let otp_service = RealOtpService::new(otp_manager.clone());
    let password_reset_service = RealPasswordResetService::new(
        reset_manager,
        otp_manager.clone(),
        account_repo.clone(),
        credential_hasher,
    );
    let user_service = RealUserService::new(
        account_repo.clone(),
        session_manager,
        otp_manager,
        oauth_client.clone(),
    );

    // endregion

    // use cases

    const PHONE: &str = "01012345678";

    let issued = otp_service.request_code(PHONE).await?;
    tracing::debug!("otp issued: delivery_ok={}", issued.delivery_ok);

    let code = sms_carrier
        .last_message()
        .and_then(|m| m.strip_prefix("verification code: ").map(str::to_string))
        .ok_or_else(|| anyhow::anyhow!("no sms recorded"))?;
    otp_service
        .confirm_code(&issued.otp_session_id, PHONE, &code)
        .await?;

    let account_id = auth_service
        .signup(SignupInput {
            username: "demo_user".to_string(),
            password: "demo-pass-1".to_string(),
            phone_number: PHONE.to_string(),
            otp_session_id: issued.otp_session_id,
        })
        .await?;
    tracing::debug!("signed up: {}", account_id);

    let signin = auth_service
        .signin(SigninInput {
            username: "demo_user".to_string(),
            password: "demo-pass-1".to_string(),
        })
        .await?;
    tracing::debug!("signed in: account={} ttl={:?}", signin.account_id, signin.ttl);

    let session = auth_service.session(&signin.session_id).await?;

    let profile = user_service.profile(signin.account_id, &session).await?;
    tracing::debug!("profile: {:?}", profile);

    let stored = user_service.update_nickname(signin.account_id, "koala").await?;
    tracing::debug!("nickname stored as: {}", stored);

    let available = user_service.username_available("demo_user").await?;
    tracing::debug!("demo_user still available: {}", available);

    let recovered = user_service
        .recover_username(PHONE, &verified_otp(&otp_service, &sms_carrier, PHONE).await?)
        .await?;
    tracing::debug!("recovered username: {}", recovered);

    let reset = password_reset_service
        .request_reset(ResetRequestInput {
            username: "demo_user".to_string(),
            phone_number: PHONE.to_string(),
            otp_session_id: verified_otp(&otp_service, &sms_carrier, PHONE).await?,
        })
        .await?;
    password_reset_service
        .complete_reset(&reset.reset_token_id, "demo-pass-2")
        .await?;

    let signin = auth_service
        .signin(SigninInput {
            username: "demo_user".to_string(),
            password: "demo-pass-2".to_string(),
        })
        .await?;
    tracing::debug!("signed in with the new password: {}", signin.account_id);
    auth_service.signout(&signin.session_id).await?;

    let oauth = auth_service.oauth_signin("demo-auth-code").await?;
    tracing::debug!("kakao signin: account={}", oauth.account_id);

    let page = user_service
        .search(AccountSearchFilter {
            page: 1,
            ..Default::default()
        })
        .await?;
    tracing::debug!(
        "search page 1: last_page={} rows={}",
        page.last_page,
        page.list.len()
    );

    user_service.delete_account(&oauth.session_id).await?;
    tracing::debug!("unlinked on delete: {:?}", oauth_client.unlinked_tokens());

    Ok(())
}

/// Requests a fresh code, reads it back off the fake carrier, and confirms
/// it, returning a session that passes the verified-OTP gates.
async fn verified_otp(
    otp_service: &RealOtpService,
    sms_carrier: &FakeSmsCarrier,
    phone_number: &str,
) -> anyhow::Result<OtpSessionId> {
    let issued = otp_service.request_code(phone_number).await?;
    let code = sms_carrier
        .last_message()
        .and_then(|m| m.strip_prefix("verification code: ").map(str::to_string))
        .ok_or_else(|| anyhow::anyhow!("no sms recorded"))?;
    otp_service
        .confirm_code(&issued.otp_session_id, phone_number, &code)
        .await?;
    Ok(issued.otp_session_id)
}
