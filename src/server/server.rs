use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::{OTP_TTL, RESET_TTL, SESSION_TTL};
use crate::domain_port::*;
use crate::infra_http::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub otp_service: Arc<dyn OtpService>,
    pub password_reset_service: Arc<dyn PasswordResetService>,
    pub user_service: Arc<dyn UserService>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let cancel = CancellationToken::new();

        let mut sweeper_handle: Option<JoinHandle<()>> = None;
        let token_store: Arc<dyn TokenStore> = match settings.token_store.backend.as_str() {
            "memory" => {
                let store = Arc::new(MemoryTokenStore::new());
                let sweep_store = store.clone();
                let sweep_cancel = cancel.clone();
                sweeper_handle = Some(tokio::spawn(async move {
                    let mut tick = tokio::time::interval(SWEEP_INTERVAL);
                    loop {
                        tokio::select! {
                            _ = sweep_cancel.cancelled() => break,
                            _ = tick.tick() => sweep_store.sweep_expired(),
                        }
                    }
                }));
                store
            }
            "redis" => {
                let dsn = settings.token_store.redis_dsn.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("token_store.redis_dsn is required for the redis backend")
                })?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisTokenStore::new(redis_manager))
            }
            other => return Err(anyhow::anyhow!("Unknown token_store backend: {}", other)),
        };

        let mut pool: Option<Pool<MySql>> = None;
        let account_repo: Arc<dyn AccountRepo> = match settings.account_repo.backend.as_str() {
            "memory" => Arc::new(MemoryAccountRepo::new()),
            "mysql" => {
                let dsn = settings.account_repo.mysql_dsn.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("account_repo.mysql_dsn is required for the mysql backend")
                })?;
                let mysql_pool = Pool::<MySql>::connect(dsn).await?;
                pool = Some(mysql_pool.clone());
                Arc::new(MySqlAccountRepo::new(mysql_pool))
            }
            other => return Err(anyhow::anyhow!("Unknown account_repo backend: {}", other)),
        };

        let oauth_client: Arc<dyn OAuthClient> = match settings.oauth.backend.as_str() {
            "fake" => Arc::new(FakeOAuthClient::new()),
            "kakao" => {
                let client_id = settings.oauth.client_id.clone().ok_or_else(|| {
                    anyhow::anyhow!("oauth.client_id is required for the kakao backend")
                })?;
                let redirect_uri = settings.oauth.redirect_uri.clone().ok_or_else(|| {
                    anyhow::anyhow!("oauth.redirect_uri is required for the kakao backend")
                })?;
                Arc::new(KakaoOAuthClient::new(
                    client_id,
                    settings.oauth.client_secret.clone(),
                    redirect_uri,
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown oauth backend: {}", other)),
        };

        let sms_carrier: Arc<dyn SmsCarrier> = match settings.sms.backend.as_str() {
            "fake" => Arc::new(FakeSmsCarrier::new()),
            "twilio" => {
                let account_sid = settings.sms.account_sid.clone().ok_or_else(|| {
                    anyhow::anyhow!("sms.account_sid is required for the twilio backend")
                })?;
                let auth_token = settings.sms.auth_token.clone().ok_or_else(|| {
                    anyhow::anyhow!("sms.auth_token is required for the twilio backend")
                })?;
                let from_number = settings.sms.from_number.clone().ok_or_else(|| {
                    anyhow::anyhow!("sms.from_number is required for the twilio backend")
                })?;
                Arc::new(TwilioSmsCarrier::new(account_sid, auth_token, from_number))
            }
            other => return Err(anyhow::anyhow!("Unknown sms backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);

        let session_manager = Arc::new(AuthSessionManager::new(token_store.clone(), SESSION_TTL));
        let otp_manager = Arc::new(OtpSessionManager::new(
            token_store.clone(),
            OTP_TTL,
            settings.otp.digest_key.clone().into_bytes(),
            sms_carrier.clone(),
        ));
        let reset_manager = Arc::new(PasswordResetManager::new(token_store.clone(), RESET_TTL));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            session_manager.clone(),
            otp_manager.clone(),
            account_repo.clone(),
            oauth_client.clone(),
            credential_hasher.clone(),
        ));

        let otp_service: Arc<dyn OtpService> = Arc::new(RealOtpService::new(otp_manager.clone()));

        let password_reset_service: Arc<dyn PasswordResetService> =
            Arc::new(RealPasswordResetService::new(
                reset_manager,
                otp_manager.clone(),
                account_repo.clone(),
                credential_hasher,
            ));

        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(
            account_repo,
            session_manager,
            otp_manager,
            oauth_client,
        ));

        info!("server started");

        Ok(Self {
            auth_service,
            otp_service,
            password_reset_service,
            user_service,
            sweeper_handle: Mutex::new(sweeper_handle),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let sweeper = self
            .sweeper_handle
            .lock()
            .ok()
            .and_then(|mut lock| lock.take());
        if let Some(handle) = sweeper {
            let r = handle.await;
            info!("token sweeper stopped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
