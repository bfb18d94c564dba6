use crate::application_port::AuthError;
use crate::domain_port::{OAuthClient, OAuthIdentity};
use serde::Deserialize;

const TOKEN_URL: &str = "https://kauth.kakao.com/oauth/token";
const ME_URL: &str = "https://kapi.kakao.com/v2/user/me";
const LOGOUT_URL: &str = "https://kapi.kakao.com/v1/user/logout";
const UNLINK_URL: &str = "https://kapi.kakao.com/v1/user/unlink";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: Option<i64>,
}

/// Kakao REST client. The provider signals a rejected code or token by
/// omitting the field rather than by status alone, so both are checked.
pub struct KakaoOAuthClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
}

impl KakaoOAuthClient {
    pub fn new(client_id: String, client_secret: Option<String>, redirect_uri: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    async fn bearer_post(&self, url: &str, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::InternalError(format!(
                "kakao returned {} for {}",
                status, url
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl OAuthClient for KakaoOAuthClient {
    async fn exchange_auth_code(&self, auth_code: &str) -> Result<String, AuthError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code", auth_code),
        ];
        if let Some(client_secret) = &self.client_secret {
            form.push(("client_secret", client_secret.as_str()));
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        token.access_token.ok_or(AuthError::InvalidAuthCode)
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<OAuthIdentity, AuthError> {
        let response = self
            .client
            .get(ME_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        let me: MeResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        let id = me.id.ok_or(AuthError::InvalidProviderToken)?;
        Ok(OAuthIdentity {
            provider_user_id: id.to_string(),
        })
    }

    async fn revoke(&self, access_token: &str) -> Result<(), AuthError> {
        self.bearer_post(LOGOUT_URL, access_token).await
    }

    async fn unlink(&self, access_token: &str) -> Result<(), AuthError> {
        self.bearer_post(UNLINK_URL, access_token).await
    }
}
