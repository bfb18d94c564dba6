use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use warp::http::StatusCode;
use warp::http::header::SET_COOKIE;
use warp::{self, reject};

pub const SESSION_COOKIE: &str = "sessionId";
pub const OTP_COOKIE: &str = "smsAuthId";
pub const RESET_COOKIE: &str = "passwordChangeAuthId";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn set_cookie(name: &str, value: impl std::fmt::Display, max_age: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Secure; Max-Age={}",
        name,
        value,
        max_age.as_secs()
    )
}

fn clear_cookie(name: &str) -> String {
    format!("{}=none; HttpOnly; Path=/; Secure; Max-Age=0", name)
}

// `warp::reply::with_header` overwrites same-name headers, so replies that
// carry Set-Cookie go through the response builder, which appends.
fn reply_with_cookies<T: Serialize>(
    response: &ApiResponse<T>,
    status: StatusCode,
    cookies: &[String],
) -> Result<warp::http::Response<warp::hyper::Body>, warp::Rejection> {
    let body = serde_json::to_vec(response)
        .map_err(|e| reject::custom(ApiErrorCode::internal(e)))?;

    let mut builder = warp::http::Response::builder()
        .status(status)
        .header(warp::http::header::CONTENT_TYPE, "application/json");
    for cookie in cookies {
        builder = builder.header(SET_COOKIE, cookie);
    }
    builder
        .body(warp::hyper::Body::from(body))
        .map_err(|e| reject::custom(ApiErrorCode::internal(e)))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse;

#[derive(Debug, Deserialize)]
pub struct KakaoCallbackQuery {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninResponse {
    pub account_id: AccountId,
}

pub async fn oauth_callback(
    query: KakaoCallbackQuery,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = auth_service
        .oauth_signin(&query.code)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    reply_with_cookies(
        &ApiResponse::ok(SigninResponse {
            account_id: result.account_id,
        }),
        StatusCode::OK,
        &[set_cookie(SESSION_COOKIE, &result.session_id, result.ttl)],
    )
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

pub async fn signin(
    body: SigninRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let signin_input = SigninInput {
        username: body.username,
        password: body.password,
    };
    let result = auth_service
        .signin(signin_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    reply_with_cookies(
        &ApiResponse::ok(SigninResponse {
            account_id: result.account_id,
        }),
        StatusCode::OK,
        &[set_cookie(SESSION_COOKIE, &result.session_id, result.ttl)],
    )
}

pub async fn signout(
    session_id: SessionId,
    _session: AuthSession,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .signout(&session_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    reply_with_cookies(
        &ApiResponse::ok(StatusResponse),
        StatusCode::OK,
        &[clear_cookie(SESSION_COOKIE)],
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub phone_number: String,
}

pub async fn signup(
    otp_cookie: Option<String>,
    body: SignupRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let otp_session_id = otp_cookie
        .map(OtpSessionId)
        .ok_or(ApiErrorCode::InvalidOtp)
        .map_err(reject::custom)?;

    let signup_input = SignupInput {
        username: body.username,
        password: body.password,
        phone_number: body.phone_number,
        otp_session_id,
    };
    auth_service
        .signup(signup_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    reply_with_cookies(
        &ApiResponse::ok(StatusResponse),
        StatusCode::OK,
        &[clear_cookie(OTP_COOKIE)],
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCodeQuery {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCodeResponse {
    pub delivery_ok: bool,
}

pub async fn request_auth_code(
    query: AuthCodeQuery,
    otp_service: Arc<dyn OtpService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let issued = otp_service
        .request_code(&query.phone_number)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    reply_with_cookies(
        &ApiResponse::ok(AuthCodeResponse {
            delivery_ok: issued.delivery_ok,
        }),
        StatusCode::OK,
        &[set_cookie(OTP_COOKIE, &issued.otp_session_id, issued.ttl)],
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCodeCheckRequest {
    pub auth_number: String,
    pub phone_number: String,
}

pub async fn check_auth_code(
    otp_cookie: Option<String>,
    body: AuthCodeCheckRequest,
    otp_service: Arc<dyn OtpService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let otp_session_id = otp_cookie
        .map(OtpSessionId)
        .ok_or(ApiErrorCode::InvalidOtp)
        .map_err(reject::custom)?;

    otp_service
        .confirm_code(&otp_session_id, &body.phone_number, &body.auth_number)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(StatusResponse)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequestBody {
    pub username: String,
    pub phone_number: String,
}

pub async fn request_password_reset(
    otp_cookie: Option<String>,
    body: ResetRequestBody,
    reset_service: Arc<dyn PasswordResetService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let otp_session_id = otp_cookie
        .map(OtpSessionId)
        .ok_or(ApiErrorCode::InvalidOtp)
        .map_err(reject::custom)?;

    let issued = reset_service
        .request_reset(ResetRequestInput {
            username: body.username,
            phone_number: body.phone_number,
            otp_session_id,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    reply_with_cookies(
        &ApiResponse::ok(StatusResponse),
        StatusCode::OK,
        &[
            set_cookie(RESET_COOKIE, &issued.reset_token_id, issued.ttl),
            clear_cookie(OTP_COOKIE),
        ],
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetCompleteBody {
    pub new_password: String,
}

/// The reset grant is single-use, so the cookie is cleared whether the
/// update succeeded or not.
pub async fn complete_password_reset(
    reset_cookie: Option<String>,
    body: ResetCompleteBody,
    reset_service: Arc<dyn PasswordResetService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let reset_token_id = reset_cookie
        .map(ResetTokenId)
        .ok_or(ApiErrorCode::InvalidResetToken)
        .map_err(reject::custom)?;

    let cleared = [clear_cookie(RESET_COOKIE)];
    match reset_service
        .complete_reset(&reset_token_id, &body.new_password)
        .await
    {
        Ok(()) => reply_with_cookies(&ApiResponse::ok(StatusResponse), StatusCode::OK, &cleared),
        Err(error) => {
            let code = ApiErrorCode::from(error);
            reply_with_cookies(
                &ApiResponse::<()>::err(code.clone(), code.to_string()),
                code.status(),
                &cleared,
            )
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverUsernameRequest {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct RecoverUsernameResponse {
    pub username: String,
}

pub async fn recover_username(
    otp_cookie: Option<String>,
    body: RecoverUsernameRequest,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let otp_session_id = otp_cookie
        .map(OtpSessionId)
        .ok_or(ApiErrorCode::InvalidOtp)
        .map_err(reject::custom)?;

    let username = user_service
        .recover_username(&body.phone_number, &otp_session_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    reply_with_cookies(
        &ApiResponse::ok(RecoverUsernameResponse { username }),
        StatusCode::OK,
        &[clear_cookie(OTP_COOKIE)],
    )
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

pub async fn check_username_availability(
    query: AvailabilityQuery,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let available = user_service
        .username_available(&query.username)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(AvailabilityResponse {
        available,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub is_banned: Option<bool>,
    pub page: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub account_id: AccountId,
    pub username: Option<String>,
    pub nickname: String,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub last_page: u32,
    pub list: Vec<SearchEntry>,
}

pub async fn search_accounts(
    query: SearchQuery,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let filter = AccountSearchFilter {
        username: query.username,
        nickname: query.nickname,
        is_banned: query.is_banned,
        page: query.page,
    };
    let page = user_service
        .search(filter)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = SearchResponse {
        last_page: page.last_page,
        list: page
            .list
            .into_iter()
            .map(|summary| SearchEntry {
                account_id: summary.account_id,
                username: summary.username,
                nickname: summary.nickname,
                is_banned: summary.is_banned,
                created_at: summary.created_at,
            })
            .collect(),
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub account_id: AccountId,
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_banned: Option<bool>,
}

pub async fn profile(
    account_id: AccountId,
    _session_id: SessionId,
    session: AuthSession,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let view = user_service
        .profile(account_id, &session)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(ProfileResponse {
        account_id: view.account_id,
        nickname: view.nickname,
        is_banned: view.is_banned,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateNicknameRequest {
    pub nickname: String,
}

#[derive(Debug, Serialize)]
pub struct NicknameResponse {
    pub nickname: String,
}

pub async fn update_nickname(
    body: UpdateNicknameRequest,
    _session_id: SessionId,
    session: AuthSession,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let stored = user_service
        .update_nickname(session.account_id, &body.nickname)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(NicknameResponse {
        nickname: stored,
    })))
}

pub async fn delete_account(
    session_id: SessionId,
    _session: AuthSession,
    user_service: Arc<dyn UserService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    user_service
        .delete_account(&session_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    reply_with_cookies(
        &ApiResponse::ok(StatusResponse),
        StatusCode::OK,
        &[clear_cookie(SESSION_COOKIE)],
    )
}
