use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        code.clone()
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::MethodNotAllowed
    } else if err.find::<reject::MissingCookie>().is_some() {
        // A guard cookie that never arrived reads as "not signed in".
        ApiErrorCode::NotSignedIn
    } else if err.find::<warp::body::BodyDeserializeError>().is_some()
        || err.find::<reject::InvalidQuery>().is_some()
    {
        ApiErrorCode::InvalidRequest
    } else {
        warn!("unhandled rejection: {:?}", err);
        ApiErrorCode::InternalError
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    #[error("Invalid authorization code")]
    InvalidAuthCode,
    #[error("Invalid provider token")]
    InvalidProviderToken,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Sign in required")]
    NotSignedIn,
    #[error("Verification code does not match")]
    InvalidOtp,
    #[error("Password reset window is no longer valid")]
    #[serde(rename = "INVALID_OR_EXPIRED_RESET_TOKEN")]
    InvalidResetToken,
    #[error("Account no longer matches the reset request")]
    #[serde(rename = "ACCOUNT_NO_LONGER_MATCHES")]
    AccountMismatch,
    #[error("Already signed in")]
    AlreadySignedIn,
    #[error("Username or phone number already in use")]
    SignupConflict,
    #[error("Account not found")]
    AccountNotFound,
    #[error("Admin authority required")]
    Forbidden,
    #[error("Invalid request")]
    InvalidRequest,
    #[error("No such route")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidAuthCode
            | ApiErrorCode::InvalidProviderToken
            | ApiErrorCode::InvalidCredentials
            | ApiErrorCode::NotSignedIn => StatusCode::UNAUTHORIZED,
            ApiErrorCode::InvalidOtp
            | ApiErrorCode::InvalidResetToken
            | ApiErrorCode::AccountMismatch
            | ApiErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::AlreadySignedIn | ApiErrorCode::SignupConflict => StatusCode::CONFLICT,
            ApiErrorCode::AccountNotFound | ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidAuthCode => ApiErrorCode::InvalidAuthCode,
            AuthError::InvalidProviderToken => ApiErrorCode::InvalidProviderToken,
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::AlreadySignedIn => ApiErrorCode::AlreadySignedIn,
            AuthError::NotSignedIn => ApiErrorCode::NotSignedIn,
            AuthError::InvalidOtp => ApiErrorCode::InvalidOtp,
            AuthError::InvalidResetToken => ApiErrorCode::InvalidResetToken,
            AuthError::AccountMismatch => ApiErrorCode::AccountMismatch,
            AuthError::SignupConflict => ApiErrorCode::SignupConflict,
            AuthError::ProvisioningFailed => ApiErrorCode::internal("account provisioning failed"),
            AuthError::AccountNotFound => ApiErrorCode::AccountNotFound,
            AuthError::Forbidden => ApiErrorCode::Forbidden,
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
