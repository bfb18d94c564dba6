use super::error::*;
use super::handler;
use crate::api::v1::handler::{AuthCodeQuery, AvailabilityQuery, KakaoCallbackQuery, SearchQuery};
use crate::application_port::AuthService;
use crate::domain_model::{AccountId, AuthSession, SessionId};
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let oauth_callback = warp::get()
        .and(warp::path("oauth"))
        .and(warp::path("kakao"))
        .and(warp::path::end())
        .and(guest_only(server.auth_service.clone()))
        .and(warp::query::<KakaoCallbackQuery>())
        .and(with(server.auth_service.clone()))
        .and_then(handler::oauth_callback);

    let auth_code = warp::get()
        .and(warp::path("auth-code"))
        .and(warp::path::end())
        .and(warp::query::<AuthCodeQuery>())
        .and(with(server.otp_service.clone()))
        .and_then(handler::request_auth_code);

    let auth_code_check = warp::post()
        .and(warp::path("auth-code"))
        .and(warp::path("check"))
        .and(warp::path::end())
        .and(warp::cookie::optional::<String>(handler::OTP_COOKIE))
        .and(warp::body::json())
        .and(with(server.otp_service.clone()))
        .and_then(handler::check_auth_code);

    let signin = warp::post()
        .and(warp::path("signin"))
        .and(warp::path::end())
        .and(guest_only(server.auth_service.clone()))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signin);

    let signout = warp::get()
        .and(warp::path("signout"))
        .and(warp::path::end())
        .and(with_session(server.auth_service.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::signout);

    let signup = warp::post()
        .and(warp::path::end())
        .and(guest_only(server.auth_service.clone()))
        .and(warp::cookie::optional::<String>(handler::OTP_COOKIE))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signup);

    let reset_request = warp::post()
        .and(warp::path("find"))
        .and(warp::path("pw"))
        .and(warp::path::end())
        .and(guest_only(server.auth_service.clone()))
        .and(warp::cookie::optional::<String>(handler::OTP_COOKIE))
        .and(warp::body::json())
        .and(with(server.password_reset_service.clone()))
        .and_then(handler::request_password_reset);

    let reset_complete = warp::put()
        .and(warp::path("find"))
        .and(warp::path("pw"))
        .and(warp::path::end())
        .and(guest_only(server.auth_service.clone()))
        .and(warp::cookie::optional::<String>(handler::RESET_COOKIE))
        .and(warp::body::json())
        .and(with(server.password_reset_service.clone()))
        .and_then(handler::complete_password_reset);

    let recover_username = warp::post()
        .and(warp::path("find"))
        .and(warp::path("id"))
        .and(warp::path::end())
        .and(guest_only(server.auth_service.clone()))
        .and(warp::cookie::optional::<String>(handler::OTP_COOKIE))
        .and(warp::body::json())
        .and(with(server.user_service.clone()))
        .and_then(handler::recover_username);

    let availability = warp::get()
        .and(warp::path("username"))
        .and(warp::path("availability"))
        .and(warp::path::end())
        .and(guest_only(server.auth_service.clone()))
        .and(warp::query::<AvailabilityQuery>())
        .and(with(server.user_service.clone()))
        .and_then(handler::check_username_availability);

    let search = warp::get()
        .and(warp::path("search"))
        .and(warp::path::end())
        .and(with_admin(server.auth_service.clone()))
        .and(warp::query::<SearchQuery>())
        .and(with(server.user_service.clone()))
        .and_then(handler::search_accounts);

    let update_nickname = warp::put()
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_session(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::update_nickname);

    let delete_account = warp::delete()
        .and(warp::path::end())
        .and(with_session(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::delete_account);

    // The id route is a catch-all segment, so it comes after every named GET.
    let profile = warp::get()
        .and(warp::path::param::<AccountId>())
        .and(warp::path::end())
        .and(with_session(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::profile);

    oauth_callback
        .or(auth_code)
        .or(auth_code_check)
        .or(signin)
        .or(signout)
        .or(signup)
        .or(reset_request)
        .or(reset_complete)
        .or(recover_username)
        .or(availability)
        .or(search)
        .or(update_nickname)
        .or(delete_account)
        .or(profile)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_session(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (SessionId, AuthSession), Error = warp::Rejection> + Clone {
    warp::cookie::cookie::<String>(handler::SESSION_COOKIE)
        .and_then(move |raw: String| {
            let auth_service = auth_service.clone();
            async move {
                let session_id = SessionId(raw);
                let session = auth_service
                    .session(&session_id)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok::<(SessionId, AuthSession), warp::Rejection>((session_id, session))
            }
        })
        .untuple_one()
}

fn with_admin(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    with_session(auth_service)
        .and_then(|_session_id: SessionId, session: AuthSession| async move {
            if session.authority_level.is_admin() {
                Ok::<(), warp::Rejection>(())
            } else {
                Err(reject::custom(ApiErrorCode::Forbidden))
            }
        })
        .untuple_one()
}

fn guest_only(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(handler::SESSION_COOKIE)
        .and_then(move |raw: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                if let Some(raw) = raw {
                    if auth_service.session(&SessionId(raw)).await.is_ok() {
                        return Err(reject::custom(ApiErrorCode::AlreadySignedIn));
                    }
                }
                Ok::<(), warp::Rejection>(())
            }
        })
        .untuple_one()
}
