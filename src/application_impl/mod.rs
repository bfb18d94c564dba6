mod auth_service_impl;
mod auth_session;
mod otp_service_impl;
mod otp_session;
mod password_reset_service_impl;
mod provisioning;
mod reset_session;
mod token_namespace;
mod user_service_impl;

pub use auth_service_impl::*;
pub use auth_session::*;
pub use otp_service_impl::*;
pub use otp_session::*;
pub use password_reset_service_impl::*;
pub use provisioning::*;
pub use reset_session::*;
pub use token_namespace::*;
pub use user_service_impl::*;
