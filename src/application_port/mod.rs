mod auth_service;
mod otp_service;
mod password_reset_service;
mod user_service;

pub use auth_service::*;
pub use otp_service::*;
pub use password_reset_service::*;
pub use user_service::*;
