mod oauth_client_fake;
mod oauth_client_kakao;
mod sms_carrier_fake;
mod sms_carrier_twilio;

pub use oauth_client_fake::*;
pub use oauth_client_kakao::*;
pub use sms_carrier_fake::*;
pub use sms_carrier_twilio::*;
