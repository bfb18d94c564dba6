mod account;
mod otp;
mod reset;
mod session;

pub use account::*;
pub use otp::*;
pub use reset::*;
pub use session::*;
