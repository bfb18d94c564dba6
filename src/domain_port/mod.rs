// store

mod token_store;

pub use token_store::*;

// repo

mod account_repo;

pub use account_repo::*;

// vendor

mod oauth_client;
mod sms_carrier;

pub use oauth_client::*;
pub use sms_carrier::*;
