mod account_repo_mysql;

pub use account_repo_mysql::*;

mod util;
