mod account_repo_memory;
mod token_store_memory;

pub use account_repo_memory::*;
pub use token_store_memory::*;
