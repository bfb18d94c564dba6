//! Settings file parsing plus the CLI flag that overrides its path.
//! `bin/settings_demo.rs` prints the parsed tree for manual verification.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
