//! Tracing bootstrap with a reloadable filter.
//! `bin/logger_demo.rs` exercises the bootstrap/reload cycle by hand.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
