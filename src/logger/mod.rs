//! The `logger` module owns the process subscriber and hands out explicit
//! per-component span handles; core services never reach for a global logger.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
