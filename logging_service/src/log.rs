// logging_service/src/log.rs

use env_logger::{Builder, Env};
use log::debug;

const KNOWN_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];
const FALLBACK_LEVEL: &str = "info";

/// Filter string for env_logger. Plain levels are checked; module directives
/// (`clinic_server=debug,warp=info`) pass through untouched.
pub fn filter_for(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    if level.contains('=') || KNOWN_LEVELS.contains(&level.as_str()) {
        level
    } else {
        FALLBACK_LEVEL.to_string()
    }
}

/// Installs the process logger. `RUST_LOG` wins over `level`.
/// Returns false when a logger was already installed.
pub fn init_logging(level: &str) -> bool {
    let filter = filter_for(level);
    let installed = Builder::from_env(Env::default().default_filter_or(filter.as_str()))
        .format_timestamp_millis()
        .try_init()
        .is_ok();
    if installed {
        debug!("Logger initialised with default filter '{}'", filter);
    }
    installed
}
