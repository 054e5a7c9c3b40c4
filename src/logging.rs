//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The engine itself only emits `tracing` events; embedding applications that
//! already install a subscriber never need this module.
//!
//! Level priority:
//! 1. the explicit `level` argument
//! 2. `SCHEDULE_ENGINE_LOG` environment variable (e.g. "info", "debug")
//! 3. `info`

use std::error::Error;
use tracing::Level;
use tracing_subscriber::fmt;

pub const LOG_ENV_VAR: &str = "SCHEDULE_ENGINE_LOG";

/// Install a global fmt subscriber writing to stderr.
///
/// Fails instead of panicking when a global subscriber is already set.
pub fn init_logging(level: Option<Level>) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    let level = level.unwrap_or_else(|| {
        std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(Level::INFO)
    });

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!(parse_level_str(" Debug "), Some(Level::DEBUG));
        assert_eq!(parse_level_str("WARNING"), Some(Level::WARN));
        assert_eq!(parse_level_str("loud"), None);
    }

    #[test]
    fn second_init_is_an_error() {
        let _ = init_logging(Some(Level::ERROR));
        assert!(init_logging(Some(Level::ERROR)).is_err());
    }
}
