//! Logging setup: a tracing-subscriber `fmt` layer writing to stderr.
//!
//! The level handed to [`init`] is already resolved from CLI `-v` flags,
//! `SUPERVISE_LOG_LEVEL` and `[bot].log_level`. `RUST_LOG` is consulted only
//! when that level does not parse as a filter directive.

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the global subscriber for `level`.
///
/// Fails if neither `level` nor `RUST_LOG` yields a usable filter, or if a
/// subscriber is already installed.
pub fn init(level: &str) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = resolve_filter(level, rust_log.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Pick the filter: `level` first, then the `RUST_LOG` directive if given.
fn resolve_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter, AppError> {
    let level_err = match EnvFilter::try_new(level) {
        Ok(filter) if !level.trim().is_empty() => return Ok(filter),
        Ok(_) => "empty level".to_string(),
        Err(e) => e.to_string(),
    };

    match rust_log {
        Some(directive) => EnvFilter::try_new(directive).map_err(|env_err| {
            AppError::Logger(format!(
                "invalid log level '{level}': {level_err}; RUST_LOG '{directive}' also invalid: {env_err}"
            ))
        }),
        None => Err(AppError::Logger(format!("invalid log level '{level}': {level_err}"))),
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn configured_level_beats_rust_log() {
        let filter = resolve_filter("warn", Some("debug")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn rust_log_used_when_level_invalid() {
        let filter = resolve_filter("app=loud", Some("debug")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = resolve_filter("", Some("trace")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn both_invalid_is_logger_error() {
        assert!(matches!(resolve_filter("app=loud", None), Err(AppError::Logger(_))));
        assert!(matches!(resolve_filter("app=loud", Some("app=noisy")), Err(AppError::Logger(_))));
    }

    #[test]
    fn full_directive_accepted() {
        let filter = resolve_filter("supervise_bot=debug,warn", None).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn second_init_reports_subscriber_error() {
        // Another test may have installed it first; either outcome is fine.
        match init("info") {
            Ok(()) => {}
            Err(AppError::Logger(msg)) if msg.contains("set subscriber") => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
