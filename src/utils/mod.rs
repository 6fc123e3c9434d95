//! The `utils` module holds the pieces shared across the relay: the common
//! error type and logging setup.

pub mod error;
pub mod logging;

pub use error::RelayError;

#[cfg(test)]
mod tests {
    use super::logging;
    use crate::config::LoggingSettings;

    fn settings(level: &str) -> LoggingSettings {
        LoggingSettings {
            level: level.to_string(),
        }
    }

    #[test]
    fn logging_init_is_repeatable() {
        logging::init(&settings("info"));
        logging::init(&settings("debug"));
    }

    #[test]
    fn configured_level_is_used_without_rust_log() {
        let filter = logging::build_filter(&settings("DEBUG"), None);
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn rust_log_overrides_configured_level() {
        let filter = logging::build_filter(&settings("debug"), Some("warn".to_string()));
        assert_eq!(filter.to_string(), "warn");
    }
}
