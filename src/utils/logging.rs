use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install the relay's `fmt` subscriber.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init(settings: &LoggingSettings) {
    let filter = build_filter(settings, std::env::var("RUST_LOG").ok());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// `RUST_LOG` wins over the configured level. A directive that does not
/// parse falls back to `info`.
pub fn build_filter(settings: &LoggingSettings, rust_log: Option<String>) -> EnvFilter {
    let directive = rust_log.unwrap_or_else(|| settings.level.to_lowercase());
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"))
}
