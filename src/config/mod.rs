mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{LoggingSettings, RelaySettings, ServerSettings, Settings};

/// Environment variable holding the shared authentication secret.
pub const AUTH_TOKEN_VAR: &str = "AUTH_TOKEN";

/// Loads the configuration from the default file and environment variables.
///
/// Sources, lowest precedence first: built-in defaults, `config/default.*`,
/// `RELAY__<SECTION>__<KEY>` variables, and `AUTH_TOKEN` for the shared secret.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("RELAY")
                .prefix_separator("__")
                .separator("__"),
        )
        .set_override_option("relay.auth_token", std::env::var(AUTH_TOKEN_VAR).ok())?;

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    Ok(Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            max_connections: partial
                .server
                .as_ref()
                .and_then(|s| s.max_connections)
                .unwrap_or(default.server.max_connections),
        },
        relay: RelaySettings {
            auth_token: partial
                .relay
                .as_ref()
                .and_then(|r| r.auth_token.clone())
                .unwrap_or(default.relay.auth_token),
        },
        logging: LoggingSettings {
            level: partial
                .logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
        },
    })
}
