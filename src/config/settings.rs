use serde::Deserialize;

/// Top-level configuration settings for the relay.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    pub logging: LoggingSettings,
}

/// Where the WebSocket server binds and how many peers it admits.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
}

/// Relay policy settings.
///
/// `auth_token` is the shared secret peers authenticate with. It is normally
/// supplied through the `AUTH_TOKEN` environment variable; left empty, every
/// authentication attempt is rejected.
#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    pub auth_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub relay: Option<PartialRelaySettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_connections: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRelaySettings {
    pub auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_connections: 1000,
            },
            relay: RelaySettings {
                auth_token: String::new(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
