use std::sync::{Arc, Mutex};

use skyrelay::broker::{Broker, TopicStatusRegistry};
use skyrelay::config::load_config;
use skyrelay::transport::decoder::MessageDecoder;
use skyrelay::transport::websocket::start_websocket_server;
use skyrelay::utils::logging;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let config = load_config()?;
    logging::init(&config.logging);

    if config.relay.auth_token.is_empty() {
        warn!("AUTH_TOKEN is not set; every authentication attempt will be rejected");
    }

    let broker = Arc::new(Mutex::new(Broker::new(
        config.relay.auth_token.clone(),
        MessageDecoder::relay(),
        TopicStatusRegistry::with_all_topics(),
    )));
    let addr = format!("{}:{}", config.server.host, config.server.port);

    tokio::select! {
        result = start_websocket_server(&addr, broker, config.server.clone()) => {
            if let Err(e) = result {
                error!("Relay server failed: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}
