use std::time::Duration;

use tokio::time::sleep;
use tracing::{
    info,
    warn,
};

pub mod api;
pub mod resolver;
pub mod types;

pub use api::{
    AnkiClient,
    NoteBridge,
};
pub use types::{
    AnkiSettings,
    Note,
    OutField,
};

/// Polls AnkiConnect until it answers `version` or the attempts run out.
pub async fn wait_awake(client: &AnkiClient, wait_time: Duration, max_attempts: u32) -> bool {
    for attempt in 1..=max_attempts {
        match client.version().await {
            Ok(version) => {
                info!("AnkiConnect is online. Version: {}", version);
                return true;
            }
            Err(err) => {
                warn!(
                    "AnkiConnect attempt {} of {} failed. Retrying in {:?}... Error: {}",
                    attempt, max_attempts, wait_time, err
                );
                if attempt < max_attempts {
                    sleep(wait_time).await;
                }
            }
        }
    }
    false
}
