//! Monitor binary that watches the node's coinbase address for incoming DNA.

use std::io;

use idena_watch_domain::config::MonitorConfig;
use idena_watch_domain::services::telemetry::{init_telemetry, TelemetryConfig};
use idena_watch_monitor::{
    run_monitor, JsonRpcNodeClient, MonitorError, TelegramNotifier, WatchState,
};
use idena_watch_storage::SeaOrmStorage;
use tracing::info;

#[tokio::main]
async fn main() -> io::Result<()> {
    if let Err(err) = bootstrap().await {
        eprintln!("[monitor] bootstrap failed: {err}");
        return Err(io::Error::other(err.to_string()));
    }

    Ok(())
}

async fn bootstrap() -> Result<(), MonitorError> {
    let config = MonitorConfig::load_from_env()?;
    let telemetry_config = TelemetryConfig::from_env("MONITOR");
    init_telemetry(&telemetry_config)?;

    if !config.balance_check().active() {
        info!("balance check disabled, nothing to do");
        return Ok(());
    }

    let storage = SeaOrmStorage::connect(config.database_url()).await?;
    let state = WatchState::new(storage);
    let api = JsonRpcNodeClient::new(config.node())?;
    let notifier = TelegramNotifier::new(config.telegram_bot_token().unwrap_or_default())?;

    tokio::select! {
        result = run_monitor(config.balance_check(), &state, &api, &notifier) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal, stopping");
            Ok(())
        }
    }
}
