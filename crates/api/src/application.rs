use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use idena_watch_domain::config::{ApiConfig, ConfigError};
use idena_watch_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError};
use idena_watch_monitor::{JsonRpcNodeClient, RpcError};
use thiserror::Error;
use tracing::info;

use crate::{
    handlers::{json_error_handler, metrics_handler, transactions_handler},
    state::AppState,
};

pub async fn run() -> Result<(), BootstrapError> {
    let config = ApiConfig::load_from_env()?;

    let telemetry_config = TelemetryConfig::from_env("API");
    let telemetry = init_telemetry(&telemetry_config)?;

    let client = JsonRpcNodeClient::new(config.node())?;
    let state = AppState::new(Arc::new(client), config.query(), telemetry);

    info!(
        bind = config.api_bind_address(),
        node = config.node().rpc_url(),
        "starting query api"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .wrap(Logger::default())
            .route("/api/v1/transactions", web::post().to(transactions_handler))
            .route("/metrics", web::get().to(metrics_handler))
    })
    .bind(config.api_bind_address())?
    .run()
    .await?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("node client error: {0}")]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
