use std::sync::Arc;

use idena_watch_domain::config::QueryConfig;
use idena_watch_domain::services::telemetry::TelemetryGuard;
use idena_watch_monitor::NodeApi;

#[derive(Clone)]
pub struct AppState {
    api: Arc<dyn NodeApi>,
    query: QueryConfig,
    telemetry: TelemetryGuard,
}

impl AppState {
    pub fn new(api: Arc<dyn NodeApi>, query: QueryConfig, telemetry: TelemetryGuard) -> Self {
        Self {
            api,
            query,
            telemetry,
        }
    }

    pub fn api(&self) -> &dyn NodeApi {
        self.api.as_ref()
    }

    pub fn query(&self) -> QueryConfig {
        self.query
    }

    pub fn telemetry(&self) -> &TelemetryGuard {
        &self.telemetry
    }
}
