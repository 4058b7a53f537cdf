use metrics::counter;
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use idena_watch_domain::{
    config::{BalanceCheckConfig, ConfigError},
    services::telemetry::TelemetryError,
    storage::{MonitorStateStore, StorageError},
};

use crate::{
    notifier::{Notifier, NotifyError},
    pipeline::{run_watch_cycle, CycleOutcome, SkipReason, WatchState},
    rpc::{NodeApi, RpcError},
};

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),
    #[error("notifier error: {0}")]
    Notify(#[from] NotifyError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

/// Drives the balance check on its configured interval. The first cycle runs
/// immediately; missed ticks are skipped rather than bunched up.
pub async fn run_monitor<A, S, N>(
    config: &BalanceCheckConfig,
    state: &WatchState<S>,
    api: &A,
    notifier: &N,
) -> Result<(), MonitorError>
where
    A: NodeApi,
    S: MonitorStateStore,
    N: Notifier,
{
    if !config.active() {
        info!("balance check disabled, monitor idle");
        return Ok(());
    }

    info!(
        interval_secs = config.interval().as_secs(),
        admins = config.admin_ids().len(),
        "balance check started"
    );

    let mut ticker = interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        match run_watch_cycle(api, state, notifier, config.admin_ids()).await {
            Ok(outcome) => {
                counter!("monitor_cycles_total", "result" => outcome_tag(&outcome)).increment(1);
            }
            Err(err) => {
                counter!("monitor_cycles_total", "result" => "error").increment(1);
                error!(%err, "balance check cycle failed");
            }
        }
    }
}

fn outcome_tag(outcome: &CycleOutcome) -> &'static str {
    match outcome {
        CycleOutcome::Processed(report) if report.baseline => "baseline",
        CycleOutcome::Processed(_) => "processed",
        CycleOutcome::Skipped(SkipReason::AddressUnavailable) => "address_unavailable",
        CycleOutcome::Skipped(SkipReason::TransactionsUnavailable) => "transactions_unavailable",
        CycleOutcome::Skipped(SkipReason::NoTransactions) => "empty",
    }
}
