//! Library entrypoint for the balance watch: the node JSON-RPC client, admin
//! delivery, the watch cycle and the interval worker. The API process reuses
//! the node client for its query flow.

pub mod notifier;
pub mod pipeline;
pub mod rpc;
pub mod worker;

pub use notifier::{Notifier, NotifyError, TelegramNotifier};
pub use pipeline::{run_watch_cycle, CycleOutcome, CycleReport, SkipReason, WatchState};
pub use rpc::{JsonRpcNodeClient, NodeApi, RpcError};
pub use worker::{run_monitor, MonitorError};
