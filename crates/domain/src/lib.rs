//! Domain-level building blocks shared across API and monitor crates: the
//! node transaction model, notification rendering, amount handling, the
//! environment configuration contract and the state storage traits.

pub mod amount;
pub mod config;
pub mod model;
pub mod render;
pub mod services;
pub mod storage;

pub use amount::{incoming_amount, trim_amount, AmountError};
pub use model::{Address, Notification, NotificationKind, Transaction, TransactionPage};
pub use storage::{MonitorStateStore, StorageError, StorageResult};
