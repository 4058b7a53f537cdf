//! Incoming balance watch: one cycle over the latest transactions of the
//! node's address, alerting admins about payments newer than the watermark.

use idena_watch_domain::amount::incoming_amount;
use idena_watch_domain::render::received_alert;
use idena_watch_domain::storage::{MonitorStateStore, StorageResult};
use metrics::{counter, gauge};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::notifier::Notifier;
use crate::rpc::NodeApi;
use crate::worker::MonitorError;

pub const WATCH_SECTION: &str = "balance_check";
pub const WATCH_KEY: &str = "last";
/// Number of most recent transactions inspected per cycle.
pub const WATCH_FETCH_COUNT: u32 = 50;

/// Persisted watermark plus the lock serializing its read-modify-write.
pub struct WatchState<S> {
    store: S,
    lock: Mutex<()>,
}

impl<S> WatchState<S>
where
    S: MonitorStateStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Timestamp of the newest reported transaction; `0` before the first run.
    pub async fn last_seen(&self) -> StorageResult<i64> {
        Ok(self
            .store
            .get_value(WATCH_SECTION, WATCH_KEY)
            .await?
            .unwrap_or(0))
    }

    async fn advance(&self, timestamp: i64) -> StorageResult<()> {
        self.store
            .set_value(timestamp, WATCH_SECTION, WATCH_KEY)
            .await?;
        gauge!("monitor_last_seen_timestamp").set(timestamp as f64);
        Ok(())
    }

    async fn begin(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AddressUnavailable,
    TransactionsUnavailable,
    NoTransactions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Watermark read at the start of the cycle.
    pub previous: i64,
    /// Watermark after the cycle.
    pub watermark: i64,
    /// Incoming transactions that advanced the watermark.
    pub qualified: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    /// First run: the watermark was established without alerting.
    pub baseline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    Processed(CycleReport),
}

/// Runs one balance check.
///
/// Node failures end the cycle with [`CycleOutcome::Skipped`]; only state
/// store failures are returned as errors. The watermark is written before
/// the alert for a transaction goes out, so a failed delivery is never
/// retried. While the stored watermark is still `0` the cycle only records
/// the newest incoming transaction and sends nothing.
pub async fn run_watch_cycle<A, S, N>(
    api: &A,
    state: &WatchState<S>,
    notifier: &N,
    admins: &[String],
) -> Result<CycleOutcome, MonitorError>
where
    A: NodeApi + ?Sized,
    S: MonitorStateStore,
    N: Notifier + ?Sized,
{
    let _guard = state.begin().await;

    let address = match api.address().await {
        Ok(address) => address,
        Err(err) => {
            error!(%err, "couldn't retrieve address");
            return Ok(CycleOutcome::Skipped(SkipReason::AddressUnavailable));
        }
    };

    let transactions = match api.transactions(&address, WATCH_FETCH_COUNT).await {
        Ok(page) => page.into_transactions(),
        Err(err) => {
            error!(%err, %address, "couldn't retrieve transactions");
            return Ok(CycleOutcome::Skipped(SkipReason::TransactionsUnavailable));
        }
    };

    if transactions.is_empty() {
        warn!(%address, "no transactions found");
        return Ok(CycleOutcome::Skipped(SkipReason::NoTransactions));
    }

    let last = state.last_seen().await?;
    let mut report = CycleReport {
        previous: last,
        watermark: last,
        baseline: last == 0,
        ..CycleReport::default()
    };

    // The node lists newest first.
    for transaction in transactions.iter().rev() {
        // Several transactions of one block share a timestamp, so filter on
        // the watermark read before the loop.
        if transaction.timestamp <= report.previous {
            continue;
        }
        if !transaction.is_addressed_to(&address) {
            continue;
        }

        let amount = match incoming_amount(transaction.amount.as_deref()) {
            Ok(Some(amount)) => amount,
            Ok(None) => continue,
            Err(err) => {
                warn!(%err, hash = %transaction.hash, "skipping transaction with unreadable amount");
                continue;
            }
        };

        if transaction.timestamp > report.watermark {
            state.advance(transaction.timestamp).await?;
            report.watermark = transaction.timestamp;
        }
        report.qualified += 1;

        if report.baseline {
            debug!(
                hash = %transaction.hash,
                timestamp = transaction.timestamp,
                "recording baseline watermark"
            );
            continue;
        }

        let alert = received_alert(&amount);
        for admin in admins {
            match notifier.send(admin, &alert).await {
                Ok(()) => {
                    report.alerts_sent += 1;
                    counter!("monitor_alerts_total", "result" => "sent").increment(1);
                }
                Err(err) => {
                    report.alerts_failed += 1;
                    counter!("monitor_alerts_total", "result" => "failed").increment(1);
                    warn!(%err, %admin, "couldn't send 'received DNA' message");
                }
            }
        }
        info!(
            hash = %transaction.hash,
            %amount,
            recipients = admins.len(),
            "reported incoming transaction"
        );
    }

    Ok(CycleOutcome::Processed(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NotifyError;
    use crate::rpc::RpcError;
    use async_trait::async_trait;
    use idena_watch_domain::model::{Address, Notification, Transaction, TransactionPage};
    use idena_watch_domain::storage::StorageError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    const WATCHED: &str = "0xwatched";

    struct MockApi {
        address: Result<Address, RpcError>,
        transactions: Result<TransactionPage, RpcError>,
        history_calls: AtomicUsize,
    }

    impl MockApi {
        fn with_transactions(transactions: Vec<Transaction>) -> Self {
            Self {
                address: Ok(Address::from(WATCHED)),
                transactions: Ok(TransactionPage {
                    transactions: Some(transactions),
                    token: None,
                }),
                history_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NodeApi for MockApi {
        async fn address(&self) -> Result<Address, RpcError> {
            self.address.clone()
        }

        async fn transaction(&self, _hash: &str) -> Result<Transaction, RpcError> {
            Err(RpcError::Upstream("unused".into()))
        }

        async fn transactions(
            &self,
            address: &Address,
            count: u32,
        ) -> Result<TransactionPage, RpcError> {
            assert_eq!(address.as_str(), WATCHED);
            assert_eq!(count, WATCH_FETCH_COUNT);
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            self.transactions.clone()
        }

        async fn pending_transactions(
            &self,
            _address: &Address,
            _count: u32,
        ) -> Result<TransactionPage, RpcError> {
            Err(RpcError::Upstream("unused".into()))
        }
    }

    #[derive(Default)]
    struct MockStore {
        value: StdMutex<Option<i64>>,
        writes: StdMutex<Vec<i64>>,
        fail_writes: AtomicBool,
    }

    impl MockStore {
        fn starting_at(last: i64) -> Self {
            Self {
                value: StdMutex::new(Some(last)),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl MonitorStateStore for MockStore {
        async fn get_value(&self, section: &str, key: &str) -> StorageResult<Option<i64>> {
            assert_eq!((section, key), (WATCH_SECTION, WATCH_KEY));
            Ok(*self.value.lock().unwrap())
        }

        async fn set_value(&self, value: i64, _section: &str, _key: &str) -> StorageResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Database("disk full".into()));
            }
            *self.value.lock().unwrap() = Some(value);
            self.writes.lock().unwrap().push(value);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockNotifier {
        sent: StdMutex<Vec<(String, String)>>,
        failing_recipient: Option<String>,
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn send(
            &self,
            recipient: &str,
            notification: &Notification,
        ) -> Result<(), NotifyError> {
            if self.failing_recipient.as_deref() == Some(recipient) {
                return Err(NotifyError::Rejected("chat not found".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), notification.text.clone()));
            Ok(())
        }
    }

    fn tx(timestamp: i64, to: &str, amount: &str) -> Transaction {
        Transaction {
            hash: format!("0x{timestamp}"),
            kind: "send".into(),
            timestamp,
            amount: Some(amount.into()),
            from: Some(Address::from("0xsender")),
            to: Some(Address::from(to)),
            epoch: None,
            nonce: None,
            block_hash: None,
            used_fee: None,
            max_fee: None,
            tips: None,
        }
    }

    fn admins() -> Vec<String> {
        vec!["1001".to_string(), "1002".to_string()]
    }

    fn report(outcome: CycleOutcome) -> CycleReport {
        match outcome {
            CycleOutcome::Processed(report) => report,
            other => panic!("expected processed cycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn alerts_only_for_new_incoming_positive_transfers() {
        let api = MockApi::with_transactions(vec![
            tx(300, WATCHED, "5.00"),
            tx(200, "0xother", "1.00"),
            tx(150, WATCHED, "0.00"),
        ]);
        let state = WatchState::new(MockStore::starting_at(100));
        let notifier = MockNotifier::default();

        let report = report(
            run_watch_cycle(&api, &state, &notifier, &admins())
                .await
                .unwrap(),
        );

        assert_eq!(report.watermark, 300);
        assert_eq!(report.qualified, 1);
        assert_eq!(report.alerts_sent, 2);
        assert_eq!(state.last_seen().await.unwrap(), 300);
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "1001");
        assert_eq!(sent[1].0, "1002");
        assert!(sent.iter().all(|(_, text)| text.ends_with("Received `5` DNA")));
    }

    #[tokio::test]
    async fn processes_oldest_first_and_advances_per_transaction() {
        let api = MockApi::with_transactions(vec![
            tx(400, WATCHED, "2.50"),
            tx(300, WATCHED, "1.10"),
            tx(50, WATCHED, "9"),
        ]);
        let store = MockStore::starting_at(100);
        let state = WatchState::new(store);
        let notifier = MockNotifier::default();

        let report = report(
            run_watch_cycle(&api, &state, &notifier, &["1001".to_string()])
                .await
                .unwrap(),
        );

        assert_eq!(report.qualified, 2);
        assert_eq!(*state.store().writes.lock().unwrap(), vec![300, 400]);
        let texts: Vec<String> = notifier
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect();
        assert!(texts[0].ends_with("Received `1.1` DNA"));
        assert!(texts[1].ends_with("Received `2.5` DNA"));
    }

    #[tokio::test]
    async fn same_block_transfers_are_each_alerted() {
        let mut first = tx(300, WATCHED, "7");
        first.hash = "0xfirst".into();
        let mut second = tx(300, WATCHED, "5");
        second.hash = "0xsecond".into();
        let api = MockApi::with_transactions(vec![first, second]);
        let state = WatchState::new(MockStore::starting_at(100));
        let notifier = MockNotifier::default();

        let report = report(
            run_watch_cycle(&api, &state, &notifier, &["1001".to_string()])
                .await
                .unwrap(),
        );

        assert_eq!(report.qualified, 2);
        assert_eq!(report.alerts_sent, 2);
        assert_eq!(*state.store().writes.lock().unwrap(), vec![300]);
        let texts: Vec<String> = notifier
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect();
        assert!(texts[0].ends_with("Received `5` DNA"));
        assert!(texts[1].ends_with("Received `7` DNA"));
    }

    #[tokio::test]
    async fn unordered_history_never_lowers_the_watermark() {
        // Oldest-first walk visits 300, 400, 400, 200.
        let api = MockApi::with_transactions(vec![
            tx(200, WATCHED, "1"),
            tx(400, WATCHED, "2"),
            tx(400, WATCHED, "3"),
            tx(300, WATCHED, "4"),
        ]);
        let state = WatchState::new(MockStore::starting_at(100));
        let notifier = MockNotifier::default();

        let admins = ["1001".to_string()];

        let first = report(
            run_watch_cycle(&api, &state, &notifier, &admins)
                .await
                .unwrap(),
        );

        assert_eq!(first.qualified, 4);
        assert_eq!(first.alerts_sent, 4);
        assert_eq!(first.watermark, 400);
        assert_eq!(*state.store().writes.lock().unwrap(), vec![300, 400]);
        assert_eq!(state.last_seen().await.unwrap(), 400);

        let again = report(
            run_watch_cycle(&api, &state, &notifier, &admins)
                .await
                .unwrap(),
        );
        assert_eq!(again.qualified, 0);
        assert_eq!(again.watermark, 400);
        assert_eq!(notifier.sent.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn repeated_cycles_alert_at_most_once() {
        let api = MockApi::with_transactions(vec![tx(300, WATCHED, "5"), tx(200, WATCHED, "3")]);
        let state = WatchState::new(MockStore::starting_at(100));
        let notifier = MockNotifier::default();
        let admins = ["1001".to_string()];

        let mut watermarks = Vec::new();
        for _ in 0..3 {
            run_watch_cycle(&api, &state, &notifier, &admins)
                .await
                .unwrap();
            watermarks.push(state.last_seen().await.unwrap());
        }

        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
        assert_eq!(watermarks, vec![300, 300, 300]);
    }

    #[tokio::test]
    async fn first_run_records_baseline_without_alerting() {
        let api = MockApi::with_transactions(vec![
            tx(300, WATCHED, "5"),
            tx(250, "0xother", "7"),
            tx(200, WATCHED, "3"),
        ]);
        let state = WatchState::new(MockStore::default());
        let notifier = MockNotifier::default();

        let report = report(
            run_watch_cycle(&api, &state, &notifier, &admins())
                .await
                .unwrap(),
        );

        assert!(report.baseline);
        assert_eq!(report.previous, 0);
        assert_eq!(report.alerts_sent, 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(state.last_seen().await.unwrap(), 300);
    }

    #[tokio::test]
    async fn failed_delivery_does_not_stop_other_admins_or_rewind() {
        let api = MockApi::with_transactions(vec![tx(300, WATCHED, "5")]);
        let state = WatchState::new(MockStore::starting_at(100));
        let notifier = MockNotifier {
            failing_recipient: Some("1001".to_string()),
            ..MockNotifier::default()
        };

        let report = report(
            run_watch_cycle(&api, &state, &notifier, &admins())
                .await
                .unwrap(),
        );

        assert_eq!(report.alerts_failed, 1);
        assert_eq!(report.alerts_sent, 1);
        assert_eq!(notifier.sent.lock().unwrap()[0].0, "1002");
        assert_eq!(state.last_seen().await.unwrap(), 300);
    }

    #[tokio::test]
    async fn storage_failure_aborts_before_alerting() {
        let api = MockApi::with_transactions(vec![tx(300, WATCHED, "5")]);
        let store = MockStore::starting_at(100);
        store.fail_writes.store(true, Ordering::SeqCst);
        let state = WatchState::new(store);
        let notifier = MockNotifier::default();

        let err = run_watch_cycle(&api, &state, &notifier, &admins())
            .await
            .unwrap_err();

        assert!(matches!(err, MonitorError::Storage(_)));
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_amounts_are_skipped() {
        let mut broken = tx(200, WATCHED, "n/a");
        broken.hash = "0xbroken".into();
        let mut missing = tx(250, WATCHED, "1");
        missing.amount = None;
        let api = MockApi::with_transactions(vec![tx(300, WATCHED, "4"), missing, broken]);
        let state = WatchState::new(MockStore::starting_at(100));
        let notifier = MockNotifier::default();

        let report = report(
            run_watch_cycle(&api, &state, &notifier, &["1001".to_string()])
                .await
                .unwrap(),
        );

        assert_eq!(report.qualified, 1);
        assert_eq!(report.watermark, 300);
    }

    #[tokio::test]
    async fn node_failures_skip_the_cycle() {
        let mut api = MockApi::with_transactions(vec![]);
        api.address = Err(RpcError::Transport("connection refused".into()));
        let state = WatchState::new(MockStore::starting_at(100));
        let notifier = MockNotifier::default();

        let outcome = run_watch_cycle(&api, &state, &notifier, &admins())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Skipped(SkipReason::AddressUnavailable)
        );
        assert_eq!(api.history_calls.load(Ordering::SeqCst), 0);

        let mut api = MockApi::with_transactions(vec![]);
        api.transactions = Err(RpcError::Upstream("busy".into()));
        let outcome = run_watch_cycle(&api, &state, &notifier, &admins())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Skipped(SkipReason::TransactionsUnavailable)
        );
    }

    #[tokio::test]
    async fn empty_history_is_skipped() {
        let api = MockApi {
            transactions: Ok(TransactionPage::default()),
            ..MockApi::with_transactions(vec![])
        };
        let state = WatchState::new(MockStore::starting_at(100));
        let notifier = MockNotifier::default();

        let outcome = run_watch_cycle(&api, &state, &notifier, &admins())
            .await
            .unwrap();

        assert_eq!(outcome, CycleOutcome::Skipped(SkipReason::NoTransactions));
        assert_eq!(state.last_seen().await.unwrap(), 100);
    }
}
