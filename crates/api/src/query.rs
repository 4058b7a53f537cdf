//! Transaction query flow behind `/api/v1/transactions`.
//!
//! Arguments arrive exactly as the chat user typed them after the command,
//! e.g. `["pending", "count=3"]` or `["hash=0xabc"]`. Keywords use the
//! `key=value` form; `hash` wins over everything else and `count` is only
//! read when no hash was given. Unknown keywords are ignored.

use std::collections::HashMap;

use idena_watch_domain::config::QueryConfig;
use idena_watch_domain::model::{Notification, Transaction};
use idena_watch_domain::render::{
    error_notification, info_notification, render_transaction, ERROR_SYMBOL,
};
use idena_watch_monitor::NodeApi;
use strum_macros::AsRefStr;
use tracing::error;

const PENDING_KEYWORD: &str = "pending";

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum QueryMode {
    Hash,
    Pending,
    History,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryArgs {
    keywords: HashMap<String, String>,
    first: Option<String>,
}

impl QueryArgs {
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Self::default();
        for arg in args {
            let arg = arg.as_ref().trim();
            if arg.is_empty() {
                continue;
            }
            if parsed.first.is_none() {
                parsed.first = Some(arg.to_string());
            }
            if let Some((key, value)) = arg.split_once('=') {
                let key = key.trim();
                if !key.is_empty() {
                    parsed
                        .keywords
                        .insert(key.to_string(), value.trim().to_string());
                }
            }
        }
        parsed
    }

    pub fn hash(&self) -> Option<&str> {
        self.keyword("hash")
    }

    pub fn count(&self) -> Option<&str> {
        self.keyword("count")
    }

    pub fn keyword(&self, key: &str) -> Option<&str> {
        self.keywords.get(key).map(String::as_str)
    }

    /// Only the very first argument selects the pending listing.
    pub fn wants_pending(&self) -> bool {
        self.first
            .as_deref()
            .is_some_and(|first| first.eq_ignore_ascii_case(PENDING_KEYWORD))
    }

    pub fn mode(&self) -> QueryMode {
        if self.hash().is_some() {
            QueryMode::Hash
        } else if self.wants_pending() {
            QueryMode::Pending
        } else {
            QueryMode::History
        }
    }
}

/// Resolves the query against the node and returns the notifications to
/// reply with, in order. Failures become a single error notification.
pub async fn handle_query<A>(args: &QueryArgs, api: &A, config: QueryConfig) -> Vec<Notification>
where
    A: NodeApi + ?Sized,
{
    if let Some(hash) = args.hash() {
        return match api.transaction(hash).await {
            Ok(transaction) => vec![render_transaction(&transaction)],
            Err(err) => vec![failure("Couldn't retrieve transaction", err)],
        };
    }

    let requested = match args.count().map(str::parse::<i64>).transpose() {
        Ok(count) => count,
        Err(_) => {
            error!(count = ?args.count(), "invalid count parameter");
            return vec![Notification::error(format!(
                "{ERROR_SYMBOL} Couldn't convert 'count' parameter to Integer"
            ))];
        }
    };

    let address = match api.address().await {
        Ok(address) => address,
        Err(err) => return vec![failure("Couldn't retrieve address", err)],
    };

    // Zero and negative counts fall back to the configured default.
    let count = requested
        .filter(|count| *count > 0)
        .map(|count| u32::try_from(count).unwrap_or(u32::MAX))
        .unwrap_or_else(|| config.trx_display());

    if args.wants_pending() {
        let pending = match api.pending_transactions(&address, count).await {
            Ok(page) => page.into_transactions(),
            Err(err) => return vec![failure("Couldn't retrieve pending transactions", err)],
        };
        if pending.is_empty() {
            return vec![info_notification("No pending transactions")];
        }
        return render_listing(&pending, count, config.legacy_overflow());
    }

    match api.transactions(&address, count).await {
        Ok(page) => render_listing(&page.into_transactions(), count, config.legacy_overflow()),
        Err(err) => vec![failure("Couldn't retrieve transactions", err)],
    }
}

/// Renders transactions in node order, clamped to `count`. The legacy mode
/// lets one extra row through, never more than the node returned.
pub fn render_listing(
    transactions: &[Transaction],
    count: u32,
    legacy_overflow: bool,
) -> Vec<Notification> {
    let clamped = transactions.len().min(count as usize);
    let limit = if legacy_overflow { clamped + 1 } else { clamped };
    transactions
        .iter()
        .take(limit)
        .map(render_transaction)
        .collect()
}

fn failure(context: &str, err: impl std::fmt::Display) -> Notification {
    let notification = error_notification(context, err);
    error!(message = %notification.text, "query failed");
    notification
}
