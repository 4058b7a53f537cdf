//! Renders node transactions into chat notifications.

use chrono::DateTime;

use crate::model::{Notification, NotificationKind, Transaction};

/// Block explorer deep link prefix; the transaction hash is appended verbatim.
pub const EXPLORER_TX_URL: &str = "https://scan.idena.io/tx?tx=";

pub const UNKNOWN_SYMBOL: &str = "\u{2753}";
pub const ERROR_SYMBOL: &str = "\u{274C}";
pub const INFO_SYMBOL: &str = "\u{2139}\u{FE0F}";
pub const BELL_SYMBOL: &str = "\u{1F514}";

/// Transaction type to symbol. Matching is exact and case-sensitive.
const TYPE_SYMBOLS: &[(&str, &str)] = &[
    ("sendTx", "\u{1F4E6}"),
    ("send", "\u{1F4B0}"),
    ("invite", "\u{1F5E3}"),
    ("submitFlip", "\u{1F5BC}"),
    ("online", "\u{1F7E2}"),
    ("offline", "\u{1F534}"),
    ("submitLongAnswers", "\u{1F535}"),
    ("submitShortAnswers", "\u{1F7E0}"),
    ("evidence", "\u{1F441}"),
    ("submitAnswersHash", "\u{1F194}"),
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn symbol_for(kind: &str) -> &'static str {
    TYPE_SYMBOLS
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, symbol)| *symbol)
        .unwrap_or(UNKNOWN_SYMBOL)
}

/// Formats a unix timestamp (seconds) as a UTC date. Out-of-range values are
/// echoed back as the raw number.
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn explorer_link(hash: &str) -> String {
    format!("{EXPLORER_TX_URL}{hash}")
}

pub fn render_transaction(transaction: &Transaction) -> Notification {
    let text = format!(
        "`Type: {symbol} {kind}`\n`Date: {date}`\n`Link: `[Link to Block Explorer]({link})",
        symbol = symbol_for(&transaction.kind),
        kind = transaction.kind,
        date = format_timestamp(transaction.timestamp),
        link = explorer_link(&transaction.hash),
    );
    Notification::new(NotificationKind::Transaction, text)
}

/// Error line surfaced to the requester, e.g. `Couldn't retrieve address: <msg>`.
pub fn error_notification(context: &str, message: impl std::fmt::Display) -> Notification {
    Notification::error(format!("{ERROR_SYMBOL} {context}: {message}"))
}

pub fn info_notification(message: &str) -> Notification {
    Notification::info(format!("{INFO_SYMBOL} {message}"))
}

/// Admin alert for an incoming transfer; `amount` is already normalized.
pub fn received_alert(amount: &str) -> Notification {
    Notification::new(
        NotificationKind::Alert,
        format!("{BELL_SYMBOL} Received `{amount}` DNA"),
    )
}
