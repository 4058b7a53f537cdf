//! Data structures shared across the API and monitor binaries.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

/// Idena address as reported by the node. Compared verbatim: the node always
/// answers with the same casing for the coinbase address and recipients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction record returned by `bcn_transaction`, `bcn_transactions` and
/// `bcn_pendingTransactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Unix timestamp in seconds. Pending transactions carry `0`.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub epoch: Option<u64>,
    #[serde(default)]
    pub nonce: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub used_fee: Option<String>,
    #[serde(default)]
    pub max_fee: Option<String>,
    #[serde(default)]
    pub tips: Option<String>,
}

impl Transaction {
    /// Returns true when the transaction credits `address`.
    pub fn is_addressed_to(&self, address: &Address) -> bool {
        self.to.as_ref() == Some(address)
    }
}

/// Paged transaction listing. The node answers `null` instead of an empty
/// array when the address has no history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPage {
    #[serde(default)]
    pub transactions: Option<Vec<Transaction>>,
    #[serde(default)]
    pub token: Option<String>,
}

impl TransactionPage {
    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    Transaction,
    Info,
    Error,
    Alert,
}

/// Markdown text ready to be handed to a chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub text: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, text)
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}
