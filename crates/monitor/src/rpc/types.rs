use serde::{Deserialize, Serialize};

/// Request envelope understood by the Idena node. The API key travels in the
/// body rather than in a header.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a, P> {
    pub method: &'a str,
    pub params: P,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

/// Paging arguments for `bcn_transactions` / `bcn_pendingTransactions`.
#[derive(Debug, Serialize)]
pub struct TransactionsArgs<'a> {
    pub address: &'a str,
    pub count: u32,
}
