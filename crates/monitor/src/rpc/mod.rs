use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use idena_watch_domain::config::NodeConfig;
use idena_watch_domain::model::{Address, Transaction, TransactionPage};
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

mod types;

pub use types::{JsonRpcErrorBody, JsonRpcRequest, JsonRpcResponse, TransactionsArgs};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Error envelope returned by the node; the message is kept verbatim.
    #[error("{0}")]
    Upstream(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

/// Read-only view of the node used by the query and watch flows.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Coinbase address of the node, i.e. the watched address.
    async fn address(&self) -> Result<Address, RpcError>;
    async fn transaction(&self, hash: &str) -> Result<Transaction, RpcError>;
    /// Newest-first history of `address`.
    async fn transactions(&self, address: &Address, count: u32)
        -> Result<TransactionPage, RpcError>;
    async fn pending_transactions(
        &self,
        address: &Address,
        count: u32,
    ) -> Result<TransactionPage, RpcError>;
}

/// `reqwest`-backed JSON-RPC client for an Idena node.
pub struct JsonRpcNodeClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    next_id: AtomicU64,
}

impl JsonRpcNodeClient {
    pub fn new(config: &NodeConfig) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: config.rpc_url().to_string(),
            api_key: config.api_key().map(str::to_string),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<P, T>(&self, method: &'static str, params: P) -> Result<T, RpcError>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let result = self.dispatch(method, params).await;
        let tag = if result.is_ok() { "ok" } else { "error" };
        counter!("monitor_rpc_calls_total", "method" => method, "result" => tag).increment(1);
        result
    }

    async fn dispatch<P, T>(&self, method: &'static str, params: P) -> Result<T, RpcError>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            method,
            params,
            id,
            key: self.api_key.as_deref(),
        };
        debug!(method, id, "calling node");

        let response: JsonRpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(RpcError::Upstream(error.message));
        }
        response
            .result
            .ok_or_else(|| RpcError::Decode(format!("`{method}` returned no result")))
    }
}

#[async_trait]
impl NodeApi for JsonRpcNodeClient {
    async fn address(&self) -> Result<Address, RpcError> {
        self.call("dna_getCoinbaseAddr", [(); 0]).await
    }

    async fn transaction(&self, hash: &str) -> Result<Transaction, RpcError> {
        self.call("bcn_transaction", [hash]).await
    }

    async fn transactions(
        &self,
        address: &Address,
        count: u32,
    ) -> Result<TransactionPage, RpcError> {
        let args = TransactionsArgs {
            address: address.as_str(),
            count,
        };
        self.call("bcn_transactions", [args]).await
    }

    async fn pending_transactions(
        &self,
        address: &Address,
        count: u32,
    ) -> Result<TransactionPage, RpcError> {
        let args = TransactionsArgs {
            address: address.as_str(),
            count,
        };
        self.call("bcn_pendingTransactions", [args]).await
    }
}
