//! JSON-RPC 2.0 client with multi-endpoint failover.
//!
//! Endpoints are tried starting from the last one that answered, wrapping
//! around the ordered list. Only transport-level failures and retryable
//! HTTP statuses (5xx, 408, 429) move the client to the next endpoint; a
//! JSON-RPC `error` object or any other 4xx is an answer from the chain
//! and is surfaced as-is. The request-id counter and the last-good index
//! are atomics, so a single `call` never observes torn state.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use displaydoc::Display;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use catalyst_core::Address;

use crate::transport::{HttpTransport, TransportError};

/// Default timeout for RPC requests.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for transaction broadcasts, which are worth waiting on.
pub const BROADCAST_TIMEOUT: Duration = Duration::from_secs(20);

const PARSE_ERROR_CODE: i64 = -32700;

/// RPC failures.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum RpcError {
    /// HTTP error status {0}
    Http(u16),

    /// RPC request timed out
    Timeout,

    /// Network error: {0}
    Network(String),

    /// JSON-RPC error {code}: {message}
    Protocol {
        /// JSON-RPC error code.
        code: i64,
        /// Server-provided message.
        message: String,
    },

    /// All RPC endpoints failed: {0}
    Unreachable(#[source] Box<RpcError>),
}

impl RpcError {
    /// Whether the next endpoint is worth trying.
    ///
    /// A JSON-RPC error object or a non-retryable 4xx is an answer from
    /// the chain itself; retrying it elsewhere would just repeat it.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Timeout | RpcError::Network(_) => true,
            RpcError::Http(status) => *status >= 500 || *status == 408 || *status == 429,
            RpcError::Protocol { .. } | RpcError::Unreachable(_) => false,
        }
    }
}

/// Per-call knobs.
#[derive(Clone, Copy, Debug)]
pub struct CallOptions {
    /// Abort the HTTP request after this long.
    pub timeout: Duration,
    /// Whether retryable failures may rotate to the next endpoint.
    pub allow_failover: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RPC_TIMEOUT,
            allow_failover: true,
        }
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// Result of `catalyst_getSyncInfo`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct SyncInfo {
    /// Chain id, decimal or `0x` hex string.
    pub chain_id: String,
    /// Network identifier string.
    pub network_id: String,
    /// Genesis hash.
    pub genesis_hash: String,
}

/// Request object for `catalyst_estimateFee`.
#[derive(Clone, Debug, Serialize)]
pub struct FeeEstimateRequest {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Transfer value, decimal string.
    pub value: String,
    /// Always null for plain transfers.
    pub data: Option<String>,
    /// Always null; no gas market on Catalyst.
    pub gas_limit: Option<u64>,
    /// Always null; no gas market on Catalyst.
    pub gas_price: Option<u64>,
}

impl FeeEstimateRequest {
    /// Shape a plain-transfer estimate request.
    pub fn transfer(from: &Address, to: &Address, value: i64) -> Self {
        Self {
            from: from.to_hex(),
            to: to.to_hex(),
            value: value.to_string(),
            data: None,
            gas_limit: None,
            gas_price: None,
        }
    }
}

/// A transaction receipt as returned by the chain.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TransactionReceipt {
    /// Receipt status string (`applied`, `dropped`, `pending`, …).
    pub status: String,
    /// Any further receipt fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A history entry from `catalyst_getTransactionsByAddress`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TransactionSummary {
    /// Transaction id.
    pub id: String,
    /// Status string, if the chain reports one.
    #[serde(default)]
    pub status: Option<String>,
    /// Ledger cycle the transaction applied in.
    #[serde(default)]
    pub cycle: Option<u64>,
    /// Submission timestamp, unix milliseconds.
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// Any further summary fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// JSON-RPC client over an ordered endpoint list.
pub struct RpcClient<T> {
    urls: Vec<String>,
    transport: T,
    next_id: AtomicU64,
    last_good: AtomicUsize,
}

impl<T: HttpTransport> RpcClient<T> {
    /// Create a client over `urls` (at least one).
    pub fn new(urls: Vec<String>, transport: T) -> Result<Self, RpcError> {
        if urls.is_empty() {
            return Err(RpcError::Network("no RPC endpoints configured".to_string()));
        }
        Ok(Self {
            urls,
            transport,
            next_id: AtomicU64::new(1),
            last_good: AtomicUsize::new(0),
        })
    }

    /// Create a client, starting from `preferred` if it is in the list.
    pub fn with_preferred(
        urls: Vec<String>,
        transport: T,
        preferred: Option<&str>,
    ) -> Result<Self, RpcError> {
        let client = Self::new(urls, transport)?;
        if let Some(preferred) = preferred {
            if let Some(index) = client.urls.iter().position(|u| u == preferred) {
                client.last_good.store(index, Ordering::Relaxed);
            }
        }
        Ok(client)
    }

    /// The configured endpoints, in order.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// The endpoint that last answered (or the first, initially).
    pub fn last_good_url(&self) -> &str {
        &self.urls[self.last_good.load(Ordering::Relaxed) % self.urls.len()]
    }

    async fn call_url(
        &self,
        url: &str,
        method: &str,
        params: &Value,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        let body = serde_json::to_vec(&request).expect("request serializes");

        let response = self
            .transport
            .post_json(url, body, timeout)
            .await
            .map_err(|err| match err {
                TransportError::Timeout => RpcError::Timeout,
                TransportError::Network(message) => RpcError::Network(message),
            })?;

        if !(200..300).contains(&response.status) {
            return Err(RpcError::Http(response.status));
        }

        let parsed: JsonRpcResponse =
            serde_json::from_slice(&response.body).map_err(|_| RpcError::Protocol {
                code: PARSE_ERROR_CODE,
                message: "invalid JSON-RPC response body".to_string(),
            })?;

        if let Some(error) = parsed.error {
            return Err(RpcError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        Ok(parsed.result.unwrap_or(Value::Null))
    }

    /// Execute a JSON-RPC call, rotating through endpoints on retryable
    /// failures.
    ///
    /// Endpoints are tried in the order `[last_good, last_good+1, …]`
    /// wrapping around; a success promotes its endpoint to `last_good`.
    /// With `allow_failover` off only the current endpoint is tried.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        options: CallOptions,
    ) -> Result<Value, RpcError> {
        let len = self.urls.len();
        let start = self.last_good.load(Ordering::Relaxed) % len;
        let candidates: Vec<usize> = if options.allow_failover {
            (0..len).map(|offset| (start + offset) % len).collect()
        } else {
            vec![start]
        };

        let mut last_err = None;
        for index in candidates {
            let url = &self.urls[index];
            match self.call_url(url, method, &params, options.timeout).await {
                Ok(result) => {
                    if index != start {
                        debug!("promoting RPC endpoint {url}");
                    }
                    self.last_good.store(index, Ordering::Relaxed);
                    return Ok(result);
                }
                Err(err) => {
                    warn!("RPC {method} via {url} failed: {err}");
                    if !err.is_retryable() || !options.allow_failover {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
            }
        }

        Err(RpcError::Unreachable(Box::new(
            last_err.expect("at least one endpoint was tried"),
        )))
    }

    fn decode<D: DeserializeOwned>(value: Value) -> Result<D, RpcError> {
        serde_json::from_value(value).map_err(|err| RpcError::Protocol {
            code: PARSE_ERROR_CODE,
            message: format!("unexpected result shape: {err}"),
        })
    }

    fn decode_decimal<N: std::str::FromStr>(value: Value, what: &str) -> Result<N, RpcError> {
        let text = match &value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        text.trim().parse().map_err(|_| RpcError::Protocol {
            code: PARSE_ERROR_CODE,
            message: format!("malformed {what}: {value}"),
        })
    }

    /// `catalyst_getSyncInfo`.
    pub async fn get_sync_info(&self) -> Result<SyncInfo, RpcError> {
        let result = self
            .call("catalyst_getSyncInfo", json!([]), CallOptions::default())
            .await?;
        Self::decode(result)
    }

    /// `catalyst_chainId`.
    pub async fn chain_id(&self) -> Result<String, RpcError> {
        let result = self
            .call("catalyst_chainId", json!([]), CallOptions::default())
            .await?;
        Self::decode(result)
    }

    /// `catalyst_networkId`.
    pub async fn network_id(&self) -> Result<String, RpcError> {
        let result = self
            .call("catalyst_networkId", json!([]), CallOptions::default())
            .await?;
        Self::decode(result)
    }

    /// `catalyst_genesisHash`.
    pub async fn genesis_hash(&self) -> Result<String, RpcError> {
        let result = self
            .call("catalyst_genesisHash", json!([]), CallOptions::default())
            .await?;
        Self::decode(result)
    }

    /// `catalyst_getBalance`: decimal string, parsed to base units.
    pub async fn get_balance(&self, address: &Address) -> Result<u128, RpcError> {
        let result = self
            .call(
                "catalyst_getBalance",
                json!([address.to_hex()]),
                CallOptions::default(),
            )
            .await?;
        Self::decode_decimal(result, "balance")
    }

    /// `catalyst_getNonce`: the sender's committed nonce.
    pub async fn get_nonce(&self, address: &Address) -> Result<u64, RpcError> {
        let result = self
            .call(
                "catalyst_getNonce",
                json!([address.to_hex()]),
                CallOptions::default(),
            )
            .await?;
        Self::decode(result)
    }

    /// `catalyst_estimateFee`: decimal string, parsed to base units.
    pub async fn estimate_fee(&self, request: &FeeEstimateRequest) -> Result<u64, RpcError> {
        let result = self
            .call(
                "catalyst_estimateFee",
                json!([request]),
                CallOptions::default(),
            )
            .await?;
        Self::decode_decimal(result, "fee estimate")
    }

    /// `catalyst_sendRawTransaction`: broadcast the wire hex, returning the
    /// server-side transaction id. Uses the long broadcast timeout and
    /// always fails over.
    pub async fn send_raw_transaction(&self, wire_hex: &str) -> Result<String, RpcError> {
        let result = self
            .call(
                "catalyst_sendRawTransaction",
                json!([wire_hex]),
                CallOptions {
                    timeout: BROADCAST_TIMEOUT,
                    allow_failover: true,
                },
            )
            .await?;
        Self::decode(result)
    }

    /// `catalyst_getTransactionReceipt`: `None` while the chain has not
    /// seen the transaction.
    pub async fn get_transaction_receipt(
        &self,
        tx_id: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        let result = self
            .call(
                "catalyst_getTransactionReceipt",
                json!([tx_id]),
                CallOptions::default(),
            )
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Self::decode(result).map(Some)
    }

    /// `catalyst_getTransactionsByAddress`.
    pub async fn get_transactions_by_address(
        &self,
        address: &Address,
        from_cycle: Option<u64>,
        limit: u32,
    ) -> Result<Vec<TransactionSummary>, RpcError> {
        let result = self
            .call(
                "catalyst_getTransactionsByAddress",
                json!([address.to_hex(), from_cycle, limit]),
                CallOptions::default(),
            )
            .await?;
        Self::decode(result)
    }
}
