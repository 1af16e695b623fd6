//! Catalyst non-custodial wallet core.
//!
//! A thin client for the Catalyst account ledger that manages its own keys
//! locally and talks to untrusted nodes over JSON-RPC.
//!
//! ## Security model
//!
//! - Private keys never leave the wallet; signing happens locally
//! - Secrets rest encrypted in a password-sealed vault
//! - Endpoints are untrusted: chain identity is verified before every
//!   broadcast, and multiple endpoints provide failover
//! - The host supplies persistence and HTTP transport; the core never
//!   touches the filesystem or the network directly

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod chain;
pub mod config;
pub mod core;
pub mod error;
pub mod model;
pub mod nonce;
pub mod rpc;
pub mod storage;
pub mod tracker;
pub mod transport;
pub mod vault;

pub use chain::{assert_chain_identity, ChainIdentity, ChainIdentityField};
pub use config::NetworkConfig;
pub use core::{AccountStatus, SendOutcome, WalletCore, DEFAULT_HISTORY_LIMIT};
pub use error::WalletError;
pub use model::{WalletAccount, WalletData, WalletSecrets};
pub use nonce::NonceAllocator;
pub use rpc::{CallOptions, FeeEstimateRequest, RpcClient, RpcError, SyncInfo};
pub use storage::{KvStore, MemoryKvStore, StorageError};
pub use tracker::{TrackedTx, TxTracker, MAX_TRACKED_PER_ADDRESS, RECEIPT_POLL_INTERVAL};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use vault::{VaultError, VaultRecord};
