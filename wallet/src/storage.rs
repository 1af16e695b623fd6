//! Host persistence interface.
//!
//! The host hands the core an opaque key-value store; everything the
//! wallet persists (vault record, preferred RPC URL, tracked transactions,
//! cached history) goes through it under the fixed keys below. Values are
//! opaque byte blobs to the host.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use displaydoc::Display;
use thiserror::Error;

use catalyst_core::Address;

/// Storage key for the vault record.
pub const VAULT_KEY: &str = "catalyst_wallet_vault_v1";

/// Storage key for the preferred RPC URL (UTF-8).
pub const RPC_URL_KEY: &str = "catalyst_wallet_rpc_url";

/// Storage key for an address's tracked-transaction list.
pub fn tracked_txs_key(network_id: &str, address: &Address) -> String {
    format!("catalyst_wallet_txs_v1:{network_id}:{}", address.to_hex())
}

/// Storage key for an address's cached RPC history.
pub fn chain_history_key(network_id: &str, address: &Address) -> String {
    format!(
        "catalyst_wallet_chain_history_v1:{network_id}:{}",
        address.to_hex()
    )
}

/// A storage backend failure, as reported by the host.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
/// Storage failure: {0}
pub struct StorageError(pub String);

/// Host-provided key-value persistence.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Load the value stored under `key`, if any.
    async fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn kv_set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Remove the value stored under `key`, if any.
    async fn kv_remove(&self, key: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl<K: KvStore + ?Sized> KvStore for &K {
    async fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).kv_get(key).await
    }

    async fn kv_set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        (**self).kv_set(key, value).await
    }

    async fn kv_remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).kv_remove(key).await
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn kv_get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self.entries.lock().expect("kv map poisoned");
        Ok(entries.get(key).cloned())
    }

    async fn kv_set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("kv map poisoned");
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn kv_remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("kv map poisoned");
        entries.remove(key);
        Ok(())
    }
}
