//! Tracked-transaction records.
//!
//! Every broadcast gets a local record keyed by its wire-derived id;
//! `WalletCore` polls receipts on a fixed tick and persists the list
//! (newest first, capped at 50) through the storage interface after every
//! change. The tracker itself is pure bookkeeping and never performs I/O.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// How often pending receipts are polled while the wallet is unlocked.
pub const RECEIPT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(2500);

/// Maximum records persisted per address.
pub const MAX_TRACKED_PER_ADDRESS: usize = 50;

/// Status set once the chain has definitively applied the transaction.
pub const STATUS_APPLIED: &str = "applied";

/// Status set once the chain has definitively dropped the transaction.
pub const STATUS_DROPPED: &str = "dropped";

/// Status while the chain reports no receipt at all.
pub const STATUS_NOT_FOUND: &str = "not_found";

/// Status after a non-transient polling failure.
pub const STATUS_ERROR: &str = "error";

/// Whether a status will never change again.
pub fn is_terminal(status: &str) -> bool {
    status == STATUS_APPLIED || status == STATUS_DROPPED
}

/// One tracked transaction.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TrackedTx {
    /// Id computed locally from the signed wire bytes.
    pub local_id: String,
    /// Id the broadcast endpoint returned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    /// Last observed status.
    pub status: String,
    /// Last receipt payload, or the error message for `error` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_receipt: Option<Value>,
    /// When the receipt was last polled, unix milliseconds.
    pub last_checked_ms: u64,
    /// When the record was created, unix milliseconds.
    pub created_ms: u64,
}

impl TrackedTx {
    /// The id to poll receipts with: the server's if it returned one.
    pub fn poll_id(&self) -> &str {
        self.server_id.as_deref().unwrap_or(&self.local_id)
    }
}

/// Per-address tracked-transaction list, newest first.
#[derive(Clone, Debug, Default)]
pub struct TxTracker {
    entries: Vec<TrackedTx>,
}

impl TxTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from stored bytes; malformed state degrades to empty.
    pub fn from_stored(bytes: Option<&[u8]>) -> Self {
        let entries = bytes
            .and_then(|b| match serde_json::from_slice(b) {
                Ok(entries) => Some(entries),
                Err(err) => {
                    debug!("discarding unreadable tracked-transaction state: {err}");
                    None
                }
            })
            .unwrap_or_default();
        Self { entries }
    }

    /// Serialize the newest [`MAX_TRACKED_PER_ADDRESS`] records.
    pub fn to_bytes(&self) -> Vec<u8> {
        let top = &self.entries[..self.entries.len().min(MAX_TRACKED_PER_ADDRESS)];
        serde_json::to_vec(top).expect("tracked list serializes")
    }

    /// All records, newest first.
    pub fn entries(&self) -> &[TrackedTx] {
        &self.entries
    }

    /// Record a fresh broadcast.
    pub fn record_submission(
        &mut self,
        local_id: String,
        server_id: Option<String>,
        now_ms: u64,
    ) {
        self.entries.insert(
            0,
            TrackedTx {
                local_id,
                server_id,
                status: STATUS_NOT_FOUND.to_string(),
                last_receipt: None,
                last_checked_ms: now_ms,
                created_ms: now_ms,
            },
        );
        self.entries.truncate(MAX_TRACKED_PER_ADDRESS);
    }

    /// Ids of entries still worth polling: non-terminal with at least one id.
    pub fn pending_poll_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| !is_terminal(&entry.status))
            .filter(|entry| !entry.poll_id().is_empty())
            .map(|entry| entry.poll_id().to_string())
            .collect()
    }

    /// Apply a polled receipt (or its absence) to the matching entry.
    ///
    /// Returns `true` when this update transitioned the entry to
    /// `applied`.
    pub fn apply_receipt(
        &mut self,
        poll_id: &str,
        status: &str,
        receipt: Option<Value>,
        now_ms: u64,
    ) -> bool {
        let Some(entry) = self.entry_mut(poll_id) else {
            return false;
        };
        let was_applied = entry.status == STATUS_APPLIED;
        entry.status = status.to_string();
        entry.last_receipt = receipt;
        entry.last_checked_ms = now_ms;
        !was_applied && status == STATUS_APPLIED
    }

    /// Mark an entry failed with the error message as its receipt payload.
    pub fn mark_error(&mut self, poll_id: &str, message: &str, now_ms: u64) {
        if let Some(entry) = self.entry_mut(poll_id) {
            entry.status = STATUS_ERROR.to_string();
            entry.last_receipt = Some(Value::String(message.to_string()));
            entry.last_checked_ms = now_ms;
        }
    }

    fn entry_mut(&mut self, poll_id: &str) -> Option<&mut TrackedTx> {
        self.entries
            .iter_mut()
            .find(|entry| entry.poll_id() == poll_id || entry.local_id == poll_id)
    }
}
