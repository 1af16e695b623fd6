//! Wallet error types.
//!
//! The per-concern enums (`VaultError`, `RpcError`, `StorageError`) live
//! next to their modules; this is the top-level kind every `WalletCore`
//! operation surfaces.

use displaydoc::Display;
use thiserror::Error;

use catalyst_core::{CodecError, DerivationError, ProtocolError};

use crate::chain::ChainIdentityField;
use crate::rpc::RpcError;
use crate::storage::StorageError;
use crate::vault::VaultError;

/// Errors surfaced by wallet operations.
#[derive(Debug, Display, Error)]
pub enum WalletError {
    /// Codec failure: {0}
    Codec(#[from] CodecError),

    /// Derivation failure: {0}
    Derivation(#[from] DerivationError),

    /// Protocol failure: {0}
    Protocol(#[from] ProtocolError),

    /// Vault failure: {0}
    Vault(#[from] VaultError),

    /// RPC failure: {0}
    Rpc(#[from] RpcError),

    /// Storage failure: {0}
    Storage(#[from] StorageError),

    /// No account with id {0}
    UnknownAccount(String),

    /// Operation not supported for this wallet: {0}
    UnsupportedOperation(String),

    /// Unrecognized wallet payload
    UnknownPayload,

    /// No vault record present in storage
    VaultMissing,

    /// Wallet is locked
    Locked,

    /// Chain identity mismatch on {field}: expected {expected}, got {actual}
    ChainMismatch {
        /// The identity component that differed.
        field: ChainIdentityField,
        /// The configured value.
        expected: String,
        /// The value the endpoint advertised.
        actual: String,
    },

    /// Insufficient funds: have {have}, need {need}
    InsufficientFunds {
        /// Current balance in base units.
        have: u128,
        /// Amount plus fee the transfer requires.
        need: u128,
    },

    /// Broadcast rejected on nonce grounds; refresh the floor and retry
    NonceRace,
}
