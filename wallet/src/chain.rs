//! Chain-identity verification.
//!
//! Before any broadcast the wallet checks that the endpoint it is talking
//! to actually serves the configured chain: the `(chain_id, network_id,
//! genesis_hash)` triple must match. A cached "verified" flag is advisory
//! only; `WalletCore::send` re-verifies immediately before broadcasting.

use std::fmt;

use tracing::debug;

use crate::error::WalletError;
use crate::rpc::RpcClient;
use crate::transport::HttpTransport;

/// The triple that uniquely identifies a chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainIdentity {
    /// Numeric chain id.
    pub chain_id: u64,
    /// Network identifier string.
    pub network_id: String,
    /// Genesis hash, canonical `0x` hex.
    pub genesis_hash: String,
}

/// The identity component that failed to match.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChainIdentityField {
    /// The numeric chain id.
    ChainId,
    /// The network identifier string.
    NetworkId,
    /// The genesis hash.
    GenesisHash,
}

impl fmt::Display for ChainIdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChainIdentityField::ChainId => "chain_id",
            ChainIdentityField::NetworkId => "network_id",
            ChainIdentityField::GenesisHash => "genesis_hash",
        })
    }
}

/// Parse a chain id advertised as either `0x…` hex or decimal.
pub fn parse_chain_id(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(hex_body) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex_body, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn normalize_hash(s: &str) -> String {
    let lowered = s.trim().to_ascii_lowercase();
    lowered.strip_prefix("0x").unwrap_or(&lowered).to_string()
}

fn mismatch(field: ChainIdentityField, expected: String, actual: String) -> WalletError {
    WalletError::ChainMismatch {
        field,
        expected,
        actual,
    }
}

/// Verify that `rpc` advertises the expected chain identity.
///
/// Prefers the single `catalyst_getSyncInfo` call; if that method is
/// unavailable the three individual getters are queried instead. String
/// comparisons are case-insensitive; the chain id is compared numerically.
pub async fn assert_chain_identity<T: HttpTransport>(
    rpc: &RpcClient<T>,
    expected: &ChainIdentity,
) -> Result<(), WalletError> {
    let (chain_id_raw, network_id, genesis_hash) = match rpc.get_sync_info().await {
        Ok(info) => (info.chain_id, info.network_id, info.genesis_hash),
        Err(err) => {
            debug!("getSyncInfo unavailable ({err}), falling back to individual getters");
            (
                rpc.chain_id().await?,
                rpc.network_id().await?,
                rpc.genesis_hash().await?,
            )
        }
    };

    match parse_chain_id(&chain_id_raw) {
        Some(actual) if actual == expected.chain_id => {}
        _ => {
            return Err(mismatch(
                ChainIdentityField::ChainId,
                expected.chain_id.to_string(),
                chain_id_raw,
            ));
        }
    }

    if network_id.trim().to_ascii_lowercase() != expected.network_id.to_ascii_lowercase() {
        return Err(mismatch(
            ChainIdentityField::NetworkId,
            expected.network_id.clone(),
            network_id,
        ));
    }

    if normalize_hash(&genesis_hash) != normalize_hash(&expected.genesis_hash) {
        return Err(mismatch(
            ChainIdentityField::GenesisHash,
            expected.genesis_hash.clone(),
            genesis_hash,
        ));
    }

    Ok(())
}
