//! Network configuration.
//!
//! Defaults are concrete values, not placeholders: a core constructed with
//! `NetworkConfig::default()` talks to the Catalyst testnet.

use serde::{Deserialize, Serialize};

use crate::chain::ChainIdentity;

/// Identity and endpoints of the network the wallet talks to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NetworkConfig {
    /// Network identifier string.
    pub network_id: String,
    /// Numeric chain id.
    pub chain_id: u64,
    /// Genesis hash, canonical `0x` hex.
    pub genesis_hash: String,
    /// Ordered RPC endpoints; the first is tried first.
    pub rpc_urls: Vec<String>,
}

impl NetworkConfig {
    /// The Catalyst testnet (EU endpoint first).
    pub fn testnet() -> Self {
        Self {
            network_id: "catalyst-testnet".to_string(),
            chain_id: 200_820_092,
            genesis_hash: "0xeea139414d69393cc5a9d247a60a0e41e26d8ebe595165f647d4ad972affee5a"
                .to_string(),
            rpc_urls: vec![
                "https://rpc-eu.catalyst-testnet.io".to_string(),
                "https://rpc-us.catalyst-testnet.io".to_string(),
                "https://rpc-asia.catalyst-testnet.io".to_string(),
            ],
        }
    }

    /// The identity triple RPC endpoints must advertise.
    pub fn expected_identity(&self) -> ChainIdentity {
        ChainIdentity {
            chain_id: self.chain_id,
            network_id: self.network_id.clone(),
            genesis_hash: self.genesis_hash.clone(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::testnet()
    }
}
