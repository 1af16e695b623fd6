//! Wallet account model.
//!
//! A wallet is either mnemonic-backed (accounts re-derived on demand from
//! the phrase, never cached) or a single imported private key. The
//! serialized form is versioned JSON; the only legacy shape still accepted
//! is the bare `{"privateKeyHex": …}` payload, which migrates into a v2
//! private-key wallet on parse.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use catalyst_core::derivation::{derive_account_privkey_v1, seed_from_mnemonic};
use catalyst_core::{Address, PrivateKey};

use crate::error::WalletError;

/// Current wallet payload version.
pub const WALLET_VERSION: u32 = 2;

/// A single account within a wallet.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    /// Stable opaque id, unique within the wallet.
    pub id: String,
    /// Human-readable label.
    pub label: String,
    /// The account address.
    pub address: Address,
    /// Derivation index; present iff the account is mnemonic-derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_index: Option<u32>,
    /// Creation timestamp, unix milliseconds.
    pub created_at_ms: u64,
}

/// The secret material backing a wallet, tagged by kind.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, Zeroize, ZeroizeOnDrop)]
#[serde(tag = "kind")]
pub enum WalletSecrets {
    /// Accounts derived from a BIP-39 phrase.
    #[serde(rename = "mnemonic_v1")]
    MnemonicV1 {
        /// The recovery phrase.
        mnemonic: String,
        /// BIP-39 passphrase, empty by default.
        passphrase: String,
        /// Next derivation index; strictly above every account's index.
        #[serde(rename = "nextAccountIndex")]
        next_account_index: u32,
    },

    /// A single imported private key.
    #[serde(rename = "private_key_v1")]
    PrivateKeyV1 {
        /// The key, canonical `0x` hex.
        #[serde(rename = "privateKeyHex")]
        private_key_hex: String,
    },
}

/// A version-2 wallet payload.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletData {
    /// Payload version; always [`WALLET_VERSION`].
    pub version: u32,
    /// Wallet display name.
    pub name: String,
    /// Creation timestamp, unix milliseconds.
    pub created_at_ms: u64,
    /// Ordered, non-empty account list.
    pub accounts: Vec<WalletAccount>,
    /// Id of the selected account; always present in `accounts`.
    pub selected_account_id: String,
    /// Secret material, tagged by wallet kind.
    #[serde(flatten)]
    pub secrets: WalletSecrets,
}

fn account_id(address: &Address) -> String {
    // Stable across re-derivation: the first 16 hex chars of the address.
    format!("acct-{}", &address.to_hex()[2..18])
}

impl WalletData {
    /// Create a mnemonic wallet with accounts `0..initial_accounts`.
    ///
    /// Account 0 is selected; `next_account_index` starts at
    /// `initial_accounts`.
    pub fn create_from_mnemonic(
        name: &str,
        mnemonic: &str,
        passphrase: &str,
        initial_accounts: u32,
        now_ms: u64,
    ) -> Result<Self, WalletError> {
        if initial_accounts == 0 {
            return Err(WalletError::UnsupportedOperation(
                "a wallet needs at least one account".to_string(),
            ));
        }

        let seed = seed_from_mnemonic(mnemonic, passphrase)?;
        let accounts: Vec<WalletAccount> = (0..initial_accounts)
            .map(|index| {
                let address = derive_account_privkey_v1(&seed, index).address();
                WalletAccount {
                    id: account_id(&address),
                    label: format!("Account {}", index + 1),
                    address,
                    account_index: Some(index),
                    created_at_ms: now_ms,
                }
            })
            .collect();
        let selected_account_id = accounts[0].id.clone();

        Ok(Self {
            version: WALLET_VERSION,
            name: name.to_string(),
            created_at_ms: now_ms,
            accounts,
            selected_account_id,
            secrets: WalletSecrets::MnemonicV1 {
                mnemonic: mnemonic.to_string(),
                passphrase: passphrase.to_string(),
                next_account_index: initial_accounts,
            },
        })
    }

    /// Create a single-account wallet around an imported private key.
    pub fn create_from_privkey(
        name: &str,
        private_key_hex: &str,
        now_ms: u64,
    ) -> Result<Self, WalletError> {
        let privkey = PrivateKey::from_hex(private_key_hex)?;
        let address = privkey.address();
        let account = WalletAccount {
            id: account_id(&address),
            label: "Account 1".to_string(),
            address,
            account_index: None,
            created_at_ms: now_ms,
        };
        let selected_account_id = account.id.clone();

        Ok(Self {
            version: WALLET_VERSION,
            name: name.to_string(),
            created_at_ms: now_ms,
            accounts: vec![account],
            selected_account_id,
            secrets: WalletSecrets::PrivateKeyV1 {
                private_key_hex: privkey.to_hex(),
            },
        })
    }

    /// Parse a stored payload, migrating legacy shapes.
    ///
    /// Accepts a `{"version": 2, …}` wallet directly, or the legacy
    /// `{"privateKeyHex": …}` payload; anything else is an error.
    pub fn parse_any(payload: &[u8], now_ms: u64) -> Result<Self, WalletError> {
        let value: serde_json::Value =
            serde_json::from_slice(payload).map_err(|_| WalletError::UnknownPayload)?;

        if value.get("version").and_then(|v| v.as_u64()) == Some(u64::from(WALLET_VERSION)) {
            return serde_json::from_value(value).map_err(|_| WalletError::UnknownPayload);
        }

        if let Some(private_key_hex) = value.get("privateKeyHex").and_then(|v| v.as_str()) {
            return Self::create_from_privkey("Imported wallet", private_key_hex, now_ms);
        }

        Err(WalletError::UnknownPayload)
    }

    /// Serialize for vault sealing.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("wallet payload serializes")
    }

    /// The selected account.
    pub fn selected_account(&self) -> Result<&WalletAccount, WalletError> {
        self.accounts
            .iter()
            .find(|account| account.id == self.selected_account_id)
            .ok_or_else(|| WalletError::UnknownAccount(self.selected_account_id.clone()))
    }

    /// Look an account up by id.
    pub fn account(&self, id: &str) -> Result<&WalletAccount, WalletError> {
        self.accounts
            .iter()
            .find(|account| account.id == id)
            .ok_or_else(|| WalletError::UnknownAccount(id.to_string()))
    }

    /// Derive and append the next account; selects it.
    ///
    /// Only mnemonic wallets can grow.
    pub fn add_account(&mut self, now_ms: u64) -> Result<&WalletAccount, WalletError> {
        let WalletSecrets::MnemonicV1 {
            mnemonic,
            passphrase,
            next_account_index,
        } = &mut self.secrets
        else {
            return Err(WalletError::UnsupportedOperation(
                "cannot add accounts to a private-key wallet".to_string(),
            ));
        };

        let index = *next_account_index;
        let seed = seed_from_mnemonic(mnemonic, passphrase)?;
        let address = derive_account_privkey_v1(&seed, index).address();
        let account = WalletAccount {
            id: account_id(&address),
            label: format!("Account {}", index + 1),
            address,
            account_index: Some(index),
            created_at_ms: now_ms,
        };
        *next_account_index = index + 1;

        self.selected_account_id = account.id.clone();
        self.accounts.push(account);
        Ok(self.accounts.last().expect("just pushed"))
    }

    /// Select an existing account by id.
    pub fn select_account(&mut self, id: &str) -> Result<(), WalletError> {
        if !self.accounts.iter().any(|account| account.id == id) {
            return Err(WalletError::UnknownAccount(id.to_string()));
        }
        self.selected_account_id = id.to_string();
        Ok(())
    }

    /// The private key for an account, re-derived on demand.
    ///
    /// Mnemonic wallets never cache derived keys; the phrase is the only
    /// long-lived secret.
    pub fn privkey_for(&self, id: &str) -> Result<PrivateKey, WalletError> {
        let account = self.account(id)?;
        match &self.secrets {
            WalletSecrets::PrivateKeyV1 { private_key_hex } => {
                Ok(PrivateKey::from_hex(private_key_hex)?)
            }
            WalletSecrets::MnemonicV1 {
                mnemonic,
                passphrase,
                ..
            } => {
                let index = account.account_index.ok_or_else(|| {
                    WalletError::UnsupportedOperation(
                        "mnemonic account has no derivation index".to_string(),
                    )
                })?;
                let seed = seed_from_mnemonic(mnemonic, passphrase)?;
                Ok(derive_account_privkey_v1(&seed, index))
            }
        }
    }
}
