//! Wallet session and transfer orchestration.
//!
//! `WalletCore` owns every piece of mutable cross-cutting state: the RPC
//! client, the nonce allocator, the receipt tracker and the unlocked
//! session. All operations take `&mut self`; the host drives them from a
//! single event loop. Secrets live only inside the session and are wiped
//! on lock.

use rand::rngs::OsRng;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use catalyst_core::codec::parse_hex32;
use catalyst_core::protocol::{
    build_transfer_v1, encode_wire_tx_v1, transaction_signing_payload_v1, tx_id_v1,
    AggregatedSignature, Transaction,
};
use catalyst_core::{signer, Address, PrivateKey, ProtocolError};

use crate::chain::assert_chain_identity;
use crate::config::NetworkConfig;
use crate::error::WalletError;
use crate::model::{WalletAccount, WalletData};
use crate::nonce::NonceAllocator;
use crate::rpc::{FeeEstimateRequest, RpcClient, RpcError, TransactionSummary};
use crate::storage::{chain_history_key, tracked_txs_key, KvStore, RPC_URL_KEY, VAULT_KEY};
use crate::tracker::{TxTracker, STATUS_NOT_FOUND};
use crate::transport::HttpTransport;
use crate::vault::VaultRecord;

/// Default number of history entries fetched on refresh.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Balance and committed nonce of the selected account.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AccountStatus {
    /// Balance in base units.
    pub balance: u128,
    /// Last committed nonce the chain reports.
    pub committed_nonce: u64,
}

/// The result of a successful broadcast.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SendOutcome {
    /// Id computed locally from the signed wire bytes.
    pub local_id: String,
    /// Id the broadcast endpoint returned.
    pub server_id: String,
    /// Nonce the transfer was built with.
    pub nonce: u64,
    /// Fee the transfer carries.
    pub fees: u64,
}

struct Session {
    wallet: WalletData,
    password: Zeroizing<String>,
}

/// The wallet core: vault, accounts, RPC, nonces and receipt tracking
/// behind one owned value.
pub struct WalletCore<T, S> {
    config: NetworkConfig,
    storage: S,
    rpc: RpcClient<T>,
    nonces: NonceAllocator,
    chain_verified: bool,
    session: Option<Session>,
    tracked_address: Option<Address>,
    tracker: TxTracker,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn is_nonce_rejection(err: &RpcError) -> bool {
    matches!(err, RpcError::Protocol { message, .. } if message.to_ascii_lowercase().contains("nonce"))
}

fn is_transient(err: &RpcError) -> bool {
    matches!(
        err,
        RpcError::Timeout | RpcError::Network(_) | RpcError::Unreachable(_)
    )
}

impl<T: HttpTransport, S: KvStore> WalletCore<T, S> {
    /// Construct a core over the host's transport and storage.
    ///
    /// Restores the preferred RPC endpoint from storage so failover
    /// decisions survive restarts.
    pub async fn new(config: NetworkConfig, transport: T, storage: S) -> Result<Self, WalletError> {
        let preferred = storage
            .kv_get(RPC_URL_KEY)
            .await?
            .and_then(|bytes| String::from_utf8(bytes).ok());
        let rpc = RpcClient::with_preferred(config.rpc_urls.clone(), transport, preferred.as_deref())?;

        Ok(Self {
            config,
            storage,
            rpc,
            nonces: NonceAllocator::new(),
            chain_verified: false,
            session: None,
            tracked_address: None,
            tracker: TxTracker::new(),
        })
    }

    /// The network this core is configured for.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Direct access to the RPC client.
    pub fn rpc(&self) -> &RpcClient<T> {
        &self.rpc
    }

    /// Whether a vault record exists in storage.
    pub async fn has_vault(&self) -> Result<bool, WalletError> {
        Ok(self.storage.kv_get(VAULT_KEY).await?.is_some())
    }

    /// Whether a session is currently unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the chain identity has been verified this session.
    ///
    /// Advisory only: `send` re-verifies immediately before broadcast.
    pub fn chain_verified(&self) -> bool {
        self.chain_verified
    }

    fn session(&self) -> Result<&Session, WalletError> {
        self.session.as_ref().ok_or(WalletError::Locked)
    }

    /// The unlocked wallet.
    pub fn wallet(&self) -> Result<&WalletData, WalletError> {
        Ok(&self.session()?.wallet)
    }

    /// Address of the selected account.
    pub fn selected_address(&self) -> Result<Address, WalletError> {
        Ok(self.session()?.wallet.selected_account()?.address)
    }

    async fn seal_and_store(&self, wallet: &WalletData, password: &str) -> Result<(), WalletError> {
        let record = VaultRecord::create(password, &wallet.to_bytes())?;
        self.storage.kv_set(VAULT_KEY, record.to_bytes()).await?;
        Ok(())
    }

    async fn persist_wallet(&mut self) -> Result<(), WalletError> {
        let session = self.session.as_ref().ok_or(WalletError::Locked)?;
        let wallet = session.wallet.clone();
        let password = session.password.clone();
        self.seal_and_store(&wallet, &password).await
    }

    async fn reload_tracker(&mut self) -> Result<(), WalletError> {
        let address = self
            .session
            .as_ref()
            .and_then(|s| s.wallet.selected_account().ok().map(|a| a.address));
        self.tracked_address = address;
        self.tracker = match address {
            Some(address) => {
                let key = tracked_txs_key(&self.config.network_id, &address);
                TxTracker::from_stored(self.storage.kv_get(&key).await?.as_deref())
            }
            None => TxTracker::new(),
        };
        Ok(())
    }

    async fn persist_tracker(&self) -> Result<(), WalletError> {
        let Some(address) = self.tracked_address else {
            return Ok(());
        };
        let key = tracked_txs_key(&self.config.network_id, &address);
        self.storage.kv_set(&key, self.tracker.to_bytes()).await?;
        Ok(())
    }

    /// Create a mnemonic wallet, seal it and open the session.
    pub async fn create_wallet_from_mnemonic(
        &mut self,
        name: &str,
        mnemonic: &str,
        passphrase: &str,
        initial_accounts: u32,
        password: &str,
    ) -> Result<(), WalletError> {
        let wallet =
            WalletData::create_from_mnemonic(name, mnemonic, passphrase, initial_accounts, now_ms())?;
        self.seal_and_store(&wallet, password).await?;
        self.session = Some(Session {
            wallet,
            password: Zeroizing::new(password.to_string()),
        });
        self.reload_tracker().await
    }

    /// Create a private-key wallet, seal it and open the session.
    pub async fn create_wallet_from_private_key(
        &mut self,
        name: &str,
        private_key_hex: &str,
        password: &str,
    ) -> Result<(), WalletError> {
        let wallet = WalletData::create_from_privkey(name, private_key_hex, now_ms())?;
        self.seal_and_store(&wallet, password).await?;
        self.session = Some(Session {
            wallet,
            password: Zeroizing::new(password.to_string()),
        });
        self.reload_tracker().await
    }

    /// Open the vault and unlock the session.
    pub async fn unlock(&mut self, password: &str) -> Result<(), WalletError> {
        let bytes = self
            .storage
            .kv_get(VAULT_KEY)
            .await?
            .ok_or(WalletError::VaultMissing)?;
        let record = VaultRecord::from_bytes(&bytes)?;
        let plaintext = record.open(password)?;
        let wallet = WalletData::parse_any(&plaintext, now_ms())?;

        self.session = Some(Session {
            wallet,
            password: Zeroizing::new(password.to_string()),
        });
        self.reload_tracker().await
    }

    /// Drop the session; secrets are wiped.
    pub fn lock(&mut self) {
        self.session = None;
        self.tracked_address = None;
        self.tracker = TxTracker::new();
    }

    /// Derive and select the next account (mnemonic wallets only);
    /// re-seals the vault.
    pub async fn add_account(&mut self) -> Result<WalletAccount, WalletError> {
        let session = self.session.as_mut().ok_or(WalletError::Locked)?;
        let account = session.wallet.add_account(now_ms())?.clone();
        self.persist_wallet().await?;
        self.reload_tracker().await?;
        Ok(account)
    }

    /// Select an account by id; re-seals the vault and re-reads the
    /// tracked-transaction list for the new address.
    pub async fn select_account(&mut self, id: &str) -> Result<(), WalletError> {
        let session = self.session.as_mut().ok_or(WalletError::Locked)?;
        session.wallet.select_account(id)?;
        self.persist_wallet().await?;
        self.reload_tracker().await
    }

    /// Verify the endpoint's chain identity against the configuration.
    ///
    /// On success the preferred (last-good) endpoint is persisted.
    pub async fn verify_chain(&mut self) -> Result<(), WalletError> {
        assert_chain_identity(&self.rpc, &self.config.expected_identity()).await?;
        self.chain_verified = true;
        self.storage
            .kv_set(RPC_URL_KEY, self.rpc.last_good_url().as_bytes().to_vec())
            .await?;
        Ok(())
    }

    /// Fetch balance and committed nonce for the selected account and
    /// re-synchronize the nonce floor.
    pub async fn refresh(&mut self) -> Result<AccountStatus, WalletError> {
        let address = self.selected_address()?;
        let balance = self.rpc.get_balance(&address).await?;
        let committed_nonce = self.rpc.get_nonce(&address).await?;
        self.nonces.bump_floor(&address, committed_nonce).await;
        Ok(AccountStatus {
            balance,
            committed_nonce,
        })
    }

    /// Fetch and cache the selected account's on-chain history.
    pub async fn refresh_history(
        &mut self,
        limit: u32,
    ) -> Result<Vec<TransactionSummary>, WalletError> {
        let address = self.selected_address()?;
        let summaries = self
            .rpc
            .get_transactions_by_address(&address, None, limit)
            .await?;
        let key = chain_history_key(&self.config.network_id, &address);
        let bytes = serde_json::to_vec(&summaries).expect("history serializes");
        self.storage.kv_set(&key, bytes).await?;
        Ok(summaries)
    }

    /// The last cached history for the selected account.
    pub async fn cached_history(&self) -> Result<Vec<TransactionSummary>, WalletError> {
        let address = self.selected_address()?;
        let key = chain_history_key(&self.config.network_id, &address);
        let Some(bytes) = self.storage.kv_get(&key).await? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    /// Send `amount` from the selected account to `to`.
    pub async fn send(&mut self, to: &Address, amount: i64) -> Result<SendOutcome, WalletError> {
        let session = self.session()?;
        let account = session.wallet.selected_account()?;
        let from = account.address;
        let account_id = account.id.clone();
        let privkey = session.wallet.privkey_for(&account_id)?;
        self.submit_transfer(&privkey, from, to, amount).await
    }

    /// Send from a shared faucet key, retrying once after a lost nonce
    /// race with a freshly read floor.
    pub async fn faucet_drip(
        &mut self,
        faucet_key: &PrivateKey,
        to: &Address,
        amount: i64,
    ) -> Result<SendOutcome, WalletError> {
        let from = faucet_key.address();
        match self.submit_transfer(faucet_key, from, to, amount).await {
            Err(WalletError::NonceRace) => {
                debug!("faucet lost a nonce race; re-flooring and retrying once");
                let committed = self.rpc.get_nonce(&from).await?;
                self.nonces.bump_floor(&from, committed).await;
                self.submit_transfer(faucet_key, from, to, amount).await
            }
            other => other,
        }
    }

    async fn submit_transfer(
        &mut self,
        privkey: &PrivateKey,
        from: Address,
        to: &Address,
        amount: i64,
    ) -> Result<SendOutcome, WalletError> {
        if amount <= 0 {
            return Err(ProtocolError::AmountNonPositive.into());
        }

        // The identity check must hold immediately before broadcast; the
        // cached flag is advisory only.
        self.verify_chain().await?;

        let balance = self.rpc.get_balance(&from).await?;
        let fees = self
            .rpc
            .estimate_fee(&FeeEstimateRequest::transfer(&from, to, amount))
            .await?;

        let need = if from == *to {
            u128::from(fees)
        } else {
            u128::from(amount.unsigned_abs()) + u128::from(fees)
        };
        if balance < need {
            return Err(WalletError::InsufficientFunds {
                have: balance,
                need,
            });
        }

        let rpc = &self.rpc;
        let nonce = self
            .nonces
            .allocate(&from, || async move { rpc.get_nonce(&from).await })
            .await?;

        let core = build_transfer_v1(&from, to, amount, nonce, 0, fees)?;
        let timestamp = now_ms();
        let genesis_hash = parse_hex32(&self.config.genesis_hash)?;
        let payload =
            transaction_signing_payload_v1(&core, timestamp, self.config.chain_id, genesis_hash)?;
        let signature = signer::sign(privkey, &payload, &mut OsRng);

        let tx = Transaction {
            core,
            signature: AggregatedSignature(signature.to_vec()),
            timestamp,
        };
        let wire = encode_wire_tx_v1(&tx)?;
        let local_id = format!("0x{}", hex::encode(tx_id_v1(&tx)?));
        let wire_hex = format!("0x{}", hex::encode(&wire));

        let server_id = match self.rpc.send_raw_transaction(&wire_hex).await {
            Ok(id) => id,
            Err(err) => {
                warn!("broadcast of {local_id} failed: {err}");
                // Re-read the committed nonce so external activity (or the
                // race we just lost) re-synchronizes the floor.
                if let Ok(committed) = self.rpc.get_nonce(&from).await {
                    self.nonces.bump_floor(&from, committed).await;
                }
                return Err(if is_nonce_rejection(&err) {
                    WalletError::NonceRace
                } else {
                    err.into()
                });
            }
        };

        self.tracker
            .record_submission(local_id.clone(), Some(server_id.clone()), now_ms());
        self.persist_tracker().await?;

        Ok(SendOutcome {
            local_id,
            server_id,
            nonce,
            fees,
        })
    }

    /// One receipt-poll tick over the tracked list.
    ///
    /// Performs at most one RPC round-trip per pending transaction.
    /// Transport-level failures are swallowed until the next tick; chain
    /// errors mark the entry. Returns the ids that transitioned to
    /// `applied`, after triggering a balance/nonce and history refresh for
    /// them.
    pub async fn poll_receipts_once(&mut self) -> Result<Vec<String>, WalletError> {
        let pending = self.tracker.pending_poll_ids();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut applied = Vec::new();
        let mut changed = false;
        for id in pending {
            match self.rpc.get_transaction_receipt(&id).await {
                Ok(receipt) => {
                    let status = receipt
                        .as_ref()
                        .map(|r| r.status.clone())
                        .unwrap_or_else(|| STATUS_NOT_FOUND.to_string());
                    let payload =
                        receipt.map(|r| serde_json::to_value(r).expect("receipt serializes"));
                    if self.tracker.apply_receipt(&id, &status, payload, now_ms()) {
                        applied.push(id.clone());
                    }
                    changed = true;
                }
                Err(err) if is_transient(&err) => {
                    debug!("receipt poll for {id} hit {err}; retrying next tick");
                }
                Err(err) => {
                    self.tracker.mark_error(&id, &err.to_string(), now_ms());
                    changed = true;
                }
            }
        }

        if changed {
            self.persist_tracker().await?;
        }

        if !applied.is_empty() && self.is_unlocked() {
            if let Err(err) = self.refresh().await {
                warn!("post-apply refresh failed: {err}");
            }
            if let Err(err) = self.refresh_history(DEFAULT_HISTORY_LIMIT).await {
                warn!("post-apply history refresh failed: {err}");
            }
        }

        Ok(applied)
    }
}
