//! End-to-end wallet flows over in-memory fakes.
//!
//! These tests drive `WalletCore` the way a host surface would:
//! onboarding, locking and unlocking, account management, transfers with
//! chain-identity and funds guards, nonce handling under races, and
//! receipt polling, all against a scripted mock node and an in-memory
//! key-value store.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use catalyst_core::PrivateKey;
use catalyst_wallet::{
    storage::{tracked_txs_key, RPC_URL_KEY},
    ChainIdentityField, HttpResponse, HttpTransport, KvStore, MemoryKvStore, NetworkConfig,
    TrackedTx, TransportError, VaultError, WalletCore, WalletError,
};

const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";
const TEST_PASSWORD: &str = "secure-test-password-123!";

// Account 0 of TEST_MNEMONIC under the empty passphrase.
const ACCOUNT0_PRIVKEY: &str =
    "0x4e5ae981b522350f99fbc8e2b0a4d7a73067622f8356023225cfeff5236892fa";
const ACCOUNT0_ADDRESS: &str =
    "0x0054cb74d1561cb4f307c6554812fce5d2d419663ced0e63a1efb11b8a915534";

const RECIPIENT: &str = "0x0202020202020202020202020202020202020202020202020202020202020202";

fn recipient() -> catalyst_core::Address {
    catalyst_core::Address::from_hex(RECIPIENT).unwrap()
}

fn test_config() -> NetworkConfig {
    NetworkConfig {
        rpc_urls: vec!["http://node-a".to_string(), "http://node-b".to_string()],
        ..NetworkConfig::testnet()
    }
}

// ============================================================================
// Mock node
// ============================================================================

enum Scripted {
    Ok(Value),
    RpcError(i64, &'static str),
    Transport(TransportError),
}

/// Routes JSON-RPC requests by method: scripted one-shot outcomes first,
/// then per-method defaults.
#[derive(Default)]
struct MockNode {
    scripted: Mutex<HashMap<String, VecDeque<Scripted>>>,
    defaults: Mutex<HashMap<String, Value>>,
    log: Mutex<Vec<(String, String, Value)>>,
}

impl MockNode {
    fn with_identity(config: &NetworkConfig) -> Self {
        let node = Self::default();
        node.set_default(
            "catalyst_getSyncInfo",
            json!({
                "chain_id": config.chain_id.to_string(),
                "network_id": config.network_id,
                "genesis_hash": config.genesis_hash,
            }),
        );
        node.set_default("catalyst_getTransactionsByAddress", json!([]));
        node
    }

    fn set_default(&self, method: &str, result: Value) {
        self.defaults
            .lock()
            .unwrap()
            .insert(method.to_string(), result);
    }

    fn script(&self, method: &str, outcome: Scripted) {
        self.scripted
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(outcome);
    }

    fn calls_of(&self, method: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m, _)| m == method)
            .count()
    }

    fn last_params(&self, method: &str) -> Option<Value> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, m, _)| m == method)
            .map(|(_, _, params)| params.clone())
    }

    fn first_url(&self) -> Option<String> {
        self.log.lock().unwrap().first().map(|(url, _, _)| url.clone())
    }
}

fn rpc_ok(result: Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        body: serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": 1,
        }))
        .unwrap(),
    }
}

fn rpc_error(code: i64, message: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        body: serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "error": {"code": code, "message": message},
            "id": 1,
        }))
        .unwrap(),
    }
}

#[async_trait]
impl HttpTransport for MockNode {
    async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let request: Value = serde_json::from_slice(&body).unwrap();
        let method = request["method"].as_str().unwrap().to_string();
        self.log
            .lock()
            .unwrap()
            .push((url.to_string(), method.clone(), request["params"].clone()));

        if let Some(queue) = self.scripted.lock().unwrap().get_mut(&method) {
            if let Some(outcome) = queue.pop_front() {
                return match outcome {
                    Scripted::Ok(result) => Ok(rpc_ok(result)),
                    Scripted::RpcError(code, message) => Ok(rpc_error(code, message)),
                    Scripted::Transport(err) => Err(err),
                };
            }
        }

        if let Some(result) = self.defaults.lock().unwrap().get(&method) {
            return Ok(rpc_ok(result.clone()));
        }

        panic!("no response configured for {method}");
    }
}

/// A node that answers everything a plain transfer needs.
fn funded_node(config: &NetworkConfig) -> MockNode {
    let node = MockNode::with_identity(config);
    node.set_default("catalyst_getBalance", json!("1000"));
    node.set_default("catalyst_getNonce", json!(4));
    node.set_default("catalyst_estimateFee", json!("5"));
    node.set_default("catalyst_sendRawTransaction", json!("0xserver1"));
    node
}

async fn unlocked_core<'a>(
    config: NetworkConfig,
    node: &'a MockNode,
    storage: &'a MemoryKvStore,
) -> WalletCore<&'a MockNode, &'a MemoryKvStore> {
    let mut core = WalletCore::new(config, node, storage).await.unwrap();
    core.create_wallet_from_mnemonic("Main", TEST_MNEMONIC, "", 1, TEST_PASSWORD)
        .await
        .unwrap();
    core
}

async fn stored_tracked(
    storage: &MemoryKvStore,
    config: &NetworkConfig,
    address: &catalyst_core::Address,
) -> Vec<TrackedTx> {
    let key = tracked_txs_key(&config.network_id, address);
    let bytes = storage.kv_get(&key).await.unwrap().expect("tracked list stored");
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Onboarding & sessions
// ============================================================================

mod sessions {
    use super::*;

    #[tokio::test]
    async fn onboarding_seals_and_unlock_restores() {
        let config = test_config();
        let node = MockNode::with_identity(&config);
        let storage = MemoryKvStore::new();

        let mut core = WalletCore::new(config, &node, &storage).await.unwrap();
        assert!(!core.has_vault().await.unwrap());

        core.create_wallet_from_mnemonic("Main", TEST_MNEMONIC, "", 2, TEST_PASSWORD)
            .await
            .unwrap();
        assert!(core.has_vault().await.unwrap());
        assert!(core.is_unlocked());

        let wallet = core.wallet().unwrap().clone();
        assert_eq!(wallet.accounts.len(), 2);
        assert_eq!(wallet.accounts[0].address.to_hex(), ACCOUNT0_ADDRESS);
        assert_eq!(core.selected_address().unwrap().to_hex(), ACCOUNT0_ADDRESS);

        core.lock();
        assert!(!core.is_unlocked());
        assert!(matches!(core.wallet(), Err(WalletError::Locked)));

        let err = core.unlock("wrong password").await.unwrap_err();
        assert!(matches!(err, WalletError::Vault(VaultError::AuthFailed)));

        core.unlock(TEST_PASSWORD).await.unwrap();
        assert_eq!(core.wallet().unwrap(), &wallet);
    }

    #[tokio::test]
    async fn unlock_without_vault_is_reported() {
        let config = test_config();
        let node = MockNode::with_identity(&config);
        let storage = MemoryKvStore::new();
        let mut core = WalletCore::new(config, &node, &storage).await.unwrap();

        assert!(matches!(
            core.unlock(TEST_PASSWORD).await,
            Err(WalletError::VaultMissing)
        ));
    }

    #[tokio::test]
    async fn private_key_wallet_round_trips() {
        let config = test_config();
        let node = MockNode::with_identity(&config);
        let storage = MemoryKvStore::new();
        let mut core = WalletCore::new(config, &node, &storage).await.unwrap();

        core.create_wallet_from_private_key("Imported", ACCOUNT0_PRIVKEY, TEST_PASSWORD)
            .await
            .unwrap();
        assert_eq!(core.selected_address().unwrap().to_hex(), ACCOUNT0_ADDRESS);

        core.lock();
        core.unlock(TEST_PASSWORD).await.unwrap();
        let wallet = core.wallet().unwrap();
        assert_eq!(wallet.accounts.len(), 1);
        assert_eq!(wallet.accounts[0].account_index, None);
    }

    #[tokio::test]
    async fn account_management_reseals_the_vault() {
        let config = test_config();
        let node = MockNode::with_identity(&config);
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        let added = core.add_account().await.unwrap();
        assert_eq!(added.account_index, Some(1));
        assert_eq!(core.wallet().unwrap().selected_account_id, added.id);

        let first = core.wallet().unwrap().accounts[0].id.clone();
        core.select_account(&first).await.unwrap();

        // Everything above must have been written through the vault.
        core.lock();
        core.unlock(TEST_PASSWORD).await.unwrap();
        let wallet = core.wallet().unwrap();
        assert_eq!(wallet.accounts.len(), 2);
        assert_eq!(wallet.selected_account_id, first);

        assert!(matches!(
            core.select_account("acct-missing").await,
            Err(WalletError::UnknownAccount(_))
        ));
    }
}

// ============================================================================
// Transfers
// ============================================================================

mod transfers {
    use super::*;

    #[tokio::test]
    async fn send_builds_signs_and_broadcasts() {
        let config = test_config();
        let node = funded_node(&config);
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config.clone(), &node, &storage).await;

        let outcome = core.send(&recipient(), 200).await.unwrap();
        assert_eq!(outcome.nonce, 5, "first nonce is committed + 1");
        assert_eq!(outcome.fees, 5);
        assert_eq!(outcome.server_id, "0xserver1");
        assert!(outcome.local_id.starts_with("0x"));
        assert_eq!(outcome.local_id.len(), 66);

        // The broadcast carried the magic-prefixed wire image.
        let params = node.last_params("catalyst_sendRawTransaction").unwrap();
        let wire_hex = params[0].as_str().unwrap();
        assert!(wire_hex.starts_with("0x43545831"), "wire starts with CTX1");

        // A second rapid send reuses the in-memory floor: no second
        // getNonce, strictly increasing nonce.
        let outcome2 = core.send(&recipient(), 100).await.unwrap();
        assert_eq!(outcome2.nonce, 6);
        assert_eq!(node.calls_of("catalyst_getNonce"), 1);

        // Both submissions are tracked, newest first.
        let tracked = stored_tracked(&storage, &config, &core.selected_address().unwrap()).await;
        assert_eq!(tracked.len(), 2);
        assert_eq!(tracked[0].local_id, outcome2.local_id);
        assert_eq!(tracked[0].status, "not_found");
        assert_eq!(tracked[0].server_id.as_deref(), Some("0xserver1"));
    }

    #[tokio::test]
    async fn chain_mismatch_blocks_the_broadcast() {
        let config = test_config();
        let node = funded_node(&config);
        node.set_default(
            "catalyst_getSyncInfo",
            json!({
                "chain_id": "0x01",
                "network_id": config.network_id,
                "genesis_hash": config.genesis_hash,
            }),
        );
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        let err = core.send(&recipient(), 200).await.unwrap_err();
        match err {
            WalletError::ChainMismatch {
                field, expected, actual,
            } => {
                assert_eq!(field, ChainIdentityField::ChainId);
                assert_eq!(expected, "200820092");
                assert_eq!(actual, "0x01");
            }
            other => panic!("expected ChainMismatch, got {other}"),
        }
        assert!(!core.chain_verified());
        assert_eq!(node.calls_of("catalyst_sendRawTransaction"), 0);
    }

    #[tokio::test]
    async fn insufficient_funds_blocks_the_broadcast() {
        let config = test_config();
        let node = funded_node(&config);
        node.set_default("catalyst_getBalance", json!("100"));
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        let err = core.send(&recipient(), 200).await.unwrap_err();
        match err {
            WalletError::InsufficientFunds { have, need } => {
                assert_eq!(have, 100);
                assert_eq!(need, 205, "amount + fees");
            }
            other => panic!("expected InsufficientFunds, got {other}"),
        }
        assert_eq!(node.calls_of("catalyst_sendRawTransaction"), 0);
        // The guard fires before a nonce is ever allocated.
        assert_eq!(node.calls_of("catalyst_getNonce"), 0);
    }

    #[tokio::test]
    async fn self_transfer_needs_only_the_fee() {
        let config = test_config();
        let node = funded_node(&config);
        node.set_default("catalyst_getBalance", json!("5"));
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        let own = core.selected_address().unwrap();
        let outcome = core.send(&own, 200).await.unwrap();
        assert_eq!(outcome.fees, 5);
    }

    #[tokio::test]
    async fn non_positive_amounts_never_reach_the_network() {
        let config = test_config();
        let node = funded_node(&config);
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        for amount in [0, -5] {
            assert!(matches!(
                core.send(&recipient(), amount).await,
                Err(WalletError::Protocol(_))
            ));
        }
        assert_eq!(node.calls_of("catalyst_getSyncInfo"), 0);
    }

    #[tokio::test]
    async fn send_while_locked_is_rejected() {
        let config = test_config();
        let node = funded_node(&config);
        let storage = MemoryKvStore::new();
        let mut core = WalletCore::new(config, &node, &storage).await.unwrap();

        assert!(matches!(
            core.send(&recipient(), 100).await,
            Err(WalletError::Locked)
        ));
    }
}

// ============================================================================
// Nonce handling
// ============================================================================

mod nonces {
    use super::*;

    #[tokio::test]
    async fn lost_race_surfaces_and_refloors() {
        let config = test_config();
        let node = funded_node(&config);
        // Allocation seeds from 4; the broadcast loses the race; the
        // re-read observes another process committed through 9.
        node.script("catalyst_getNonce", Scripted::Ok(json!(4)));
        node.script(
            "catalyst_sendRawTransaction",
            Scripted::RpcError(-32000, "nonce too low"),
        );
        node.script("catalyst_getNonce", Scripted::Ok(json!(9)));
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        let err = core.send(&recipient(), 200).await.unwrap_err();
        assert!(matches!(err, WalletError::NonceRace));

        // The floor re-synchronized: the next send starts at 10.
        let outcome = core.send(&recipient(), 200).await.unwrap();
        assert_eq!(outcome.nonce, 10);
    }

    #[tokio::test]
    async fn non_nonce_broadcast_errors_pass_through() {
        let config = test_config();
        let node = funded_node(&config);
        node.script(
            "catalyst_sendRawTransaction",
            Scripted::RpcError(-32000, "mempool full"),
        );
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        let err = core.send(&recipient(), 200).await.unwrap_err();
        assert!(matches!(err, WalletError::Rpc(_)));
    }

    #[tokio::test]
    async fn faucet_drip_retries_once_with_a_fresh_floor() {
        let config = test_config();
        let node = funded_node(&config);
        node.script("catalyst_getNonce", Scripted::Ok(json!(4)));
        node.script(
            "catalyst_sendRawTransaction",
            Scripted::RpcError(-32000, "nonce too low"),
        );
        // Re-read after the failed broadcast, then the drip's own refresh.
        node.script("catalyst_getNonce", Scripted::Ok(json!(9)));
        node.script("catalyst_getNonce", Scripted::Ok(json!(9)));
        node.script("catalyst_sendRawTransaction", Scripted::Ok(json!("0xdrip")));
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        let faucet_key = PrivateKey::from_hex(ACCOUNT0_PRIVKEY).unwrap();
        let outcome = core
            .faucet_drip(&faucet_key, &recipient(), 200)
            .await
            .unwrap();
        assert_eq!(outcome.nonce, 10, "retry re-allocated above the fresh floor");
        assert_eq!(outcome.server_id, "0xdrip");
        assert_eq!(node.calls_of("catalyst_sendRawTransaction"), 2);
    }

    #[tokio::test]
    async fn refresh_bumps_the_floor_from_committed_state() {
        let config = test_config();
        let node = funded_node(&config);
        node.set_default("catalyst_getNonce", json!(20));
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        let status = core.refresh().await.unwrap();
        assert_eq!(status.balance, 1000);
        assert_eq!(status.committed_nonce, 20);

        // The floor from refresh governs the next allocation.
        let outcome = core.send(&recipient(), 200).await.unwrap();
        assert_eq!(outcome.nonce, 21);
    }
}

// ============================================================================
// Receipts & history
// ============================================================================

mod receipts {
    use super::*;

    async fn core_with_one_submission<'a>(
        config: &NetworkConfig,
        node: &'a MockNode,
        storage: &'a MemoryKvStore,
    ) -> WalletCore<&'a MockNode, &'a MemoryKvStore> {
        let mut core = unlocked_core(config.clone(), node, storage).await;
        core.send(&recipient(), 200).await.unwrap();
        core
    }

    #[tokio::test]
    async fn polling_walks_a_receipt_to_applied() {
        let config = test_config();
        let node = funded_node(&config);
        let storage = MemoryKvStore::new();
        let mut core = core_with_one_submission(&config, &node, &storage).await;
        let address = core.selected_address().unwrap();

        // Not yet seen by the chain.
        node.script("catalyst_getTransactionReceipt", Scripted::Ok(json!(null)));
        assert!(core.poll_receipts_once().await.unwrap().is_empty());
        let tracked = stored_tracked(&storage, &config, &address).await;
        assert_eq!(tracked[0].status, "not_found");

        // Pending.
        node.script(
            "catalyst_getTransactionReceipt",
            Scripted::Ok(json!({"status": "pending"})),
        );
        assert!(core.poll_receipts_once().await.unwrap().is_empty());

        // Applied: reported once, balance and history refreshed.
        node.script(
            "catalyst_getTransactionReceipt",
            Scripted::Ok(json!({"status": "applied", "cycle": 3})),
        );
        let applied = core.poll_receipts_once().await.unwrap();
        assert_eq!(applied, ["0xserver1"]);
        assert!(node.calls_of("catalyst_getTransactionsByAddress") >= 1);

        let tracked = stored_tracked(&storage, &config, &address).await;
        assert_eq!(tracked[0].status, "applied");
        assert_eq!(tracked[0].last_receipt.as_ref().unwrap()["cycle"], 3);

        // Terminal entries are not polled again.
        let receipt_calls = node.calls_of("catalyst_getTransactionReceipt");
        assert!(core.poll_receipts_once().await.unwrap().is_empty());
        assert_eq!(node.calls_of("catalyst_getTransactionReceipt"), receipt_calls);
    }

    #[tokio::test]
    async fn transient_failures_are_swallowed() {
        let config = test_config();
        let node = funded_node(&config);
        let storage = MemoryKvStore::new();
        let mut core = core_with_one_submission(&config, &node, &storage).await;
        let address = core.selected_address().unwrap();

        node.script(
            "catalyst_getTransactionReceipt",
            Scripted::Transport(TransportError::Timeout),
        );
        // Timeouts on both endpoints surface as unreachable internally and
        // are still swallowed by the poll loop.
        node.script(
            "catalyst_getTransactionReceipt",
            Scripted::Transport(TransportError::Timeout),
        );
        assert!(core.poll_receipts_once().await.unwrap().is_empty());

        let tracked = stored_tracked(&storage, &config, &address).await;
        assert_eq!(tracked[0].status, "not_found", "status unchanged");
    }

    #[tokio::test]
    async fn chain_errors_mark_the_entry() {
        let config = test_config();
        let node = funded_node(&config);
        let storage = MemoryKvStore::new();
        let mut core = core_with_one_submission(&config, &node, &storage).await;
        let address = core.selected_address().unwrap();

        node.script(
            "catalyst_getTransactionReceipt",
            Scripted::RpcError(-32000, "pruned"),
        );
        assert!(core.poll_receipts_once().await.unwrap().is_empty());

        let tracked = stored_tracked(&storage, &config, &address).await;
        assert_eq!(tracked[0].status, "error");
        let recorded = tracked[0].last_receipt.as_ref().unwrap().as_str().unwrap();
        assert!(recorded.contains("pruned"));
    }

    #[tokio::test]
    async fn history_is_cached_through_storage() {
        let config = test_config();
        let node = funded_node(&config);
        node.set_default(
            "catalyst_getTransactionsByAddress",
            json!([{"id": "0xserver1", "status": "applied", "cycle": 3}]),
        );
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        let history = core.refresh_history(10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "0xserver1");
        assert_eq!(history[0].cycle, Some(3));

        // The cache answers without another network call.
        let calls = node.calls_of("catalyst_getTransactionsByAddress");
        let cached = core.cached_history().await.unwrap();
        assert_eq!(cached, history);
        assert_eq!(node.calls_of("catalyst_getTransactionsByAddress"), calls);
    }
}

// ============================================================================
// Endpoint preference
// ============================================================================

mod endpoints {
    use super::*;

    #[tokio::test]
    async fn identity_check_falls_back_to_individual_getters() {
        let config = test_config();
        let node = funded_node(&config);
        node.script(
            "catalyst_getSyncInfo",
            Scripted::RpcError(-32601, "method not found"),
        );
        node.set_default("catalyst_chainId", json!("0xbf8447c"));
        node.set_default("catalyst_networkId", json!("Catalyst-Testnet"));
        node.set_default(
            "catalyst_genesisHash",
            json!(config.genesis_hash.to_uppercase().replace("0X", "0x")),
        );
        let storage = MemoryKvStore::new();
        let mut core = unlocked_core(config, &node, &storage).await;

        // Hex chain id and case differences still verify.
        core.verify_chain().await.unwrap();
        assert!(core.chain_verified());
        assert_eq!(node.calls_of("catalyst_chainId"), 1);
    }

    #[tokio::test]
    async fn preferred_endpoint_survives_restarts() {
        let config = test_config();
        let node = funded_node(&config);
        let storage = MemoryKvStore::new();
        storage
            .kv_set(RPC_URL_KEY, b"http://node-b".to_vec())
            .await
            .unwrap();

        let mut core = unlocked_core(config, &node, &storage).await;
        core.verify_chain().await.unwrap();

        assert_eq!(node.first_url().unwrap(), "http://node-b");
        assert_eq!(
            storage.kv_get(RPC_URL_KEY).await.unwrap().unwrap(),
            b"http://node-b".to_vec()
        );
        assert!(core.chain_verified());
    }
}
