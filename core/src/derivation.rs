//! Deterministic account derivation.
//!
//! `mnemonic (+ passphrase) → BIP-39 seed → master material → per-account
//! private scalars`. Both hash steps run Blake2b-512 under fixed domain
//! tags, so account material can never collide with any other hash use in
//! the protocol. Derivation is pure: the same phrase, passphrase and index
//! always produce the same key, which is why accounts are re-derived on
//! demand instead of cached.

use bip39::{Language, Mnemonic, MnemonicType, Seed};
use blake2::{Blake2b512, Digest};
use zeroize::Zeroizing;

use crate::error::DerivationError;
use crate::keys::{Address, PrivateKey};

/// Domain tag for the wallet master material.
pub const DST_MASTER: &[u8] = b"CATALYST_WALLET_V1_MASTER";

/// Domain tag for per-account key material.
pub const DST_ACCOUNT: &[u8] = b"CATALYST_WALLET_V1_ACCOUNT";

/// Byte length of a BIP-39 seed.
pub const SEED_LEN: usize = 64;

/// Generate a fresh English mnemonic from OS entropy.
///
/// `words` must be a BIP-39 word count (12, 15, 18, 21 or 24).
pub fn generate_mnemonic(words: usize) -> Result<String, DerivationError> {
    let mnemonic_type = MnemonicType::for_word_count(words)
        .map_err(|e| DerivationError::BadMnemonic(e.to_string()))?;
    Ok(Mnemonic::new(mnemonic_type, Language::English)
        .phrase()
        .to_string())
}

/// Validate a phrase against the English wordlist and checksum.
pub fn validate_mnemonic(phrase: &str) -> Result<(), DerivationError> {
    Mnemonic::from_phrase(phrase, Language::English)
        .map(|_| ())
        .map_err(|e| DerivationError::BadMnemonic(e.to_string()))
}

/// Stretch a validated phrase into the 64-byte BIP-39 seed.
pub fn seed_from_mnemonic(
    phrase: &str,
    passphrase: &str,
) -> Result<Zeroizing<[u8; SEED_LEN]>, DerivationError> {
    let mnemonic = Mnemonic::from_phrase(phrase, Language::English)
        .map_err(|e| DerivationError::BadMnemonic(e.to_string()))?;
    let seed = Seed::new(&mnemonic, passphrase);
    let mut out = Zeroizing::new([0u8; SEED_LEN]);
    out.copy_from_slice(seed.as_bytes());
    Ok(out)
}

/// `master = Blake2b-512(DST_MASTER || seed)`.
pub fn derive_master_material_v1(seed: &[u8; SEED_LEN]) -> Zeroizing<[u8; 64]> {
    let mut hasher = Blake2b512::new();
    hasher.update(DST_MASTER);
    hasher.update(seed);
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Private key for account `index`.
///
/// `ikm = Blake2b-512(DST_ACCOUNT || master || u32_le(index))`; the key is
/// the first 32 bytes of the ikm.
pub fn derive_account_privkey_v1(seed: &[u8; SEED_LEN], index: u32) -> PrivateKey {
    let master = derive_master_material_v1(seed);
    let mut hasher = Blake2b512::new();
    hasher.update(DST_ACCOUNT);
    hasher.update(&master[..]);
    hasher.update(index.to_le_bytes());
    let ikm = Zeroizing::new(hasher.finalize());
    let mut key = [0u8; 32];
    key.copy_from_slice(&ikm[..32]);
    PrivateKey::from_bytes(key)
}

/// Address for account `index`.
pub fn derive_account_address_v1(seed: &[u8; SEED_LEN], index: u32) -> Address {
    derive_account_privkey_v1(seed, index).address()
}
