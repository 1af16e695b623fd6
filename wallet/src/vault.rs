//! Password-sealed secret storage.
//!
//! The vault is a single authenticated-encrypted blob: scrypt stretches
//! the password into the AEAD key, XChaCha20-Poly1305 seals the plaintext.
//! KDF parameters travel inside the record so they can be raised later
//! without breaking vaults sealed under the old cost. Every decryption
//! failure, including malformed salt or nonce material, surfaces as
//! [`VaultError::AuthFailed`] so a wrong password is indistinguishable
//! from a corrupted record.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use displaydoc::Display;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// Current vault record version.
pub const VAULT_VERSION: u32 = 1;

const KDF_NAME: &str = "scrypt";
const CIPHER_NAME: &str = "xchacha20-poly1305";

const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

/// Vault failures.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum VaultError {
    /// Unsupported vault version: {0}
    VersionUnsupported(u32),

    /// Unsupported vault algorithm: {0}
    AlgUnsupported(String),

    /// Vault authentication failed
    AuthFailed,

    /// Vault sealing failed
    SealFailed,
}

/// KDF name and parameters stored alongside the ciphertext.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct KdfParams {
    /// KDF algorithm name.
    pub name: String,
    /// scrypt cost parameter (the full N, not its log).
    #[serde(rename = "N")]
    pub n: u64,
    /// scrypt block size.
    pub r: u32,
    /// scrypt parallelism.
    pub p: u32,
    /// Salt, lowercase `0x` hex.
    #[serde(rename = "saltHex")]
    pub salt_hex: String,
}

/// Cipher name and nonce stored alongside the ciphertext.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CipherParams {
    /// AEAD algorithm name.
    pub name: String,
    /// Nonce, lowercase `0x` hex.
    #[serde(rename = "nonceHex")]
    pub nonce_hex: String,
}

/// A sealed vault record, serializable to the storage interface as JSON.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct VaultRecord {
    /// Record format version.
    pub version: u32,
    /// Key derivation parameters.
    pub kdf: KdfParams,
    /// Cipher parameters.
    pub cipher: CipherParams,
    /// Ciphertext with AEAD tag, lowercase `0x` hex.
    #[serde(rename = "ciphertextHex")]
    pub ciphertext_hex: String,
}

impl VaultRecord {
    /// Seal `plaintext` under `password` with a fresh salt and nonce.
    pub fn create(password: &str, plaintext: &[u8]) -> Result<Self, VaultError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let key = derive_key(password, &salt, SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| VaultError::SealFailed)?;

        Ok(Self {
            version: VAULT_VERSION,
            kdf: KdfParams {
                name: KDF_NAME.to_string(),
                n: 1u64 << SCRYPT_LOG_N,
                r: SCRYPT_R,
                p: SCRYPT_P,
                salt_hex: format!("0x{}", hex::encode(salt)),
            },
            cipher: CipherParams {
                name: CIPHER_NAME.to_string(),
                nonce_hex: format!("0x{}", hex::encode(nonce)),
            },
            ciphertext_hex: format!("0x{}", hex::encode(&ciphertext)),
        })
    }

    /// Open the vault with `password`, yielding the plaintext.
    ///
    /// The record's own KDF parameters drive key derivation, so records
    /// sealed under older costs keep opening after the defaults move.
    pub fn open(&self, password: &str) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        if self.version != VAULT_VERSION {
            return Err(VaultError::VersionUnsupported(self.version));
        }
        if self.kdf.name != KDF_NAME {
            return Err(VaultError::AlgUnsupported(self.kdf.name.clone()));
        }
        if self.cipher.name != CIPHER_NAME {
            return Err(VaultError::AlgUnsupported(self.cipher.name.clone()));
        }

        let salt = decode_hex_field(&self.kdf.salt_hex)?;
        let nonce = decode_hex_field(&self.cipher.nonce_hex)?;
        if nonce.len() != NONCE_LEN {
            return Err(VaultError::AuthFailed);
        }
        let ciphertext = decode_hex_field(&self.ciphertext_hex)?;

        let log_n = log2_exact(self.kdf.n).ok_or(VaultError::AuthFailed)?;
        let key = derive_key(password, &salt, log_n, self.kdf.r, self.kdf.p)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
        let plaintext = cipher
            .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| VaultError::AuthFailed)?;

        Ok(Zeroizing::new(plaintext))
    }

    /// Serialize for the storage interface.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("vault record serializes")
    }

    /// Parse a stored record.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        serde_json::from_slice(bytes).map_err(|_| VaultError::AuthFailed)
    }
}

fn decode_hex_field(s: &str) -> Result<Vec<u8>, VaultError> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body).map_err(|_| VaultError::AuthFailed)
}

fn log2_exact(n: u64) -> Option<u8> {
    if n.is_power_of_two() {
        Some(n.trailing_zeros() as u8)
    } else {
        None
    }
}

fn derive_key(
    password: &str,
    salt: &[u8],
    log_n: u8,
    r: u32,
    p: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>, VaultError> {
    let params =
        scrypt::Params::new(log_n, r, p, KEY_LEN).map_err(|_| VaultError::AuthFailed)?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut key[..])
        .map_err(|_| VaultError::AuthFailed)?;
    Ok(key)
}
