//! Schnorr signatures over Ristretto255.
//!
//! The challenge hash binds the nonce commitment `R`, the signer's public
//! key and the message, so a signature cannot be transplanted onto a
//! substituted key. The per-signature scalar `k` comes from 32 fresh bytes
//! of the caller's RNG and must never repeat; uniform 32-byte sampling is
//! sufficient because the group order exceeds 2^252.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::keys::{Address, PrivateKey};
use crate::protocol::SIGNATURE_LEN;

type Blake2b256 = Blake2b<U32>;

/// `e = LE(Blake2b-256(R || P || message)) mod L`.
fn challenge(r_bytes: &[u8], public_bytes: &[u8], message: &[u8]) -> Scalar {
    let mut hasher = Blake2b256::new();
    hasher.update(r_bytes);
    hasher.update(public_bytes);
    hasher.update(message);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Scalar::from_bytes_mod_order(digest)
}

/// Sign `message` with the account key. Returns `R || s` (64 bytes).
pub fn sign(
    private_key: &PrivateKey,
    message: &[u8],
    rng: &mut impl CryptoRngCore,
) -> [u8; SIGNATURE_LEN] {
    let x = private_key.scalar();
    let public = RistrettoPoint::mul_base(&x).compress();

    let mut k_bytes = Zeroizing::new([0u8; 32]);
    rng.fill_bytes(&mut k_bytes[..]);
    let k = Scalar::from_bytes_mod_order(*k_bytes);
    let r = RistrettoPoint::mul_base(&k).compress();

    let e = challenge(r.as_bytes(), public.as_bytes(), message);
    let s = k + e * x;

    let mut signature = [0u8; SIGNATURE_LEN];
    signature[..32].copy_from_slice(r.as_bytes());
    signature[32..].copy_from_slice(&s.to_bytes());
    signature
}

/// Verify an `R || s` signature against the signer's address.
///
/// Checks `s·G == R + e·P` with canonical decoding of both points and a
/// canonical `s`; anything non-canonical fails closed.
pub fn verify(address: &Address, message: &[u8], signature: &[u8; SIGNATURE_LEN]) -> bool {
    let Some(public) = address.decompress() else {
        return false;
    };
    let Ok(r_compressed) = CompressedRistretto::from_slice(&signature[..32]) else {
        return false;
    };
    let Some(r_point) = r_compressed.decompress() else {
        return false;
    };
    let mut s_bytes = [0u8; 32];
    s_bytes.copy_from_slice(&signature[32..]);
    let Some(s) = Option::<Scalar>::from(Scalar::from_canonical_bytes(s_bytes)) else {
        return false;
    };

    let e = challenge(&signature[..32], address.as_bytes(), message);
    RistrettoPoint::mul_base(&s) == r_point + public * e
}
