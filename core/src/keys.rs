//! Ristretto key material and addresses.
//!
//! An account is a single Ristretto255 scalar. The 32 private key bytes are
//! interpreted little-endian and reduced modulo the group order; the address
//! is the compressed basepoint multiple, so address equality is byte
//! equality on the canonical hex form.

use std::fmt;

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec::{encode_hex32, parse_hex32};
use crate::error::CodecError;

/// A 32-byte account private key.
///
/// Holds the raw bytes; the signing scalar is derived on demand. The bytes
/// are wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    /// Wrap raw private key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse from the canonical `0x` hex form.
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        parse_hex32(s).map(Self)
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical lowercase `0x` hex rendering.
    pub fn to_hex(&self) -> String {
        encode_hex32(&self.0)
    }

    /// The signing scalar `x = LE(bytes) mod L`.
    pub fn scalar(&self) -> Scalar {
        privkey_to_scalar(&self.0)
    }

    /// The address controlled by this key.
    pub fn address(&self) -> Address {
        address_of(&self.0)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.write_str("PrivateKey(..)")
    }
}

/// Reduce private key bytes to the signing scalar.
pub fn privkey_to_scalar(bytes: &[u8; 32]) -> Scalar {
    Scalar::from_bytes_mod_order(*bytes)
}

/// Derive the address for an account private key: `compress(x·G)`.
pub fn address_of(privkey: &[u8; 32]) -> Address {
    let point = RistrettoPoint::mul_base(&privkey_to_scalar(privkey));
    Address(point.compress().to_bytes())
}

/// A Catalyst account address (compressed Ristretto point).
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Parse from the canonical `0x` hex form.
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        parse_hex32(s).map(Self)
    }

    /// The raw 32 compressed-point bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical lowercase `0x` hex rendering.
    pub fn to_hex(&self) -> String {
        encode_hex32(&self.0)
    }

    /// Decompress back to a Ristretto point, if the bytes are a valid
    /// canonical encoding.
    pub fn decompress(&self) -> Option<RistrettoPoint> {
        CompressedRistretto::from_slice(&self.0).ok()?.decompress()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(de::Error::custom)
    }
}
