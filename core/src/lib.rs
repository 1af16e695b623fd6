//! Catalyst wallet core primitives.
//!
//! Protocol types, canonical codecs, deterministic key derivation and
//! Schnorr signing for the Catalyst account ledger. Everything in this
//! crate is offline and deterministic (the signer takes its randomness as
//! an explicit argument); networking, storage and session handling live in
//! the `catalyst-wallet` crate on top.
//!
//! ## Canonical forms
//!
//! - 32-byte values travel as lowercase `0x`-prefixed 64-character hex.
//! - Wire integers are fixed-width little-endian.
//! - The broadcast image and the signing payload are bit-exact formats;
//!   re-encoding the same transaction always yields the same bytes and the
//!   same transaction id.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod derivation;
pub mod error;
pub mod keys;
pub mod protocol;
pub mod signer;

pub use error::{CodecError, DerivationError, ProtocolError};
pub use keys::{address_of, privkey_to_scalar, Address, PrivateKey};
