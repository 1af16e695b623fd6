//! Error types for the core protocol crate.

use displaydoc::Display;
use thiserror::Error;

/// Errors from the strict hex and integer codecs.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum CodecError {
    /// Hex string is missing the 0x prefix or contains non-hex characters
    HexFormat,

    /// Expected a 0x-prefixed 64-character hex string
    Hex32Shape,

    /// Integer value out of range for its wire encoding
    EncodeRange,
}

/// Errors from mnemonic handling and account derivation.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum DerivationError {
    /// Invalid mnemonic phrase: {0}
    BadMnemonic(String),
}

/// Errors from transaction construction and canonical encoding.
#[derive(Clone, Debug, Display, Error, Eq, PartialEq)]
pub enum ProtocolError {
    /// Codec failure: {0}
    Codec(#[from] CodecError),

    /// Transaction data field is {0} bytes, the maximum is 60
    TxDataTooLong(usize),

    /// Transfer amount must be strictly positive
    AmountNonPositive,

    /// Signature is {0} bytes, expected 64
    SignatureLengthInvalid(usize),
}
