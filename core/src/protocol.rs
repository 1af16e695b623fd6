//! Canonical transaction encoding and identifiers.
//!
//! Two distinct byte images exist for every transaction:
//!
//! - the **signing payload**, which prefixes a domain tag and binds the
//!   chain id and genesis hash so a signature cannot be replayed on another
//!   network;
//! - the **wire image** (`"CTX1" || envelope`), which is what gets
//!   broadcast and whose Blake2b-512 prefix is the canonical transaction
//!   id. The wire image deliberately carries no chain-binding fields.
//!
//! Encoding is total and deterministic: the same transaction always yields
//! the same bytes.

use blake2::{Blake2b512, Digest};

use crate::codec::{put_bytes_vec, put_i64_le, put_u32_le, put_u64_le, put_u8, put_vec};
use crate::error::ProtocolError;
use crate::keys::Address;

/// ASCII magic prefixed to every broadcast transaction image.
pub const WIRE_MAGIC: &[u8; 4] = b"CTX1";

/// Domain tag prefixed to every signing payload.
pub const SIG_DOMAIN: &[u8] = b"CATALYST_SIG_V1";

/// Maximum length of the free-form `data` field.
pub const MAX_DATA_LEN: usize = 60;

/// Schnorr signature length on the wire.
pub const SIGNATURE_LEN: usize = 64;

/// Transaction type tags.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionType {
    /// Plain value transfer with cleartext amounts.
    NonConfidentialTransfer,
}

impl TransactionType {
    /// The wire tag byte.
    pub fn tag(self) -> u8 {
        match self {
            TransactionType::NonConfidentialTransfer => 0,
        }
    }
}

/// Value moved in or out of an account entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryAmount {
    /// Cleartext signed amount; negative debits the entry's account.
    NonConfidential(i64),
}

/// A single ledger entry: the account it touches and the amount.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionEntry {
    /// Compressed public key of the account (its address bytes).
    pub public_key: [u8; 32],
    /// Signed amount for this entry.
    pub amount: EntryAmount,
}

/// The signed portion of a transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionCore {
    /// Transaction type tag.
    pub tx_type: TransactionType,
    /// Ordered ledger entries; debits are negative.
    pub entries: Vec<TransactionEntry>,
    /// Per-sender sequence number.
    pub nonce: u64,
    /// Earliest unix time (seconds) the transaction may apply; 0 disables.
    pub lock_time: u32,
    /// Fee in base units.
    pub fees: u64,
    /// Free-form payload, at most [`MAX_DATA_LEN`] bytes.
    pub data: Vec<u8>,
}

/// Aggregated Schnorr signature bytes; must be 64 bytes on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AggregatedSignature(pub Vec<u8>);

/// A full transaction envelope: core, signature and submission timestamp.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    /// The signed core.
    pub core: TransactionCore,
    /// Schnorr signature over the signing payload.
    pub signature: AggregatedSignature,
    /// Submission timestamp, unix milliseconds.
    pub timestamp: u64,
}

fn encode_entry(entry: &TransactionEntry) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + 1 + 8);
    out.extend_from_slice(&entry.public_key);
    match entry.amount {
        EntryAmount::NonConfidential(amount) => {
            put_u8(&mut out, 0);
            put_i64_le(&mut out, amount);
        }
    }
    out
}

/// Canonical serialization of a transaction core.
pub fn encode_core_v1(core: &TransactionCore) -> Result<Vec<u8>, ProtocolError> {
    if core.data.len() > MAX_DATA_LEN {
        return Err(ProtocolError::TxDataTooLong(core.data.len()));
    }

    let mut out = Vec::with_capacity(1 + 4 + core.entries.len() * 41 + 24 + core.data.len());
    put_u8(&mut out, core.tx_type.tag());
    let entries: Vec<Vec<u8>> = core.entries.iter().map(encode_entry).collect();
    put_vec(&mut out, &entries).map_err(ProtocolError::Codec)?;
    put_u64_le(&mut out, core.nonce);
    put_u32_le(&mut out, core.lock_time);
    put_u64_le(&mut out, core.fees);
    put_bytes_vec(&mut out, &core.data).map_err(ProtocolError::Codec)?;
    Ok(out)
}

/// Canonical serialization of a full envelope: `core || vec(signature) ||
/// u64_le(timestamp)`.
pub fn encode_envelope_v1(tx: &Transaction) -> Result<Vec<u8>, ProtocolError> {
    if tx.signature.0.len() != SIGNATURE_LEN {
        return Err(ProtocolError::SignatureLengthInvalid(tx.signature.0.len()));
    }

    let mut out = encode_core_v1(&tx.core)?;
    put_bytes_vec(&mut out, &tx.signature.0).map_err(ProtocolError::Codec)?;
    put_u64_le(&mut out, tx.timestamp);
    Ok(out)
}

/// The broadcast image: `WIRE_MAGIC || envelope`.
pub fn encode_wire_tx_v1(tx: &Transaction) -> Result<Vec<u8>, ProtocolError> {
    let envelope = encode_envelope_v1(tx)?;
    let mut out = Vec::with_capacity(WIRE_MAGIC.len() + envelope.len());
    out.extend_from_slice(WIRE_MAGIC);
    out.extend_from_slice(&envelope);
    Ok(out)
}

/// Canonical transaction id: `Blake2b-512(wire)[0..32]`.
pub fn tx_id_v1(tx: &Transaction) -> Result<[u8; 32], ProtocolError> {
    let wire = encode_wire_tx_v1(tx)?;
    let digest = Blake2b512::digest(&wire);
    let mut id = [0u8; 32];
    id.copy_from_slice(&digest[..32]);
    Ok(id)
}

/// The exact byte string handed to the Schnorr signer.
///
/// `SIG_DOMAIN || u64_le(chain_id) || genesis_hash || core ||
/// u64_le(timestamp)`; the chain-binding fields live here and only here.
pub fn transaction_signing_payload_v1(
    core: &TransactionCore,
    timestamp: u64,
    chain_id: u64,
    genesis_hash: [u8; 32],
) -> Result<Vec<u8>, ProtocolError> {
    let core_bytes = encode_core_v1(core)?;
    let mut out = Vec::with_capacity(SIG_DOMAIN.len() + 8 + 32 + core_bytes.len() + 8);
    out.extend_from_slice(SIG_DOMAIN);
    put_u64_le(&mut out, chain_id);
    out.extend_from_slice(&genesis_hash);
    out.extend_from_slice(&core_bytes);
    put_u64_le(&mut out, timestamp);
    Ok(out)
}

/// Build a two-entry transfer core: `[{from, -amount}, {to, +amount}]`.
///
/// `amount` must be strictly positive. A self-transfer (`from == to`) is
/// legal and moves nothing but the fee.
pub fn build_transfer_v1(
    from: &Address,
    to: &Address,
    amount: i64,
    nonce: u64,
    lock_time: u32,
    fees: u64,
) -> Result<TransactionCore, ProtocolError> {
    if amount <= 0 {
        return Err(ProtocolError::AmountNonPositive);
    }

    Ok(TransactionCore {
        tx_type: TransactionType::NonConfidentialTransfer,
        entries: vec![
            TransactionEntry {
                public_key: *from.as_bytes(),
                amount: EntryAmount::NonConfidential(-amount),
            },
            TransactionEntry {
                public_key: *to.as_bytes(),
                amount: EntryAmount::NonConfidential(amount),
            },
        ],
        nonce,
        lock_time,
        fees,
        data: Vec::new(),
    })
}
