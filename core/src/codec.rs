//! Strict hex and integer codecs.
//!
//! Canonical wire fields are fixed-width little-endian integers and
//! `u32`-length-prefixed vectors; 32-byte values travel as lowercase
//! `0x`-prefixed hex. Parsers reject non-canonical input instead of
//! normalizing it, so a value that round-trips here is already in its
//! canonical form.

use crate::error::CodecError;

/// Parse a `0x`-prefixed 64-character hex string into 32 bytes.
///
/// Uppercase digits are folded to lowercase before validation; a missing
/// prefix, a stray character or a wrong length is rejected.
pub fn parse_hex32(s: &str) -> Result<[u8; 32], CodecError> {
    let body = s.strip_prefix("0x").ok_or(CodecError::HexFormat)?;
    if body.len() != 64 {
        return Err(CodecError::Hex32Shape);
    }
    let lowered = body.to_ascii_lowercase();
    if !lowered
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return Err(CodecError::HexFormat);
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(&lowered, &mut out).map_err(|_| CodecError::HexFormat)?;
    Ok(out)
}

/// Canonical lowercase `0x` rendering of 32 bytes.
pub fn encode_hex32(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Append a single byte.
pub fn put_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

/// Append a `u32` little-endian.
pub fn put_u32_le(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Append a `u64` little-endian.
pub fn put_u64_le(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Append an `i64` little-endian (two's complement).
pub fn put_i64_le(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Append a `u32` count followed by the concatenated items.
pub fn put_vec(out: &mut Vec<u8>, items: &[Vec<u8>]) -> Result<(), CodecError> {
    let count = u32::try_from(items.len()).map_err(|_| CodecError::EncodeRange)?;
    put_u32_le(out, count);
    for item in items {
        out.extend_from_slice(item);
    }
    Ok(())
}

/// Append a `u32` byte length followed by the bytes themselves.
pub fn put_bytes_vec(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), CodecError> {
    let len = u32::try_from(bytes.len()).map_err(|_| CodecError::EncodeRange)?;
    put_u32_le(out, len);
    out.extend_from_slice(bytes);
    Ok(())
}

/// Narrow a unix timestamp in seconds to the wire `u32` lock-time field.
///
/// Times at or beyond 2^32 seconds (year 2106) do not fit the wire format
/// and are rejected rather than clamped.
pub fn lock_time_from_unix(secs: u64) -> Result<u32, CodecError> {
    u32::try_from(secs).map_err(|_| CodecError::EncodeRange)
}
