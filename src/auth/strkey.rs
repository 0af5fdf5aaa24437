//! Stellar strkey address codec
//!
//! Account addresses are base32-encoded `version || key || crc16` with the
//! checksum stored little-endian.

use base32::Alphabet;
use thiserror::Error;

/// Version byte of an ed25519 account id (`G...` addresses).
pub const ACCOUNT_VERSION_BYTE: u8 = 6 << 3;

/// 1 version byte + 32 key bytes + 2 checksum bytes
const DECODED_LEN: usize = 35;

const ALPHABET: Alphabet = Alphabet::Rfc4648 { padding: false };

/// Raw ed25519 public key carried by an account address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPublicKey(pub [u8; 32]);

impl RawPublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Errors that can occur while decoding an address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address contains characters outside the base32 alphabet")]
    InvalidEncoding,

    #[error("Expected 35 decoded bytes, got {0}")]
    InvalidLength(usize),

    #[error("Invalid version byte: {0:#04x}")]
    InvalidVersion(u8),

    #[error("Invalid address checksum")]
    InvalidChecksum,
}

/// Canonical form used for hashing, storage and comparison.
///
/// Trailing base32 padding is dropped so padded and unpadded spellings of
/// one key collapse to the same 56-character address.
pub fn normalize(address: &str) -> String {
    address.trim().trim_end_matches('=').to_uppercase()
}

/// Decode an account address into its raw public key
///
/// Input is case-insensitive; surrounding whitespace and trailing padding
/// are ignored.
pub fn decode(address: &str) -> Result<RawPublicKey, AddressError> {
    let normalized = normalize(address);

    let decoded = base32::decode(ALPHABET, &normalized).ok_or(AddressError::InvalidEncoding)?;

    if decoded.len() != DECODED_LEN {
        return Err(AddressError::InvalidLength(decoded.len()));
    }

    if decoded[0] != ACCOUNT_VERSION_BYTE {
        return Err(AddressError::InvalidVersion(decoded[0]));
    }

    let expected = crc16_xmodem(&decoded[..33]);
    let actual = u16::from_le_bytes([decoded[33], decoded[34]]);
    if expected != actual {
        return Err(AddressError::InvalidChecksum);
    }

    let mut key = [0u8; 32];
    key.copy_from_slice(&decoded[1..33]);
    Ok(RawPublicKey(key))
}

/// `true` iff `decode` would succeed
pub fn is_valid(address: &str) -> bool {
    decode(address).is_ok()
}

/// Encode a raw public key as a `G...` account address.
pub fn encode(key: &RawPublicKey) -> String {
    let mut payload = Vec::with_capacity(DECODED_LEN);
    payload.push(ACCOUNT_VERSION_BYTE);
    payload.extend_from_slice(key.as_bytes());
    let checksum = crc16_xmodem(&payload);
    payload.extend_from_slice(&checksum.to_le_bytes());

    base32::encode(ALPHABET, &payload)
}

/// CRC-16/XMODEM (poly 0x1021, init 0)
pub fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;

    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}
