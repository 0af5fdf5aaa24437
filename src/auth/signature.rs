//! Stellar signature verification
//!
//! Verifies ed25519 signatures produced by Stellar wallets.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ed25519_dalek::{Signature, Verifier, VerifyingKey, SIGNATURE_LENGTH};

use super::strkey::RawPublicKey;

/// Verify an ed25519 signature over `message`
///
/// The signature may be hex (optionally `0x`-prefixed) or base64/base64url.
/// Returns `false` for anything that does not decode to 64 bytes, for keys
/// that are not valid curve points, and for signatures that do not verify.
pub fn verify(public_key: &RawPublicKey, message: &[u8], signature: &str) -> bool {
    let Some(signature_bytes) = decode_signature(signature) else {
        return false;
    };

    let Ok(signature_bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(signature_bytes.as_slice())
    else {
        return false;
    };
    let signature = Signature::from_bytes(&signature_bytes);

    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key.as_bytes()) else {
        return false;
    };

    verifying_key.verify(message, &signature).is_ok()
}

/// Decode a signature string into raw bytes
///
/// Even-length hex wins over base64 since every hex string is also valid
/// base64.
fn decode_signature(signature: &str) -> Option<Vec<u8>> {
    let trimmed = signature.trim();

    if let Some(hex_body) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return hex::decode(hex_body).ok();
    }

    if trimmed.len() % 2 == 0 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return hex::decode(trimmed).ok();
    }

    let url_safe: String = trimmed
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    URL_SAFE_NO_PAD.decode(url_safe).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair() -> (SigningKey, RawPublicKey) {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let public = RawPublicKey(signing_key.verifying_key().to_bytes());
        (signing_key, public)
    }

    #[test]
    fn test_verify_hex_signature() {
        let (signing_key, public) = keypair();
        let signature = signing_key.sign(b"hello").to_bytes();

        assert!(verify(&public, b"hello", &hex::encode(signature)));
        assert!(verify(
            &public,
            b"hello",
            &format!("0x{}", hex::encode(signature))
        ));
        assert!(verify(
            &public,
            b"hello",
            &hex::encode_upper(signature)
        ));
    }

    #[test]
    fn test_verify_base64_signature() {
        let (signing_key, public) = keypair();
        let signature = signing_key.sign(b"hello").to_bytes();

        assert!(verify(&public, b"hello", &STANDARD.encode(signature)));
        assert!(verify(&public, b"hello", &URL_SAFE_NO_PAD.encode(signature)));
    }

    #[test]
    fn test_wrong_message_fails() {
        let (signing_key, public) = keypair();
        let signature = signing_key.sign(b"hello").to_bytes();

        assert!(!verify(&public, b"hello!", &hex::encode(signature)));
    }

    #[test]
    fn test_wrong_key_fails() {
        let (signing_key, _) = keypair();
        let (_, other) = {
            let key = SigningKey::from_bytes(&[9u8; 32]);
            let public = RawPublicKey(key.verifying_key().to_bytes());
            (key, public)
        };
        let signature = signing_key.sign(b"hello").to_bytes();

        assert!(!verify(&other, b"hello", &hex::encode(signature)));
    }

    #[test]
    fn test_wrong_length_returns_false() {
        let (signing_key, public) = keypair();
        let signature = signing_key.sign(b"hello").to_bytes();

        assert!(!verify(&public, b"hello", &hex::encode(&signature[..63])));
        assert!(!verify(&public, b"hello", &hex::encode([0u8; 65])));
        assert!(!verify(&public, b"hello", ""));
        assert!(!verify(&public, b"hello", "not a signature!"));
    }

    #[test]
    fn test_tampered_signature_fails() {
        let (signing_key, public) = keypair();
        let mut signature = signing_key.sign(b"hello").to_bytes();
        signature[5] ^= 0x01;

        assert!(!verify(&public, b"hello", &hex::encode(signature)));
    }
}
