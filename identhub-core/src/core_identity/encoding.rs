//! Portable string encoding for key material and signatures
//!
//! Everything that leaves the process as a string (public keys, private keys,
//! signatures, envelope fields) is base64url without padding.

use super::CryptoError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Encode bytes as a portable string
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a portable string
pub fn decode(value: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Decode a portable string that must hold exactly N bytes
pub fn decode_array<const N: usize>(value: &str) -> Result<[u8; N], CryptoError> {
    let bytes = decode(value)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CryptoError::Encoding(format!("expected {} bytes, got {}", N, len)))
}
