//! Password sealing for keystore blobs
//!
//! Sealed format:
//! ```text
//! [Magic: 8 bytes "IHKS0001"]
//! [Version: 1 byte]
//! [Salt: 16 bytes]
//! [Nonce: 12 bytes]
//! [Ciphertext + AEAD tag: variable]
//! ```

use super::KeystoreError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Argon2, Params};
use rand::Rng;
use zeroize::Zeroizing;

/// Magic header for sealed keystore blobs
const MAGIC_HEADER: &[u8; 8] = b"IHKS0001";

/// Current sealed format version
const FORMAT_VERSION: u8 = 1;

/// Salt length for Argon2 KDF (16 bytes = 128 bits)
const SALT_LEN: usize = 16;

/// Nonce length for AES-GCM (12 bytes = 96 bits)
const NONCE_LEN: usize = 12;

/// AES-GCM tag length
const TAG_LEN: usize = 16;

/// Header size: magic(8) + version(1) + salt(16) + nonce(12) = 37 bytes
pub const HEADER_SIZE: usize = 8 + 1 + SALT_LEN + NONCE_LEN;

/// Encrypt `data` under a key derived from `password`
pub fn seal(data: &[u8], password: &str) -> Result<Vec<u8>, KeystoreError> {
    let mut rng = rand::rng();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes);

    let key = derive_key_from_password(password, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| KeystoreError::Encryption(format!("Invalid key: {}", e)))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), data)
        .map_err(|e| KeystoreError::Encryption(format!("Encryption failed: {}", e)))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    result.extend_from_slice(MAGIC_HEADER);
    result.push(FORMAT_VERSION);
    result.extend_from_slice(&salt);
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt a sealed blob. AEAD failure reports `InvalidPassword`.
pub fn open(data: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>, KeystoreError> {
    if data.len() < HEADER_SIZE + TAG_LEN {
        return Err(KeystoreError::Decryption("Truncated keystore blob".to_string()));
    }
    if &data[0..8] != MAGIC_HEADER {
        return Err(KeystoreError::Decryption("Invalid magic header".to_string()));
    }
    if data[8] != FORMAT_VERSION {
        return Err(KeystoreError::Decryption(format!(
            "Unsupported version: {}",
            data[8]
        )));
    }

    let salt = &data[9..9 + SALT_LEN];
    let nonce = Nonce::from_slice(&data[9 + SALT_LEN..HEADER_SIZE]);
    let ciphertext = &data[HEADER_SIZE..];

    let key = derive_key_from_password(password, salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| KeystoreError::Decryption(format!("Invalid key: {}", e)))?;

    // Tag mismatch means wrong password or corruption
    cipher
        .decrypt(nonce, ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| KeystoreError::InvalidPassword)
}

/// Derive a 256-bit key from a password using Argon2id
fn derive_key_from_password(
    password: &str,
    salt: &[u8],
) -> Result<Zeroizing<[u8; 32]>, KeystoreError> {
    let params = Params::new(
        19 * 1024, // 19 MiB memory cost
        2,         // 2 iterations
        1,         // 1 lane
        Some(32),
    )
    .map_err(|e| KeystoreError::Encryption(format!("Invalid Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key[..])
        .map_err(|e| KeystoreError::Encryption(format!("Key derivation failed: {}", e)))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let sealed = seal(b"key material", "hunter2").unwrap();
        assert_eq!(&sealed[0..8], MAGIC_HEADER);
        assert_eq!(open(&sealed, "hunter2").unwrap().as_slice(), b"key material");
    }

    #[test]
    fn test_wrong_password() {
        let sealed = seal(b"key material", "hunter2").unwrap();
        assert!(matches!(open(&sealed, "hunter3"), Err(KeystoreError::InvalidPassword)));
    }

    #[test]
    fn test_salt_makes_blobs_unique() {
        let a = seal(b"same", "pw").unwrap();
        let b = seal(b"same", "pw").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_corrupted_tag() {
        let mut sealed = seal(b"key material", "pw").unwrap();
        let len = sealed.len();
        sealed[len - 1] ^= 0xFF;
        assert!(matches!(open(&sealed, "pw"), Err(KeystoreError::InvalidPassword)));
    }

    #[test]
    fn test_bad_header() {
        let mut sealed = seal(b"key material", "pw").unwrap();
        sealed[0] = b'X';
        assert!(matches!(open(&sealed, "pw"), Err(KeystoreError::Decryption(_))));

        let mut sealed = seal(b"key material", "pw").unwrap();
        sealed[8] = 99;
        assert!(matches!(open(&sealed, "pw"), Err(KeystoreError::Decryption(_))));

        assert!(matches!(open(&[0u8; 10], "pw"), Err(KeystoreError::Decryption(_))));
    }
}
