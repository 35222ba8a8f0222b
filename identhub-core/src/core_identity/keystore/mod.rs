//! Keystore module
//!
//! Password-sealed storage for identity keypairs, addressed by alias.
//! Every backend stores the sealed form produced by [`sealed`], so a keypair
//! never rests in plaintext and a wrong password is indistinguishable from
//! a corrupted blob.

use crate::core_identity::keypair::Keypair;
use thiserror::Error;

pub mod file_keystore;
pub mod memory_keystore;
pub mod sealed;

pub use file_keystore::FileKeystore;
pub use memory_keystore::MemoryKeystore;

/// Keystore errors
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Abstract keystore trait
pub trait Keystore: Send + Sync {
    /// Seal and store a keypair under `alias`, replacing any previous one
    fn save_keypair(&self, alias: &str, keypair: &Keypair, password: &str)
        -> Result<(), KeystoreError>;

    /// Load and unseal the keypair stored under `alias`
    fn load_keypair(&self, alias: &str, password: &str) -> Result<Keypair, KeystoreError>;

    /// Whether anything is stored under `alias`
    fn contains(&self, alias: &str) -> Result<bool, KeystoreError>;

    /// Remove the keypair stored under `alias`
    fn delete(&self, alias: &str) -> Result<(), KeystoreError>;

    /// List stored aliases
    fn list_aliases(&self) -> Result<Vec<String>, KeystoreError>;
}

/// Aliases become file names, so keep them to a safe alphabet
pub fn validate_alias(alias: &str) -> Result<(), KeystoreError> {
    let valid = !alias.is_empty()
        && alias.len() <= 128
        && alias != "."
        && alias != ".."
        && alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));

    if valid {
        Ok(())
    } else {
        Err(KeystoreError::InvalidAlias(alias.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_alias() {
        assert!(validate_alias("alice").is_ok());
        assert!(validate_alias("alice@example.com").is_ok());
        assert!(validate_alias("hub-1_v2").is_ok());

        assert!(validate_alias("").is_err());
        assert!(validate_alias("..").is_err());
        assert!(validate_alias("../etc/passwd").is_err());
        assert!(validate_alias("a/b").is_err());
        assert!(validate_alias("with space").is_err());
    }
}
