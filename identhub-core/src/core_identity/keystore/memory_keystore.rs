//! In-memory keystore for tests and ephemeral servers

use super::{sealed, validate_alias, Keystore, KeystoreError};
use crate::core_identity::keypair::Keypair;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Helper to convert poison errors into KeystoreError
fn handle_poison<T>(_err: PoisonError<T>) -> KeystoreError {
    KeystoreError::Other("Lock poisoned: a thread panicked while holding the lock".to_string())
}

/// In-memory keystore holding sealed blobs (non-persistent)
#[derive(Clone, Default)]
pub struct MemoryKeystore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Keystore for MemoryKeystore {
    fn save_keypair(
        &self,
        alias: &str,
        keypair: &Keypair,
        password: &str,
    ) -> Result<(), KeystoreError> {
        validate_alias(alias)?;
        let serialized = keypair
            .serialize()
            .map_err(|e| KeystoreError::Serialization(e.to_string()))?;
        let blob = sealed::seal(&serialized, password)?;

        self.entries
            .write()
            .map_err(handle_poison)?
            .insert(alias.to_string(), blob);
        Ok(())
    }

    fn load_keypair(&self, alias: &str, password: &str) -> Result<Keypair, KeystoreError> {
        let blob = self
            .entries
            .read()
            .map_err(handle_poison)?
            .get(alias)
            .cloned()
            .ok_or_else(|| KeystoreError::NotFound(alias.to_string()))?;

        let plaintext = sealed::open(&blob, password)?;
        Keypair::deserialize(&plaintext).map_err(|e| KeystoreError::Serialization(e.to_string()))
    }

    fn contains(&self, alias: &str) -> Result<bool, KeystoreError> {
        Ok(self.entries.read().map_err(handle_poison)?.contains_key(alias))
    }

    fn delete(&self, alias: &str) -> Result<(), KeystoreError> {
        self.entries
            .write()
            .map_err(handle_poison)?
            .remove(alias)
            .map(|_| ())
            .ok_or_else(|| KeystoreError::NotFound(alias.to_string()))
    }

    fn list_aliases(&self) -> Result<Vec<String>, KeystoreError> {
        let mut aliases: Vec<String> =
            self.entries.read().map_err(handle_poison)?.keys().cloned().collect();
        aliases.sort();
        Ok(aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_keystore_roundtrip() {
        let keystore = MemoryKeystore::new();
        let kp = Keypair::generate();

        keystore.save_keypair("alice", &kp, "pw").unwrap();
        let loaded = keystore.load_keypair("alice", "pw").unwrap();
        assert_eq!(kp.signing_public(), loaded.signing_public());
    }

    #[test]
    fn test_memory_keystore_wrong_password() {
        let keystore = MemoryKeystore::new();
        keystore.save_keypair("alice", &Keypair::generate(), "pw").unwrap();

        let result = keystore.load_keypair("alice", "nope");
        assert!(matches!(result, Err(KeystoreError::InvalidPassword)));
    }

    #[test]
    fn test_memory_keystore_aliases() {
        let keystore = MemoryKeystore::new();
        keystore.save_keypair("bob", &Keypair::generate(), "pw").unwrap();
        keystore.save_keypair("alice", &Keypair::generate(), "pw").unwrap();

        assert_eq!(keystore.list_aliases().unwrap(), vec!["alice", "bob"]);
        assert!(keystore.contains("bob").unwrap());

        keystore.delete("bob").unwrap();
        assert!(!keystore.contains("bob").unwrap());
        assert!(matches!(keystore.delete("bob"), Err(KeystoreError::NotFound(_))));
    }

    #[test]
    fn test_clones_share_state() {
        let keystore = MemoryKeystore::new();
        let clone = keystore.clone();
        keystore.save_keypair("alice", &Keypair::generate(), "pw").unwrap();
        assert!(clone.contains("alice").unwrap());
    }
}
