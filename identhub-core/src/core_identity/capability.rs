//! Key capability: the crypto and key-persistence collaborator
//!
//! Sessions never touch primitives directly; they delegate through
//! [`KeyCapability`] so tests and embedders can substitute their own.
//! [`DalekCapability`] is the shipped implementation.

use super::keystore::{Keystore, KeystoreError};
use super::{CryptoError, Envelope, Keypair, PortableKeypair};
use std::sync::Arc;
use tracing::warn;

/// Cryptographic operations and durable key storage used by a session
pub trait KeyCapability: Send + Sync {
    /// Generate a fresh keypair
    fn generate_keypair(&self) -> Result<Keypair, CryptoError>;

    /// Sign `message` with the keypair's signing key
    fn sign(&self, message: &[u8], keypair: &Keypair) -> Result<String, CryptoError>;

    /// Verify a portable signature under a portable signing public key
    fn verify(&self, message: &[u8], signature: &str, public_key: &str) -> bool;

    /// Encrypt `message` for the given encryption public keys
    fn encrypt(&self, message: &[u8], recipients: &[String]) -> Result<Envelope, CryptoError>;

    /// Decrypt an envelope addressed to `keypair`
    fn decrypt(&self, envelope: &Envelope, keypair: &Keypair) -> Result<Vec<u8>, CryptoError>;

    /// Convert a keypair to its interchange form
    fn export_portable(&self, keypair: &Keypair) -> Result<PortableKeypair, CryptoError>;

    /// Convert an interchange form back to a keypair
    fn import_portable(&self, data: &PortableKeypair) -> Result<Keypair, CryptoError>;

    /// Store a keypair under `alias`. Best effort: without a backing store
    /// this succeeds without doing anything.
    fn persist(&self, alias: &str, keypair: &Keypair, password: &str)
        -> Result<(), KeystoreError>;

    /// Retrieve a stored keypair. `None` when nothing is stored under `alias`
    /// or no backing store is configured.
    fn retrieve(&self, alias: &str, password: &str) -> Result<Option<Keypair>, KeystoreError>;
}

/// Ed25519/X25519 capability with an optional keystore
#[derive(Clone, Default)]
pub struct DalekCapability {
    keystore: Option<Arc<dyn Keystore>>,
}

impl DalekCapability {
    /// Capability with no durable storage; keys are session-only
    pub fn new() -> Self {
        Self::default()
    }

    /// Capability persisting keys to `keystore`
    pub fn with_keystore(keystore: Arc<dyn Keystore>) -> Self {
        Self { keystore: Some(keystore) }
    }

    pub fn has_keystore(&self) -> bool {
        self.keystore.is_some()
    }
}

impl KeyCapability for DalekCapability {
    fn generate_keypair(&self) -> Result<Keypair, CryptoError> {
        Ok(Keypair::generate())
    }

    fn sign(&self, message: &[u8], keypair: &Keypair) -> Result<String, CryptoError> {
        keypair.sign(message)
    }

    fn verify(&self, message: &[u8], signature: &str, public_key: &str) -> bool {
        Keypair::verify(public_key, message, signature)
    }

    fn encrypt(&self, message: &[u8], recipients: &[String]) -> Result<Envelope, CryptoError> {
        Envelope::seal(message, recipients)
    }

    fn decrypt(&self, envelope: &Envelope, keypair: &Keypair) -> Result<Vec<u8>, CryptoError> {
        envelope.open(keypair)
    }

    fn export_portable(&self, keypair: &Keypair) -> Result<PortableKeypair, CryptoError> {
        Ok(PortableKeypair::from_keypair(keypair))
    }

    fn import_portable(&self, data: &PortableKeypair) -> Result<Keypair, CryptoError> {
        data.to_keypair()
    }

    fn persist(
        &self,
        alias: &str,
        keypair: &Keypair,
        password: &str,
    ) -> Result<(), KeystoreError> {
        match &self.keystore {
            Some(keystore) => keystore.save_keypair(alias, keypair, password),
            None => {
                warn!(alias, "No keystore configured; keypair is session-only");
                Ok(())
            }
        }
    }

    fn retrieve(&self, alias: &str, password: &str) -> Result<Option<Keypair>, KeystoreError> {
        let Some(keystore) = &self.keystore else {
            return Ok(None);
        };

        match keystore.load_keypair(alias, password) {
            Ok(keypair) => Ok(Some(keypair)),
            Err(KeystoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
