//! Keypair module
//!
//! An identity owns two key pairs: Ed25519 for signatures and X25519 for
//! key agreement. Both are held as portable strings so they can be exported,
//! sealed into a keystore or announced without further conversion.
//!
//! Security: private keys are zeroized on drop and never printed by `Debug`.

use super::encoding;
use super::CryptoError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Identity keypair: `{ signingPublic, signingPrivate, encryptionPublic, encryptionPrivate }`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Keypair {
    signing_public: String,
    signing_private: String,
    encryption_public: String,
    encryption_private: String,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut signing_seed = [0u8; 32];
        let mut encryption_seed = [0u8; 32];
        rng.fill(&mut signing_seed);
        rng.fill(&mut encryption_seed);

        let keypair = Self::from_secrets(&signing_seed, &encryption_seed);
        signing_seed.zeroize();
        encryption_seed.zeroize();
        keypair
    }

    /// Rebuild a keypair from its two 32-byte secrets
    pub fn from_secrets(signing_seed: &[u8; 32], encryption_secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(signing_seed);
        let secret = StaticSecret::from(*encryption_secret);
        let public = X25519PublicKey::from(&secret);

        Keypair {
            signing_public: encoding::encode(signing_key.verifying_key().as_bytes()),
            signing_private: encoding::encode(&signing_key.to_bytes()),
            encryption_public: encoding::encode(public.as_bytes()),
            encryption_private: encoding::encode(&secret.to_bytes()),
        }
    }

    /// Rebuild from portable strings, checking that each public key matches its secret
    pub fn from_portable_strings(
        signing_public: &str,
        signing_private: &str,
        encryption_public: &str,
        encryption_private: &str,
    ) -> Result<Self, CryptoError> {
        let mut signing_seed = encoding::decode_array::<32>(signing_private)?;
        let mut encryption_secret = encoding::decode_array::<32>(encryption_private)?;
        let keypair = Self::from_secrets(&signing_seed, &encryption_secret);
        signing_seed.zeroize();
        encryption_secret.zeroize();

        if keypair.signing_public != signing_public {
            return Err(CryptoError::InvalidKey(
                "signing public key does not match private key".to_string(),
            ));
        }
        if keypair.encryption_public != encryption_public {
            return Err(CryptoError::InvalidKey(
                "encryption public key does not match private key".to_string(),
            ));
        }
        Ok(keypair)
    }

    /// Ed25519 public key, portable form
    pub fn signing_public(&self) -> &str {
        &self.signing_public
    }

    /// X25519 public key, portable form
    pub fn encryption_public(&self) -> &str {
        &self.encryption_public
    }

    /// Ed25519 seed, portable form (use carefully!)
    pub fn signing_private(&self) -> &str {
        &self.signing_private
    }

    /// X25519 secret, portable form (use carefully!)
    pub fn encryption_private(&self) -> &str {
        &self.encryption_private
    }

    pub(crate) fn signing_key(&self) -> Result<SigningKey, CryptoError> {
        let seed = encoding::decode_array::<32>(&self.signing_private)?;
        Ok(SigningKey::from_bytes(&seed))
    }

    pub(crate) fn encryption_secret(&self) -> Result<StaticSecret, CryptoError> {
        let secret = encoding::decode_array::<32>(&self.encryption_private)?;
        Ok(StaticSecret::from(secret))
    }

    /// Sign a message, returning the portable 64-byte signature
    pub fn sign(&self, msg: &[u8]) -> Result<String, CryptoError> {
        let signature = self.signing_key()?.sign(msg);
        Ok(encoding::encode(&signature.to_bytes()))
    }

    /// Verify a portable signature under a portable Ed25519 public key
    pub fn verify(public_key: &str, msg: &[u8], signature: &str) -> bool {
        let Ok(key_bytes) = encoding::decode_array::<32>(public_key) else {
            return false;
        };
        let Ok(sig_bytes) = encoding::decode_array::<64>(signature) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };

        verifying_key
            .verify(msg, &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }

    /// Serialize to bytes (suitable for keystore)
    pub fn serialize(&self) -> Result<Vec<u8>, CryptoError> {
        bincode::serialize(self).map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    /// Deserialize from keystore bytes
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CryptoError> {
        let stored: Keypair =
            bincode::deserialize(bytes).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Self::from_portable_strings(
            &stored.signing_public,
            &stored.signing_private,
            &stored.encryption_public,
            &stored.encryption_private,
        )
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("signing_public", &self.signing_public)
            .field("signing_private", &"<redacted>")
            .field("encryption_public", &self.encryption_public)
            .field("encryption_private", &"<redacted>")
            .finish()
    }
}
