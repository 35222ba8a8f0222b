//! Multi-recipient encryption envelopes
//!
//! The message is sealed once under a random content key with
//! ChaCha20-Poly1305. The content key is then wrapped for every recipient:
//! an ephemeral X25519 exchange with the recipient's encryption key, HKDF-SHA256
//! over the shared secret, and ChaCha20-Poly1305 over the content key.
//!
//! Wire form (all binary fields portable-encoded):
//! ```text
//! { version, nonce, ciphertext, recipients: [{ recipient, ephemeralPublic, nonce, wrappedKey }] }
//! ```

use super::encoding;
use super::{CryptoError, Keypair};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use hkdf::Hkdf;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Current envelope format version
pub const ENVELOPE_VERSION: u8 = 1;

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;

/// HKDF info label for key wrapping
const WRAP_KEY_LABEL: &[u8] = b"identhub envelope v1 wrap key";

/// Content encrypted for one or more recipients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub version: u8,
    pub nonce: String,
    pub ciphertext: String,
    pub recipients: Vec<RecipientKey>,
}

/// Content key wrapped for a single recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientKey {
    /// Recipient's X25519 public key
    pub recipient: String,
    pub ephemeral_public: String,
    pub nonce: String,
    pub wrapped_key: String,
}

impl Envelope {
    /// Encrypt `message` for each X25519 public key in `recipients`
    pub fn seal(message: &[u8], recipients: &[String]) -> Result<Self, CryptoError> {
        if recipients.is_empty() {
            return Err(CryptoError::Encryption("no recipients".to_string()));
        }

        let mut rng = rand::rng();
        let mut content_key = Zeroizing::new([0u8; KEY_SIZE]);
        rng.fill(&mut content_key[..]);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rng.fill(&mut nonce_bytes);

        let cipher = ChaCha20Poly1305::new_from_slice(&content_key[..])
            .map_err(|e| CryptoError::Encryption(format!("Invalid key: {}", e)))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), message)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let recipients = recipients
            .iter()
            .map(|recipient| wrap_key(&content_key, recipient))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Envelope {
            version: ENVELOPE_VERSION,
            nonce: encoding::encode(&nonce_bytes),
            ciphertext: encoding::encode(&ciphertext),
            recipients,
        })
    }

    /// Decrypt with the recipient's keypair
    pub fn open(&self, keypair: &Keypair) -> Result<Vec<u8>, CryptoError> {
        if self.version != ENVELOPE_VERSION {
            return Err(CryptoError::Decryption(format!(
                "Unsupported envelope version: {}",
                self.version
            )));
        }

        let entry = self
            .recipients
            .iter()
            .find(|r| r.recipient == keypair.encryption_public())
            .ok_or_else(|| CryptoError::NotARecipient(keypair.encryption_public().to_string()))?;

        let content_key = unwrap_key(entry, &keypair.encryption_secret()?)?;

        let nonce = encoding::decode_array::<NONCE_SIZE>(&self.nonce)?;
        let ciphertext = encoding::decode(&self.ciphertext)?;
        let cipher = ChaCha20Poly1305::new_from_slice(&content_key[..])
            .map_err(|e| CryptoError::Decryption(format!("Invalid key: {}", e)))?;

        cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| CryptoError::Decryption("content authentication failed".to_string()))
    }
}

fn wrap_key(content_key: &[u8; KEY_SIZE], recipient: &str) -> Result<RecipientKey, CryptoError> {
    let recipient_pk = X25519PublicKey::from(encoding::decode_array::<32>(recipient)?);

    let mut rng = rand::rng();
    let mut ephemeral_bytes = Zeroizing::new([0u8; 32]);
    rng.fill(&mut ephemeral_bytes[..]);
    let ephemeral_sk = StaticSecret::from(*ephemeral_bytes);
    let ephemeral_pk = X25519PublicKey::from(&ephemeral_sk);

    let wrap_key = derive_wrap_key(&ephemeral_sk, &recipient_pk, &ephemeral_pk)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rng.fill(&mut nonce_bytes);
    let cipher = ChaCha20Poly1305::new_from_slice(&wrap_key[..])
        .map_err(|e| CryptoError::Encryption(format!("Invalid key: {}", e)))?;
    let wrapped = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload { msg: content_key, aad: recipient_pk.as_bytes() },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(RecipientKey {
        recipient: recipient.to_string(),
        ephemeral_public: encoding::encode(ephemeral_pk.as_bytes()),
        nonce: encoding::encode(&nonce_bytes),
        wrapped_key: encoding::encode(&wrapped),
    })
}

fn unwrap_key(
    entry: &RecipientKey,
    secret: &StaticSecret,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let ephemeral_pk = X25519PublicKey::from(encoding::decode_array::<32>(&entry.ephemeral_public)?);
    let own_pk = X25519PublicKey::from(secret);
    let wrap_key = derive_wrap_key(secret, &ephemeral_pk, &ephemeral_pk)?;

    let nonce = encoding::decode_array::<NONCE_SIZE>(&entry.nonce)?;
    let wrapped = encoding::decode(&entry.wrapped_key)?;
    let cipher = ChaCha20Poly1305::new_from_slice(&wrap_key[..])
        .map_err(|e| CryptoError::Decryption(format!("Invalid key: {}", e)))?;

    let content_key = cipher
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload { msg: wrapped.as_slice(), aad: own_pk.as_bytes() },
        )
        .map_err(|_| CryptoError::Decryption("key unwrap failed".to_string()))?;

    if content_key.len() != KEY_SIZE {
        return Err(CryptoError::Decryption("wrapped key has wrong length".to_string()));
    }
    Ok(Zeroizing::new(content_key))
}

/// HKDF-SHA256 over the X25519 shared secret, salted with the ephemeral public key
fn derive_wrap_key(
    secret: &StaticSecret,
    peer: &X25519PublicKey,
    ephemeral_pk: &X25519PublicKey,
) -> Result<Zeroizing<[u8; KEY_SIZE]>, CryptoError> {
    let shared = secret.diffie_hellman(peer);
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidKey("low-order X25519 public key".to_string()));
    }

    let hk = Hkdf::<Sha256>::new(Some(ephemeral_pk.as_bytes()), shared.as_bytes());
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(WRAP_KEY_LABEL, &mut key[..])
        .map_err(|e| CryptoError::Encryption(format!("HKDF expand failed: {}", e)))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_recipient_roundtrip() {
        let kp = Keypair::generate();
        let envelope = Envelope::seal(b"secret", &[kp.encryption_public().to_string()]).unwrap();

        assert_eq!(envelope.recipients.len(), 1);
        assert_eq!(envelope.open(&kp).unwrap(), b"secret".to_vec());
    }

    #[test]
    fn test_every_recipient_can_open() {
        let alice = Keypair::generate();
        let bob = Keypair::generate();
        let recipients = vec![
            alice.encryption_public().to_string(),
            bob.encryption_public().to_string(),
        ];

        let envelope = Envelope::seal(b"for both", &recipients).unwrap();
        assert_eq!(envelope.open(&alice).unwrap(), b"for both".to_vec());
        assert_eq!(envelope.open(&bob).unwrap(), b"for both".to_vec());
    }

    #[test]
    fn test_outsider_cannot_open() {
        let alice = Keypair::generate();
        let eve = Keypair::generate();
        let envelope = Envelope::seal(b"private", &[alice.encryption_public().to_string()]).unwrap();

        assert!(matches!(envelope.open(&eve), Err(CryptoError::NotARecipient(_))));
    }

    #[test]
    fn test_redirected_entry_fails() {
        // Relabelling Alice's entry for Eve must not let Eve unwrap it
        let alice = Keypair::generate();
        let eve = Keypair::generate();
        let mut envelope =
            Envelope::seal(b"private", &[alice.encryption_public().to_string()]).unwrap();
        envelope.recipients[0].recipient = eve.encryption_public().to_string();

        assert!(matches!(envelope.open(&eve), Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let kp = Keypair::generate();
        let mut envelope = Envelope::seal(b"payload", &[kp.encryption_public().to_string()]).unwrap();

        let mut bytes = encoding::decode(&envelope.ciphertext).unwrap();
        bytes[0] ^= 0x01;
        envelope.ciphertext = encoding::encode(&bytes);

        assert!(matches!(envelope.open(&kp), Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_no_recipients_rejected() {
        assert!(Envelope::seal(b"x", &[]).is_err());
    }

    #[test]
    fn test_empty_message() {
        let kp = Keypair::generate();
        let envelope = Envelope::seal(b"", &[kp.encryption_public().to_string()]).unwrap();
        assert!(envelope.open(&kp).unwrap().is_empty());
    }

    #[test]
    fn test_envelope_json_shape() {
        let kp = Keypair::generate();
        let envelope = Envelope::seal(b"x", &[kp.encryption_public().to_string()]).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["version"], 1);
        assert!(json["recipients"][0]["ephemeralPublic"].is_string());
        assert!(json["recipients"][0]["wrappedKey"].is_string());
    }
}
