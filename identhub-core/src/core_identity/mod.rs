//! Identity management module
//!
//! - `Keypair`: Ed25519 signing + X25519 encryption keys as portable strings
//! - `KeyCapability`: the crypto/persistence collaborator sessions delegate to
//! - `IdentitySession`: one caller's identity, the signer behind tokens,
//!   directory records and SAML assertions
//! - `keystore`: password-sealed keypair storage

pub mod capability;
pub mod encoding;
pub mod envelope;
pub mod keypair;
pub mod keystore;
pub mod portable;
pub mod session;

#[cfg(test)]
mod tests;

pub use capability::{DalekCapability, KeyCapability};
pub use envelope::{Envelope, RecipientKey};
pub use keypair::Keypair;
pub use portable::{PortableKey, PortableKeypair};
pub use session::{IdentityAnnouncement, IdentitySession};

use thiserror::Error;

/// Failures of the cryptographic primitives
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid encoding: {0}")]
    Encoding(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The envelope carries no wrapped key for this identity
    #[error("Envelope has no entry for recipient {0}")]
    NotARecipient(String),

    #[error("Unsupported portable key: {0}")]
    UnsupportedKey(String),
}
