//! Error types for the identity hub protocol
//!
//! `HubError` is the taxonomy every session-bound service reports. Subsystem
//! errors (crypto, keystore, store, SAML) convert into it at the service edge.

use crate::core_dht::DhtError;
use crate::core_identity::keystore::KeystoreError;
use crate::core_identity::CryptoError;
use crate::core_saml::SamlError;
use thiserror::Error;

/// Errors surfaced by the identity, token, directory and federation services
#[derive(Debug, Error)]
pub enum HubError {
    /// Operation attempted before a keypair is loaded
    #[error("Session not initialized: {0}")]
    NotInitialized(String),

    /// Load or lookup miss for an alias/password pair
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    /// Token is missing its claims, signature, or a required claim
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Token expiry has passed at verification time
    #[error("Token expired at {expires_at} (now {now})")]
    TokenExpired { expires_at: i64, now: i64 },

    /// Signature does not verify under the claimed key
    #[error("Signature invalid")]
    SignatureInvalid,

    /// A stored record failed verification on read
    #[error("Directory record tampered: {0}")]
    DirectoryRecordTampered(String),

    /// The directory store collaborator failed
    #[error("DHT unavailable: {0}")]
    DhtUnavailable(String),

    /// A validly signed token from an identity this hub does not vouch for
    #[error("Untrusted issuer: {0}")]
    UntrustedIssuer(String),

    /// An inbound SAML message could not be decoded
    #[error("SAML decode error: {0}")]
    SamlDecodeError(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Keystore error: {0}")]
    Keystore(#[from] KeystoreError),

    #[error("SAML error: {0}")]
    Saml(SamlError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;

impl HubError {
    /// Stable machine-readable code for transports
    pub fn code(&self) -> &'static str {
        match self {
            HubError::NotInitialized(_) => "NotInitialized",
            HubError::IdentityNotFound(_) => "IdentityNotFound",
            HubError::MalformedToken(_) => "MalformedToken",
            HubError::TokenExpired { .. } => "TokenExpired",
            HubError::SignatureInvalid => "SignatureInvalid",
            HubError::DirectoryRecordTampered(_) => "DirectoryRecordTampered",
            HubError::DhtUnavailable(_) => "DHTUnavailable",
            HubError::UntrustedIssuer(_) => "UntrustedIssuer",
            HubError::SamlDecodeError(_) => "SAMLDecodeError",
            HubError::Crypto(_) => "CryptoError",
            HubError::Keystore(_) => "KeystoreError",
            HubError::Saml(e) => e.code(),
            HubError::Serialization(_) => "SerializationError",
        }
    }
}

impl From<DhtError> for HubError {
    fn from(err: DhtError) -> Self {
        HubError::DhtUnavailable(err.to_string())
    }
}

impl From<SamlError> for HubError {
    fn from(err: SamlError) -> Self {
        match err {
            SamlError::Base64Decode(_)
            | SamlError::Deflate(_)
            | SamlError::XmlParse(_)
            | SamlError::InvalidRequest(_) => HubError::SamlDecodeError(err.to_string()),
            SamlError::SignatureInvalid => HubError::SignatureInvalid,
            other => HubError::Saml(other),
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::Serialization(err.to_string())
    }
}
