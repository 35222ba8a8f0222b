//! JWK-style interchange form for keypairs
//!
//! Both keys are Octet Key Pairs (RFC 8037): `crv` is `Ed25519` for the
//! signing key and `X25519` for the encryption key, `x` is the public key and
//! `d` the private key, base64url without padding. Public components are the
//! same strings the keypair already carries, so they pass through unchanged.

use super::{CryptoError, Keypair};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

const KTY_OKP: &str = "OKP";
const CRV_ED25519: &str = "Ed25519";
const CRV_X25519: &str = "X25519";

/// One key in JWK form
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PortableKey {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

/// Exported identity: signing and encryption keys
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableKeypair {
    pub signing: PortableKey,
    pub encryption: PortableKey,
}

impl PortableKeypair {
    /// Export a keypair, private parts included
    pub fn from_keypair(keypair: &Keypair) -> Self {
        PortableKeypair {
            signing: PortableKey {
                kty: KTY_OKP.to_string(),
                crv: CRV_ED25519.to_string(),
                x: keypair.signing_public().to_string(),
                d: Some(keypair.signing_private().to_string()),
            },
            encryption: PortableKey {
                kty: KTY_OKP.to_string(),
                crv: CRV_X25519.to_string(),
                x: keypair.encryption_public().to_string(),
                d: Some(keypair.encryption_private().to_string()),
            },
        }
    }

    /// Import into a keypair; both private parts are required
    pub fn to_keypair(&self) -> Result<Keypair, CryptoError> {
        let signing_d = check_key(&self.signing, CRV_ED25519)?;
        let encryption_d = check_key(&self.encryption, CRV_X25519)?;

        Keypair::from_portable_strings(&self.signing.x, signing_d, &self.encryption.x, encryption_d)
    }

    /// Same keys with private parts removed
    pub fn public_only(&self) -> Self {
        let mut public = self.clone();
        public.signing.d = None;
        public.encryption.d = None;
        public
    }
}

fn check_key<'a>(key: &'a PortableKey, crv: &str) -> Result<&'a str, CryptoError> {
    if key.kty != KTY_OKP || key.crv != crv {
        return Err(CryptoError::UnsupportedKey(format!(
            "expected kty={} crv={}, got kty={} crv={}",
            KTY_OKP, crv, key.kty, key.crv
        )));
    }
    key.d
        .as_deref()
        .ok_or_else(|| CryptoError::UnsupportedKey(format!("{} key has no private part", crv)))
}

impl std::fmt::Debug for PortableKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortableKeypair")
            .field("signing", &self.signing.x)
            .field("encryption", &self.encryption.x)
            .finish_non_exhaustive()
    }
}
