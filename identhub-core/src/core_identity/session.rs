//! Identity session
//!
//! One caller's identity: a namespace, at most one keypair, and the two
//! collaborators every operation goes through. Token, directory and SAML
//! services are views borrowed from a session, so they always sign with the
//! keypair currently loaded.
//!
//! Lifecycle: empty, then has a keypair (`create`, `load`, `import_portable`),
//! then discarded (`close`). Loading a new identity overwrites the keypair in
//! place. Mutating calls take `&mut self`; share a session across tasks
//! behind a lock.

use crate::canonical;
use crate::config::SamlConfig;
use crate::core_dht::{identity_key, DhtStorage, DirectoryStore};
use crate::core_directory::DirectoryService;
use crate::core_identity::keystore::{validate_alias, KeystoreError};
use crate::core_identity::{DalekCapability, Envelope, KeyCapability, Keypair, PortableKeypair};
use crate::core_saml::FederationService;
use crate::core_token::TokenService;
use crate::errors::{HubError, HubResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Public announcement making an alias discoverable in a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityAnnouncement {
    pub alias: String,
    pub signing_public: String,
    pub encryption_public: String,
    pub namespace: String,
    /// Unix milliseconds
    pub created_at: i64,
    pub signature: String,
}

impl IdentityAnnouncement {
    /// Every field except `signature`, in canonical form
    pub fn signable_bytes(&self) -> HubResult<Vec<u8>> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("signature");
        }
        Ok(canonical::to_canonical_bytes(&value))
    }

    /// Check the self-signature under the embedded signing key
    pub fn verify(&self, capability: &dyn KeyCapability) -> bool {
        match self.signable_bytes() {
            Ok(bytes) => capability.verify(&bytes, &self.signature, &self.signing_public),
            Err(_) => false,
        }
    }
}

/// A caller's identity and the collaborators it delegates to
pub struct IdentitySession {
    namespace: String,
    alias: Option<String>,
    keypair: Option<Keypair>,
    capability: Arc<dyn KeyCapability>,
    store: Arc<dyn DirectoryStore>,
}

impl IdentitySession {
    pub fn new(
        namespace: impl Into<String>,
        capability: Arc<dyn KeyCapability>,
        store: Arc<dyn DirectoryStore>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            alias: None,
            keypair: None,
            capability,
            store,
        }
    }

    /// Session with session-only keys and a private in-memory store
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(namespace, Arc::new(DalekCapability::new()), Arc::new(DhtStorage::new()))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Alias of the loaded identity, if it was created or loaded by alias
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.keypair.is_some()
    }

    pub fn capability(&self) -> &dyn KeyCapability {
        self.capability.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn DirectoryStore> {
        &self.store
    }

    /// The loaded keypair, or `NotInitialized`
    pub fn keypair(&self) -> HubResult<&Keypair> {
        self.keypair
            .as_ref()
            .ok_or_else(|| HubError::NotInitialized("no keypair loaded".to_string()))
    }

    pub fn signing_public(&self) -> HubResult<&str> {
        Ok(self.keypair()?.signing_public())
    }

    pub fn encryption_public(&self) -> HubResult<&str> {
        Ok(self.keypair()?.encryption_public())
    }

    fn ensure_setup(&self) -> HubResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(HubError::NotInitialized("session has no namespace".to_string()));
        }
        // ':' separates the parts of directory keys
        if self.namespace.contains(':') {
            return Err(HubError::NotInitialized(format!(
                "namespace {} must not contain ':'",
                self.namespace
            )));
        }
        Ok(())
    }

    /// Generate a new identity, persist it when a password is given, and
    /// announce it at `identity:<alias>:<namespace>`
    pub async fn create(&mut self, alias: &str, password: Option<&str>) -> HubResult<Keypair> {
        self.ensure_setup()?;
        validate_alias(alias)?;

        let keypair = self.capability.generate_keypair()?;
        let announcement = self.announcement_for(alias, &keypair)?;

        self.store
            .put(&identity_key(alias, &self.namespace), serde_json::to_value(&announcement)?)
            .await?;

        if let Some(password) = password {
            // Best effort: a failed persist leaves the identity session-only
            if let Err(e) = self.capability.persist(alias, &keypair, password) {
                warn!(alias, error = %e, "Failed to persist keypair; identity is session-only");
            }
        }

        info!(
            alias,
            namespace = %self.namespace,
            signing_public = %keypair.signing_public(),
            "Identity created"
        );
        metrics::counter!("identity.created").increment(1);

        self.alias = Some(alias.to_string());
        self.keypair = Some(keypair.clone());
        Ok(keypair)
    }

    /// Load a stored identity, replacing the current keypair
    pub fn load(&mut self, alias: &str, password: &str) -> HubResult<Keypair> {
        self.ensure_setup()?;

        let keypair = match self.capability.retrieve(alias, password) {
            Ok(Some(keypair)) => keypair,
            Ok(None) => {
                return Err(HubError::IdentityNotFound(alias.to_string()));
            }
            Err(KeystoreError::InvalidPassword) => {
                warn!(alias, "Stored identity did not open with the given password");
                return Err(HubError::IdentityNotFound(alias.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        info!(alias, namespace = %self.namespace, "Identity loaded");
        metrics::counter!("identity.loaded").increment(1);

        self.alias = Some(alias.to_string());
        self.keypair = Some(keypair.clone());
        Ok(keypair)
    }

    /// Sign with the loaded signing key
    pub fn sign(&self, message: &[u8]) -> HubResult<String> {
        Ok(self.capability.sign(message, self.keypair()?)?)
    }

    /// Verify under a caller-supplied key; never assumes the session's own
    pub fn verify(&self, message: &[u8], signature: &str, public_key: &str) -> bool {
        self.capability.verify(message, signature, public_key)
    }

    /// Encrypt for the given encryption keys, or for this identity when none are given
    pub fn encrypt_for(&self, message: &[u8], recipients: Option<&[String]>) -> HubResult<Envelope> {
        let own;
        let recipients = match recipients {
            Some(keys) if !keys.is_empty() => keys,
            _ => {
                own = [self.encryption_public()?.to_string()];
                &own[..]
            }
        };
        Ok(self.capability.encrypt(message, recipients)?)
    }

    pub fn decrypt(&self, envelope: &Envelope) -> HubResult<Vec<u8>> {
        Ok(self.capability.decrypt(envelope, self.keypair()?)?)
    }

    pub fn export_portable(&self) -> HubResult<PortableKeypair> {
        Ok(self.capability.export_portable(self.keypair()?)?)
    }

    /// Install an imported keypair as this session's identity
    pub fn import_portable(&mut self, data: &PortableKeypair) -> HubResult<Keypair> {
        let keypair = self.capability.import_portable(data)?;
        self.alias = None;
        self.keypair = Some(keypair.clone());
        Ok(keypair)
    }

    /// Discard the in-memory keypair; persisted copies are untouched
    pub fn close(&mut self) {
        if self.keypair.take().is_some() {
            info!(namespace = %self.namespace, "Identity session closed");
        }
        self.alias = None;
    }

    pub fn tokens(&self) -> TokenService<'_> {
        TokenService::new(self)
    }

    pub fn directory(&self) -> DirectoryService<'_> {
        DirectoryService::new(self)
    }

    pub fn federation<'a>(&'a self, config: &'a SamlConfig) -> FederationService<'a> {
        FederationService::new(self, config)
    }

    fn announcement_for(&self, alias: &str, keypair: &Keypair) -> HubResult<IdentityAnnouncement> {
        let mut announcement = IdentityAnnouncement {
            alias: alias.to_string(),
            signing_public: keypair.signing_public().to_string(),
            encryption_public: keypair.encryption_public().to_string(),
            namespace: self.namespace.clone(),
            created_at: chrono::Utc::now().timestamp_millis(),
            signature: String::new(),
        };
        announcement.signature = self.capability.sign(&announcement.signable_bytes()?, keypair)?;
        Ok(announcement)
    }
}

impl std::fmt::Debug for IdentitySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySession")
            .field("namespace", &self.namespace)
            .field("alias", &self.alias)
            .field("signing_public", &self.keypair.as_ref().map(|k| k.signing_public()))
            .finish_non_exhaustive()
    }
}
