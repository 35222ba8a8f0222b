use super::DirectoryRecord;
use crate::core_dht::{identity_key, user_key};
use crate::core_identity::{IdentityAnnouncement, IdentitySession};
use crate::errors::{HubError, HubResult};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Publishes and resolves directory records on behalf of a session
pub struct DirectoryService<'a> {
    session: &'a IdentitySession,
}

impl<'a> DirectoryService<'a> {
    pub fn new(session: &'a IdentitySession) -> Self {
        Self { session }
    }

    /// Sign `profile` with the session identity and write it to the store
    pub async fn publish(&self, profile: Value) -> HubResult<DirectoryRecord> {
        let keypair = self.session.keypair()?;
        let profile = match profile {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(HubError::Serialization(format!(
                    "profile must be an object, got {}",
                    other
                )))
            }
        };

        let mut record = DirectoryRecord {
            signing_public: keypair.signing_public().to_string(),
            encryption_public: keypair.encryption_public().to_string(),
            profile,
            namespace: self.session.namespace().to_string(),
            registered_at: chrono::Utc::now().timestamp_millis(),
            signature: String::new(),
        };
        record.signature = self.session.sign(&record.signable_bytes()?)?;

        let key = user_key(&record.signing_public, &record.namespace);
        self.session.store().put(&key, serde_json::to_value(&record)?).await?;

        metrics::counter!("directory.published").increment(1);
        info!(signing_public = %record.signing_public, namespace = %record.namespace, "Profile published");
        Ok(record)
    }

    /// Fetch and verify the record published by `signing_public`.
    /// A miss is `None`; a record that fails verification is an error.
    pub async fn lookup(&self, signing_public: &str) -> HubResult<Option<DirectoryRecord>> {
        let key = user_key(signing_public, self.session.namespace());
        let Some(value) = self.session.store().get(&key).await? else {
            metrics::counter!("directory.lookups", "result" => "miss").increment(1);
            debug!(key = %key, "Directory miss");
            return Ok(None);
        };

        match self.check_record(value, signing_public) {
            Ok(record) => {
                metrics::counter!("directory.lookups", "result" => "hit").increment(1);
                Ok(Some(record))
            }
            Err(e) => {
                metrics::counter!("directory.lookups", "result" => "tampered").increment(1);
                warn!(key = %key, error = %e, "Directory record rejected");
                Err(e)
            }
        }
    }

    /// Resolve an alias announced in the session's namespace
    pub async fn resolve_alias(&self, alias: &str) -> HubResult<Option<IdentityAnnouncement>> {
        if alias.contains(':') {
            return Ok(None);
        }
        let key = identity_key(alias, self.session.namespace());
        let Some(value) = self.session.store().get(&key).await? else {
            return Ok(None);
        };

        let announcement: IdentityAnnouncement = serde_json::from_value(value)
            .map_err(|e| HubError::DirectoryRecordTampered(format!("{}: {}", key, e)))?;
        if announcement.alias != alias || announcement.namespace != self.session.namespace() {
            return Err(HubError::DirectoryRecordTampered(format!(
                "{}: announcement names {}:{}",
                key, announcement.alias, announcement.namespace
            )));
        }
        if !announcement.verify(self.session.capability()) {
            return Err(HubError::DirectoryRecordTampered(format!("{}: bad signature", key)));
        }
        Ok(Some(announcement))
    }

    fn check_record(&self, value: Value, signing_public: &str) -> HubResult<DirectoryRecord> {
        let record: DirectoryRecord = serde_json::from_value(value)
            .map_err(|e| HubError::DirectoryRecordTampered(e.to_string()))?;

        if record.signing_public != signing_public {
            return Err(HubError::DirectoryRecordTampered(format!(
                "record is for {}, requested {}",
                record.signing_public, signing_public
            )));
        }
        if record.namespace != self.session.namespace() {
            return Err(HubError::DirectoryRecordTampered(format!(
                "record namespace {} does not match {}",
                record.namespace,
                self.session.namespace()
            )));
        }
        if !record.verify(self.session.capability()) {
            return Err(HubError::DirectoryRecordTampered("signature does not verify".to_string()));
        }
        Ok(record)
    }
}
