use crate::canonical;
use crate::core_identity::KeyCapability;
use crate::errors::HubResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Signed profile published under an identity's signing key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRecord {
    pub signing_public: String,
    pub encryption_public: String,
    pub profile: Map<String, Value>,
    pub namespace: String,
    /// Unix milliseconds
    pub registered_at: i64,
    pub signature: String,
}

impl DirectoryRecord {
    /// Canonical bytes of every field except `signature`
    pub fn signable_bytes(&self) -> HubResult<Vec<u8>> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("signature");
        }
        Ok(canonical::to_canonical_bytes(&value))
    }

    /// Check the signature under the embedded signing key
    pub fn verify(&self, capability: &dyn KeyCapability) -> bool {
        match self.signable_bytes() {
            Ok(bytes) => capability.verify(&bytes, &self.signature, &self.signing_public),
            Err(_) => false,
        }
    }

    /// A profile field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.profile.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_identity::{DalekCapability, Keypair};
    use serde_json::json;

    fn signed_record(kp: &Keypair) -> DirectoryRecord {
        let mut record = DirectoryRecord {
            signing_public: kp.signing_public().to_string(),
            encryption_public: kp.encryption_public().to_string(),
            profile: json!({"displayName": "Alice", "email": "alice@example.com"})
                .as_object()
                .cloned()
                .unwrap(),
            namespace: "ns1".to_string(),
            registered_at: 1_700_000_000_000,
            signature: String::new(),
        };
        record.signature = kp.sign(&record.signable_bytes().unwrap()).unwrap();
        record
    }

    #[test]
    fn test_signature_covers_profile() {
        let kp = Keypair::generate();
        let capability = DalekCapability::new();
        let mut record = signed_record(&kp);
        assert!(record.verify(&capability));

        record.profile.insert("email".to_string(), json!("mallory@example.com"));
        assert!(!record.verify(&capability));
    }

    #[test]
    fn test_signature_covers_metadata() {
        let kp = Keypair::generate();
        let capability = DalekCapability::new();

        let mut record = signed_record(&kp);
        record.namespace = "ns2".to_string();
        assert!(!record.verify(&capability));

        let mut record = signed_record(&kp);
        record.registered_at += 1;
        assert!(!record.verify(&capability));
    }

    #[test]
    fn test_signable_bytes_exclude_signature() {
        let kp = Keypair::generate();
        let record = signed_record(&kp);
        let bytes = String::from_utf8(record.signable_bytes().unwrap()).unwrap();

        assert!(!bytes.contains("\"signature\""));
        assert!(bytes.starts_with("{\"encryptionPublic\""));
    }

    #[test]
    fn test_wire_names() {
        let record = signed_record(&Keypair::generate());
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("signingPublic").is_some());
        assert!(value.get("registeredAt").is_some());
        assert_eq!(record.field("displayName"), Some(&json!("Alice")));
    }
}
