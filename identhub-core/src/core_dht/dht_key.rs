/*
    DHTKey - store key layout and hashing

    String keys are what callers see; `DhtKey` is their Blake3 hash, the
    fixed-width form storage is indexed by. Namespace is always part of the
    string key, so two namespaces never share an entry.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of an alias announcement
pub fn identity_key(alias: &str, namespace: &str) -> String {
    format!("identity:{}:{}", alias, namespace)
}

/// Key of a directory record
pub fn user_key(signing_public: &str, namespace: &str) -> String {
    format!("user:{}:{}", signing_public, namespace)
}

/// Key of an authentication record
pub fn auth_key(hub_namespace: &str, signing_public: &str, issued_at: i64) -> String {
    format!("auth:{}:{}:{}", hub_namespace, signing_public, issued_at)
}

/// 256-bit storage key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DhtKey([u8; 32]);

impl DhtKey {
    /// Hash arbitrary data using Blake3
    pub fn hash(data: &[u8]) -> Self {
        DhtKey(*blake3::hash(data).as_bytes())
    }

    /// Hash a string key into the keyspace
    pub fn hash_string(s: &str) -> Self {
        Self::hash(s.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for DhtKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are enough for logs
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl From<&str> for DhtKey {
    fn from(key: &str) -> Self {
        Self::hash_string(key)
    }
}
