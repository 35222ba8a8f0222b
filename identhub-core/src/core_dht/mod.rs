/*
    core_dht - the shared key-value store identities publish into

    The protocol only needs `put` and `get` of JSON values under string keys.
    `DirectoryStore` is that seam; the physical DHT fabric lives behind it.
    `DhtStorage` is the in-process implementation used by the server and tests.

    Key layout:
    - identity:<alias>:<namespace>                      alias announcements
    - user:<signingPublic>:<namespace>                  directory records
    - auth:<hubNamespace>:<signingPublic>:<issuedAt>    authentication records
*/

pub mod dht_key;
pub mod dht_storage;
pub mod dht_value;

#[cfg(test)]
pub(crate) mod tests;

pub use dht_key::{auth_key, identity_key, user_key, DhtKey};
pub use dht_storage::DhtStorage;
pub use dht_value::DhtValue;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Store failures. The protocol surfaces every one of these as unavailability
/// and never retries.
#[derive(Debug, Error)]
pub enum DhtError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("value size {size} exceeds maximum {max}")]
    ValueTooLarge { size: usize, max: usize },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key-value store collaborator
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Store `value` under `key`, replacing whatever was there
    async fn put(&self, key: &str, value: Value) -> Result<(), DhtError>;

    /// Fetch the value under `key`; `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<Value>, DhtError>;
}
