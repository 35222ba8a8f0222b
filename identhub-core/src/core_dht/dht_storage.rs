/*
    DHTStorage - in-process key-value storage

    Responsibilities:
    - stores JSON values under hashed string keys
    - overwrites on republish, bumping the sequence number
    - applies the configured time-to-live and hides expired values
    - enforces a maximum value size

    No replication or conflict resolution: the last write wins.
*/

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use super::dht_key::DhtKey;
use super::dht_value::DhtValue;
use super::{DhtError, DirectoryStore};
use crate::config::DhtConfig;

fn handle_poison<T>(_err: PoisonError<T>) -> DhtError {
    DhtError::Unavailable("storage lock poisoned".to_string())
}

/// Entry in the storage with its original string key
#[derive(Debug, Clone)]
struct StorageEntry {
    key: String,
    value: DhtValue,
}

/// Simple in-memory DHT storage
#[derive(Clone)]
pub struct DhtStorage {
    store: Arc<RwLock<HashMap<DhtKey, StorageEntry>>>,
    record_ttl: Option<Duration>,
    max_value_size: usize,
}

impl Default for DhtStorage {
    fn default() -> Self {
        Self::with_config(&DhtConfig::default())
    }
}

impl DhtStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &DhtConfig) -> Self {
        DhtStorage {
            store: Arc::new(RwLock::new(HashMap::new())),
            record_ttl: config.record_ttl,
            max_value_size: config.max_value_size,
        }
    }

    /// Store a value, replacing any previous one under the same key
    pub fn insert(&self, key: &str, data: Value) -> Result<DhtValue, DhtError> {
        if key.is_empty() {
            return Err(DhtError::InvalidKey("empty key".to_string()));
        }

        let value = DhtValue::new(data).with_ttl(self.record_ttl);
        let size = value.encoded_size();
        if size > self.max_value_size {
            return Err(DhtError::ValueTooLarge { size, max: self.max_value_size });
        }

        let hashed = DhtKey::hash_string(key);
        let mut store = self.store.write().map_err(handle_poison)?;
        let sequence = store.get(&hashed).map(|e| e.value.sequence + 1).unwrap_or(0);
        let value = value.with_sequence(sequence);

        store.insert(hashed, StorageEntry { key: key.to_string(), value: value.clone() });
        debug!(key, dht_key = %hashed, sequence, "Stored value");
        Ok(value)
    }

    /// Fetch a live value with its metadata
    pub fn lookup(&self, key: &str) -> Result<Option<DhtValue>, DhtError> {
        let store = self.store.read().map_err(handle_poison)?;
        Ok(store
            .get(&DhtKey::hash_string(key))
            .filter(|entry| !entry.value.is_expired())
            .map(|entry| entry.value.clone()))
    }

    /// Delete a value; returns whether it existed
    pub fn delete(&self, key: &str) -> Result<bool, DhtError> {
        let mut store = self.store.write().map_err(handle_poison)?;
        Ok(store.remove(&DhtKey::hash_string(key)).is_some())
    }

    /// All live keys starting with `prefix`, sorted
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, DhtError> {
        let store = self.store.read().map_err(handle_poison)?;
        let mut keys: Vec<String> = store
            .values()
            .filter(|entry| !entry.value.is_expired() && entry.key.starts_with(prefix))
            .map(|entry| entry.key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Remove all expired entries.
    ///
    /// Expired values are already hidden from reads; this only reclaims memory.
    /// Embedders that do not run [`DhtStorage::spawn_cleanup`] sweep on their own.
    pub fn cleanup_expired(&self) -> Result<usize, DhtError> {
        let mut store = self.store.write().map_err(handle_poison)?;
        let before_count = store.len();
        store.retain(|_, entry| !entry.value.is_expired());
        Ok(before_count - store.len())
    }

    /// Sweep expired entries every `every` until the returned task is aborted
    pub fn spawn_cleanup(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.cleanup_expired() {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "Swept expired directory values"),
                    Err(e) => warn!(error = %e, "Directory sweep failed"),
                }
            }
        })
    }

    /// Number of stored entries, expired ones included
    pub fn size(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DirectoryStore for DhtStorage {
    async fn put(&self, key: &str, value: Value) -> Result<(), DhtError> {
        metrics::counter!("dht.operations", "op" => "put").increment(1);
        self.insert(key, value).map(|_| ())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, DhtError> {
        metrics::counter!("dht.operations", "op" => "get").increment(1);
        let value = self.lookup(key)?;
        debug!(key, found = value.is_some(), "Looked up value");
        Ok(value.map(|v| v.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get() {
        let storage = DhtStorage::new();
        storage.put("user:a:ns", json!({"x": 1})).await.unwrap();

        assert_eq!(storage.get("user:a:ns").await.unwrap(), Some(json!({"x": 1})));
        assert_eq!(storage.get("user:b:ns").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_republish_overwrites() {
        let storage = DhtStorage::new();
        storage.put("k", json!(1)).await.unwrap();
        storage.put("k", json!(2)).await.unwrap();

        assert_eq!(storage.get("k").await.unwrap(), Some(json!(2)));
        assert_eq!(storage.lookup("k").unwrap().unwrap().sequence, 1);
        assert_eq!(storage.size(), 1);
    }

    #[test]
    fn test_value_too_large() {
        let storage = DhtStorage::with_config(&DhtConfig {
            max_value_size: 8,
            ..DhtConfig::default()
        });
        let result = storage.insert("k", json!("this string is too long"));
        assert!(matches!(result, Err(DhtError::ValueTooLarge { .. })));
    }

    #[test]
    fn test_empty_key_rejected() {
        let storage = DhtStorage::new();
        assert!(matches!(storage.insert("", json!(1)), Err(DhtError::InvalidKey(_))));
    }

    #[test]
    fn test_expired_values_hidden_and_cleaned() {
        let storage = DhtStorage::with_config(&DhtConfig {
            record_ttl: Some(Duration::ZERO),
            ..DhtConfig::default()
        });
        storage.insert("k", json!(1)).unwrap();

        assert!(storage.lookup("k").unwrap().is_none());
        assert_eq!(storage.cleanup_expired().unwrap(), 1);
        assert_eq!(storage.size(), 0);
    }

    #[test]
    fn test_keys_with_prefix() {
        let storage = DhtStorage::new();
        storage.insert("auth:hub:A:2", json!(2)).unwrap();
        storage.insert("auth:hub:A:1", json!(1)).unwrap();
        storage.insert("user:A:ns", json!(0)).unwrap();

        assert_eq!(
            storage.keys_with_prefix("auth:hub:A:").unwrap(),
            vec!["auth:hub:A:1", "auth:hub:A:2"]
        );
    }

    #[test]
    fn test_delete() {
        let storage = DhtStorage::new();
        storage.insert("k", json!(1)).unwrap();
        assert!(storage.delete("k").unwrap());
        assert!(!storage.delete("k").unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_cleanup_sweeps_expired() {
        let storage = Arc::new(DhtStorage::with_config(&DhtConfig {
            record_ttl: Some(Duration::ZERO),
            ..DhtConfig::default()
        }));
        storage.insert("a", json!(1)).unwrap();
        storage.insert("b", json!(2)).unwrap();
        assert_eq!(storage.size(), 2);

        let sweeper = storage.clone().spawn_cleanup(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(storage.size(), 0);

        storage.insert("c", json!(3)).unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(storage.size(), 0);

        sweeper.abort();
    }
}
