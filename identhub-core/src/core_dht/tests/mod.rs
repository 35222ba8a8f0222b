//! Store doubles shared by the service test suites

use crate::core_dht::{DhtError, DirectoryStore};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Store whose every call fails, as an unreachable DHT would
#[derive(Default)]
pub struct FailingStore {
    pub calls: AtomicUsize,
}

#[async_trait]
impl DirectoryStore for FailingStore {
    async fn put(&self, _key: &str, _value: Value) -> Result<(), DhtError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DhtError::Unavailable("connection refused".to_string()))
    }

    async fn get(&self, _key: &str) -> Result<Option<Value>, DhtError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DhtError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_failing_store_counts_calls() {
    let store = FailingStore::default();
    assert!(store.get("k").await.is_err());
    assert!(store.put("k", Value::Null).await.is_err());
    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
}
