//! Test helpers and fixtures

use crate::core_dht::DhtStorage;
use crate::core_identity::keystore::{FileKeystore, MemoryKeystore};
use crate::core_identity::*;
use std::path::Path;
use std::sync::Arc;

pub const NAMESPACE: &str = "ns1";

/// Session whose keys persist to a shared in-memory keystore
pub fn persistent_session(keystore: Arc<MemoryKeystore>, store: Arc<DhtStorage>) -> IdentitySession {
    IdentitySession::new(
        NAMESPACE,
        Arc::new(DalekCapability::with_keystore(keystore)),
        store,
    )
}

/// Session whose keys persist under `dir`
pub fn file_backed_session(dir: &Path) -> IdentitySession {
    let keystore = FileKeystore::new(dir).unwrap();
    IdentitySession::new(
        NAMESPACE,
        Arc::new(DalekCapability::with_keystore(Arc::new(keystore))),
        Arc::new(DhtStorage::new()),
    )
}

/// Session with a freshly created identity
pub async fn session_with(alias: &str) -> IdentitySession {
    let mut session = IdentitySession::in_memory(NAMESPACE);
    session.create(alias, None).await.unwrap();
    session
}
