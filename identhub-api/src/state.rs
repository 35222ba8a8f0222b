use anyhow::anyhow;
use identhub_core::config::Config;
use identhub_core::core_identity::keystore::{FileKeystore, Keystore};
use identhub_core::health::HealthChecker;
use identhub_core::{DalekCapability, DhtStorage, DirectoryStore, IdentitySession};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<IdentitySession>>,
    pub store: Arc<dyn DirectoryStore>,
    pub config: Arc<Config>,
    pub health: Arc<HealthChecker>,
}

impl AppState {
    pub fn new(session: IdentitySession, store: Arc<dyn DirectoryStore>, config: Config) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            store,
            config: Arc::new(config),
            health: Arc::new(HealthChecker::new(env!("CARGO_PKG_VERSION"))),
        }
    }

    /// Build the server identity: load it from the keystore when one is
    /// stored under the configured alias, otherwise create and announce it
    pub async fn bootstrap(config: Config, password: Option<&str>) -> anyhow::Result<Self> {
        let store = Arc::new(DhtStorage::with_config(&config.dht));
        if config.dht.record_ttl.is_some() {
            store.clone().spawn_cleanup(config.dht.cleanup_interval);
            info!(every = ?config.dht.cleanup_interval, "Directory sweeper started");
        }
        let keystore = match &config.identity.keystore_dir {
            Some(dir) => Some(Arc::new(FileKeystore::new(dir.clone())?)),
            None => None,
        };

        let capability = match &keystore {
            Some(keystore) => DalekCapability::with_keystore(keystore.clone()),
            None => DalekCapability::new(),
        };
        let mut session =
            IdentitySession::new(&config.identity.namespace, Arc::new(capability), store.clone());

        let alias = config.identity.alias.clone();
        let stored = match &keystore {
            Some(keystore) => keystore.contains(&alias)?,
            None => false,
        };
        if stored {
            let password = password
                .ok_or_else(|| anyhow!("identity '{}' is stored; a keystore password is required", alias))?;
            session.load(&alias, password)?;
        } else {
            session.create(&alias, password).await?;
        }
        info!(alias = %alias, signing_public = %session.signing_public()?, "Server identity ready");

        Ok(Self::new(session, store, config))
    }
}
