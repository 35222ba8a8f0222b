//! Health reporting for the identity hub

use crate::core_dht::DirectoryStore;
use crate::core_identity::IdentitySession;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> u16 {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => 200,
            HealthStatus::Unhealthy => 503,
        }
    }
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub timestamp: SystemTime,
    pub components: Vec<ComponentHealth>,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Component health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub last_check: SystemTime,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self::with_status(name, HealthStatus::Healthy, None)
    }

    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(name, HealthStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(name, HealthStatus::Unhealthy, Some(message.into()))
    }

    fn with_status(name: impl Into<String>, status: HealthStatus, message: Option<String>) -> Self {
        Self { name: name.into(), status, message, last_check: SystemTime::now() }
    }
}

/// Aggregates component health for the server
pub struct HealthChecker {
    start_time: SystemTime,
    version: String,
    components: Arc<RwLock<Vec<ComponentHealth>>>,
}

impl HealthChecker {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            start_time: SystemTime::now(),
            version: version.into(),
            components: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Record a component result, replacing any earlier one of the same name
    pub async fn report(&self, health: ComponentHealth) {
        let mut components = self.components.write().await;
        match components.iter_mut().find(|c| c.name == health.name) {
            Some(existing) => *existing = health,
            None => components.push(health),
        }
    }

    /// Check the session and store, then report
    pub async fn check(&self, session: &IdentitySession, store: &dyn DirectoryStore) -> HealthCheck {
        self.report(checks::check_session(session)).await;
        self.report(checks::check_store(store).await).await;
        self.check_health().await
    }

    /// Current aggregate: the worst component status wins
    pub async fn check_health(&self) -> HealthCheck {
        let components = self.components.read().await.clone();

        let status = if components.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if components.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let uptime = self
            .start_time
            .elapsed()
            .unwrap_or(Duration::from_secs(0))
            .as_secs();

        HealthCheck {
            status,
            timestamp: SystemTime::now(),
            components,
            version: self.version.clone(),
            uptime_seconds: uptime,
        }
    }

    /// Can accept traffic
    pub async fn readiness_check(&self) -> bool {
        self.check_health().await.status != HealthStatus::Unhealthy
    }
}

/// Built-in health checks
pub mod checks {
    use super::*;

    /// Key the store check reads; absence is the expected answer
    pub const SENTINEL_KEY: &str = "health:sentinel";

    /// Degraded while no identity is loaded
    pub fn check_session(session: &IdentitySession) -> ComponentHealth {
        if session.is_initialized() {
            ComponentHealth::healthy("session")
        } else {
            ComponentHealth::degraded("session", "No identity loaded")
        }
    }

    /// Unhealthy when a sentinel read fails
    pub async fn check_store(store: &dyn DirectoryStore) -> ComponentHealth {
        match store.get(SENTINEL_KEY).await {
            Ok(_) => ComponentHealth::healthy("store"),
            Err(e) => ComponentHealth::unhealthy("store", e.to_string()),
        }
    }
}
