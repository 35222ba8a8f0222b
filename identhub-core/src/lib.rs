//! identhub core: a decentralized identity provider
//!
//! One [`IdentitySession`] owns a signing/encryption keypair and lends it to
//! three services: signed authentication tokens ([`core_token`]), a signed
//! public directory over a shared key-value store ([`core_directory`]), and a
//! SAML 2.0 identity provider ([`core_saml`]).

pub mod canonical;
pub mod config;
pub mod core_dht;
pub mod core_directory;
pub mod core_identity;
pub mod core_saml;
pub mod core_token;
pub mod errors;
pub mod health;
pub mod logging;
pub mod metrics;

pub use config::Config;
pub use core_dht::{DhtStorage, DirectoryStore};
pub use core_directory::{DirectoryRecord, DirectoryService};
pub use core_identity::{DalekCapability, IdentityAnnouncement, IdentitySession, KeyCapability};
pub use core_saml::{FederationService, SamlUser, ServiceProviderTarget};
pub use core_token::{AuthToken, Claims, TokenService, TokenVerification};
pub use errors::{HubError, HubResult};
pub use logging::{init_logging, LogLevel};
