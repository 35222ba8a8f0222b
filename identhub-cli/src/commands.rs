//! Command implementations
//!
//! Every command returns its output as a string so it can be printed by the
//! binary or inspected in tests.

use crate::cli::{expand_path, IdentityArgs};
use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use identhub_core::config::Config;
use identhub_core::core_identity::keystore::{FileKeystore, Keystore};
use identhub_core::{DalekCapability, DhtStorage, IdentitySession};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Load the configuration file, or build one from the environment
pub fn load_config(path: Option<&str>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let mut config = Config::from_file(expand_path(path)?)?;
            config.apply_env()?;
            config
        }
        None => Config::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

fn keystore(config: &Config) -> Result<Arc<FileKeystore>> {
    let dir = config
        .identity
        .keystore_dir
        .as_ref()
        .ok_or_else(|| anyhow!("identity.keystore_dir is not configured"))?;
    Ok(Arc::new(FileKeystore::new(dir.clone())?))
}

fn session(config: &Config, keystore: Arc<FileKeystore>) -> IdentitySession {
    IdentitySession::new(
        &config.identity.namespace,
        Arc::new(DalekCapability::with_keystore(keystore)),
        Arc::new(DhtStorage::with_config(&config.dht)),
    )
}

/// Session with the selected stored identity loaded
pub fn open_session(config: &Config, identity: &IdentityArgs) -> Result<IdentitySession> {
    let alias = identity.alias.as_deref().unwrap_or(&config.identity.alias);
    let mut session = session(config, keystore(config)?);
    session
        .load(alias, &identity.password)
        .with_context(|| format!("cannot open identity '{}'", alias))?;
    Ok(session)
}

fn public_summary(session: &IdentitySession) -> Result<String> {
    let summary = json!({
        "alias": session.alias(),
        "namespace": session.namespace(),
        "signingPublic": session.signing_public()?,
        "encryptionPublic": session.encryption_public()?,
    });
    Ok(serde_json::to_string_pretty(&summary)?)
}

pub async fn identity_create(config: &Config, identity: &IdentityArgs) -> Result<String> {
    let alias = identity.alias.as_deref().unwrap_or(&config.identity.alias);
    let keystore = keystore(config)?;
    if keystore.contains(alias)? {
        bail!("identity '{}' already exists", alias);
    }

    let mut session = session(config, keystore.clone());
    session.create(alias, Some(identity.password.as_str())).await?;
    if !keystore.contains(alias)? {
        bail!("identity '{}' was created but could not be sealed", alias);
    }

    info!(alias, "Identity stored");
    public_summary(&session)
}

pub fn identity_show(config: &Config, identity: &IdentityArgs) -> Result<String> {
    public_summary(&open_session(config, identity)?)
}

fn message_bytes(message: &str, base64: bool) -> Result<Vec<u8>> {
    if base64 {
        STANDARD.decode(message).context("message is not valid base64")
    } else {
        Ok(message.as_bytes().to_vec())
    }
}

pub fn sign(config: &Config, identity: &IdentityArgs, message: &str, base64: bool) -> Result<String> {
    let session = open_session(config, identity)?;
    let signature = session.sign(&message_bytes(message, base64)?)?;
    debug!(signing_public = %session.signing_public()?, "Message signed");
    Ok(signature)
}

/// `true` when the signature holds
pub fn verify(message: &str, signature: &str, public_key: &str, base64: bool) -> Result<bool> {
    let session = IdentitySession::in_memory("verify");
    Ok(session.verify(&message_bytes(message, base64)?, signature, public_key))
}

pub fn token_issue(
    config: &Config,
    identity: &IdentityArgs,
    claims: &str,
    ttl: Option<i64>,
) -> Result<String> {
    let claims: Value = serde_json::from_str(claims).context("claims must be JSON")?;
    let ttl = match ttl {
        Some(ttl) => ttl,
        None => i64::try_from(config.token.default_ttl.as_secs())?,
    };

    let session = open_session(config, identity)?;
    let token = session.tokens().issue(claims, ttl)?;
    Ok(serde_json::to_string(&token)?)
}

/// Verification report and whether the token was valid
pub fn token_verify(token: &str) -> Result<(String, bool)> {
    let token: Value = serde_json::from_str(token.trim()).context("token must be JSON")?;
    let report = IdentitySession::in_memory("verify").tokens().verification(&token);
    Ok((serde_json::to_string_pretty(&report)?, report.valid))
}

pub fn saml_metadata(config: &Config, identity: &IdentityArgs) -> Result<String> {
    let session = open_session(config, identity)?;
    Ok(session.federation(&config.saml).metadata()?)
}

pub fn config_init(output: &str, force: bool) -> Result<String> {
    let path = expand_path(output)?;
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    Config::default().save_to_file(&path)?;
    Ok(format!("Wrote {}", path.display()))
}
