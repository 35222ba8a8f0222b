//! Walk one identity through every service with debug logging on
//!
//! Run with:
//! ```bash
//! cargo run --example walkthrough
//! ```

use identhub_core::config::SamlConfig;
use identhub_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use identhub_core::{HubResult, IdentitySession, SamlUser};
use serde_json::json;
use tracing::info;

#[tokio::main]
async fn main() -> HubResult<()> {
    let config = LogConfig::new(LogLevel::Debug).with_timestamp(true).with_target(true);
    if let Err(e) = init_logging_with_config(config) {
        eprintln!("logging unavailable: {}", e);
    }

    let mut session = IdentitySession::in_memory("ns1");
    session.create("alice", None).await?;

    let signature = session.sign(b"Hello World")?;
    let valid = session.verify(b"Hello World", &signature, session.signing_public()?);
    info!(valid, "Signature checked");

    let token = session.tokens().issue(json!({"username": "alice"}), 3600)?;
    let claims = session.tokens().verify(&token)?;
    info!(username = ?claims.get_str("username"), "Token verified");

    session.directory().publish(json!({"displayName": "Alice"})).await?;
    let record = session.directory().lookup(session.signing_public()?).await?;
    info!(found = record.is_some(), "Directory lookup");

    let saml = SamlConfig::default();
    let user = SamlUser::from_profile(&json!({"username": "alice"}));
    let signed = session
        .federation(&saml)
        .assertion(&user, "https://sp.example.com/acs", "https://sp.example.com")?;
    println!("{}", signed.signed_xml);

    session.close();
    Ok(())
}
