use crate::config::SamlConfig;
use crate::core_identity::IdentitySession;
use crate::core_saml::bindings::redirect_encode;
use crate::core_saml::*;
use crate::errors::HubError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::json;

const SP: &str = "https://sp.example.com";
const ACS: &str = "https://sp.example.com/acs";

async fn alice() -> IdentitySession {
    let mut session = IdentitySession::in_memory("ns1");
    session.create("alice", None).await.unwrap();
    session
}

fn user() -> SamlUser {
    SamlUser::from_profile(&json!({
        "username": "alice",
        "email": "alice@example.com",
        "groups": ["admins", "staff"]
    }))
}

#[tokio::test]
async fn test_default_window_is_300_seconds() {
    let session = alice().await;
    let config = SamlConfig::default();
    let signed = session.federation(&config).assertion(&user(), ACS, SP).unwrap();

    let a = &signed.assertion;
    assert_eq!(a.not_on_or_after - a.not_before, Duration::seconds(300));
    assert_eq!(a.audience, SP);
    assert_eq!(a.recipient, ACS);
    assert_eq!(a.name_id, "alice");
    assert_eq!(a.issuer, config.entity_id);
    assert!(a.id.starts_with('_'));
    assert!(signed.signed_xml.contains(&format!("<saml:Audience>{}</saml:Audience>", SP)));
}

#[tokio::test]
async fn test_configured_lifetime() {
    let session = alice().await;
    let config = SamlConfig {
        assertion_lifetime: std::time::Duration::from_secs(60),
        ..SamlConfig::default()
    };
    let signed = session.federation(&config).assertion(&user(), ACS, SP).unwrap();
    let a = &signed.assertion;
    assert_eq!(a.not_on_or_after - a.not_before, Duration::seconds(60));
}

#[tokio::test]
async fn test_audience_mismatch_rejected() {
    let session = alice().await;
    let config = SamlConfig::default();
    let signed = session
        .federation(&config)
        .assertion(&user(), ACS, "https://a.example.com")
        .unwrap();

    let now = signed.assertion.not_before;
    assert!(signed.assertion.validate("https://a.example.com", now).is_ok());
    assert!(matches!(
        signed.assertion.validate("https://b.example.com", now),
        Err(SamlError::InvalidAudience { .. })
    ));
}

#[tokio::test]
async fn test_signature_verifies_and_detects_tampering() {
    let session = alice().await;
    let config = SamlConfig::default();
    let federation = session.federation(&config);
    let signed = federation.assertion(&user(), ACS, SP).unwrap();

    federation.verify_assertion(&signed).unwrap();

    let mut forged = signed.clone();
    forged.assertion.audience = "https://evil.example.com".to_string();
    assert!(matches!(federation.verify_assertion(&forged), Err(HubError::SignatureInvalid)));

    let mut forged = signed.clone();
    forged.signed_xml = forged.signed_xml.replace("admins", "root");
    assert!(matches!(federation.verify_assertion(&forged), Err(HubError::SignatureInvalid)));
}

#[tokio::test]
async fn test_detached_signature_covers_unsigned_xml() {
    let session = alice().await;
    let config = SamlConfig::default();
    let signed = session.federation(&config).assertion(&user(), ACS, SP).unwrap();

    assert!(session.verify(
        signed.assertion.to_xml().as_bytes(),
        &signed.signature,
        session.signing_public().unwrap()
    ));
}

#[tokio::test]
async fn test_user_without_subject() {
    let session = alice().await;
    let config = SamlConfig::default();
    let nobody = SamlUser::from_profile(&json!({"email": "x@example.com"}));

    let result = session.federation(&config).assertion(&nobody, ACS, SP);
    assert!(matches!(result, Err(HubError::Saml(SamlError::InvalidAssertion(_)))));
}

#[tokio::test]
async fn test_requires_keypair() {
    let session = IdentitySession::in_memory("ns1");
    let config = SamlConfig::default();
    let federation = session.federation(&config);

    assert!(matches!(federation.metadata(), Err(HubError::NotInitialized(_))));
    assert!(matches!(
        federation.assertion(&user(), ACS, SP),
        Err(HubError::NotInitialized(_))
    ));
}

#[tokio::test]
async fn test_metadata_tracks_live_key() {
    let mut session = alice().await;
    let config = SamlConfig::default();

    let before = session.federation(&config).metadata().unwrap();
    assert!(before.contains(session.signing_public().unwrap()));

    session.create("alice2", None).await.unwrap();
    let after = session.federation(&config).metadata().unwrap();
    assert!(after.contains(session.signing_public().unwrap()));
    assert_ne!(before, after);
}

#[tokio::test]
async fn test_response_envelope() {
    let session = alice().await;
    let config = SamlConfig::default();
    let encoded = session
        .federation(&config)
        .response(&user(), ACS, SP, Some("_req-1"))
        .unwrap();

    let xml = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
    assert!(xml.starts_with("<samlp:Response"));
    assert!(xml.contains(r#"InResponseTo="_req-1""#));
    assert!(xml.contains(constants::STATUS_SUCCESS));
    assert!(xml.contains(&format!(r#"Destination="{}""#, ACS)));
    assert!(xml.contains("<ds:SignatureValue>"));
}

#[tokio::test]
async fn test_sso_answers_request() {
    let session = alice().await;
    let config = SamlConfig::default();
    let request = r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_req-7" Version="2.0" AssertionConsumerServiceURL="https://sp.example.com/acs"><saml:Issuer>https://sp.example.com</saml:Issuer></samlp:AuthnRequest>"#;

    for encoded in [STANDARD.encode(request), redirect_encode(request).unwrap()] {
        let outcome = session
            .federation(&config)
            .sso(&encoded, &user(), Some("state-1"))
            .unwrap();

        assert_eq!(outcome.request.id, "_req-7");
        assert_eq!(outcome.response.in_response_to.as_deref(), Some("_req-7"));
        assert_eq!(outcome.response.destination, ACS);
        assert_eq!(outcome.response.assertion.assertion.audience, SP);
        assert!(outcome.form.contains(r#"action="https://sp.example.com/acs""#));
        assert!(outcome.form.contains(r#"name="RelayState" value="state-1""#));
        assert!(outcome.form.contains(&outcome.encoded_response));
    }
}

#[tokio::test]
async fn test_sso_rejects_bad_requests() {
    let session = alice().await;
    let config = SamlConfig::default();
    let federation = session.federation(&config);

    assert!(matches!(
        federation.sso("%%%", &user(), None),
        Err(HubError::SamlDecodeError(_))
    ));

    let no_acs = r#"<AuthnRequest ID="_1"><Issuer>sp</Issuer></AuthnRequest>"#;
    assert!(matches!(
        federation.sso(&STANDARD.encode(no_acs), &user(), None),
        Err(HubError::SamlDecodeError(_))
    ));
}

#[tokio::test]
async fn test_assertion_expires() {
    let session = alice().await;
    let config = SamlConfig::default();
    let target = ServiceProviderTarget::new(ACS, SP);
    let issued_at = Utc::now() - Duration::seconds(600);
    let signed = session
        .federation(&config)
        .assertion_at(&user(), &target, None, issued_at)
        .unwrap();

    assert!(matches!(
        signed.assertion.validate(SP, Utc::now()),
        Err(SamlError::AssertionExpired)
    ));
}

#[tokio::test]
async fn test_assertion_from_another_signer_rejected() {
    let idp = alice().await;
    let mut mallory = IdentitySession::in_memory("ns1");
    mallory.create("mallory", None).await.unwrap();
    let config = SamlConfig::default();

    // Self-consistent: mallory's own key verifies mallory's signature
    let forged = mallory.federation(&config).assertion(&user(), ACS, SP).unwrap();
    assert!(matches!(
        idp.federation(&config).verify_assertion(&forged),
        Err(HubError::SignatureInvalid)
    ));

    let mut relabelled = forged.clone();
    relabelled.signing_public = idp.signing_public().unwrap().to_string();
    assert!(matches!(
        idp.federation(&config).verify_assertion(&relabelled),
        Err(HubError::SignatureInvalid)
    ));
}

#[tokio::test]
async fn test_oversized_lifetime_is_an_error() {
    let session = alice().await;
    let config = SamlConfig {
        assertion_lifetime: std::time::Duration::from_secs(1_000_000_000_000_000),
        ..SamlConfig::default()
    };
    let result = session.federation(&config).assertion(&user(), ACS, SP);
    assert!(matches!(result, Err(HubError::Saml(SamlError::InvalidAssertion(_)))));

    let config = SamlConfig {
        session_lifetime: std::time::Duration::from_secs(u64::MAX),
        ..SamlConfig::default()
    };
    let result = session.federation(&config).assertion(&user(), ACS, SP);
    assert!(matches!(result, Err(HubError::Saml(SamlError::InvalidAssertion(_)))));
}

fn authn_request(attributes: &str) -> String {
    format!(
        r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_req-9" Version="2.0" {}><saml:Issuer>https://sp.example.com</saml:Issuer></samlp:AuthnRequest>"#,
        attributes
    )
}

#[tokio::test]
async fn test_sso_checks_destination() {
    let session = alice().await;
    let config = SamlConfig::default();
    let federation = session.federation(&config);

    let elsewhere = authn_request(&format!(
        r#"Destination="https://evil.example.com/sso" AssertionConsumerServiceURL="{}""#,
        ACS
    ));
    assert!(matches!(
        federation.sso(&STANDARD.encode(elsewhere), &user(), None),
        Err(HubError::SamlDecodeError(_))
    ));

    let here = authn_request(&format!(
        r#"Destination="{}" AssertionConsumerServiceURL="{}""#,
        config.sso_url, ACS
    ));
    let outcome = federation.sso(&STANDARD.encode(here), &user(), None).unwrap();
    assert_eq!(outcome.response.destination, ACS);
}

#[tokio::test]
async fn test_sso_requires_https_acs_unless_allowed() {
    let session = alice().await;
    let plain = authn_request(r#"AssertionConsumerServiceURL="http://sp.example.com/acs""#);

    let config = SamlConfig::default();
    assert!(matches!(
        session.federation(&config).sso(&STANDARD.encode(&plain), &user(), None),
        Err(HubError::SamlDecodeError(_))
    ));

    let config = SamlConfig { allow_insecure_acs: true, ..SamlConfig::default() };
    let outcome = session
        .federation(&config)
        .sso(&STANDARD.encode(&plain), &user(), None)
        .unwrap();
    assert_eq!(outcome.response.destination, "http://sp.example.com/acs");
}

#[tokio::test]
async fn test_user_for_token_uses_directory_record() {
    let session = alice().await;
    let config = SamlConfig::default();
    let token = session
        .tokens()
        .issue(json!({"username": "root", "email": "root@example.com"}), 3600)
        .unwrap()
        .to_value()
        .unwrap();

    // Unregistered issuer
    assert!(matches!(
        session.federation(&config).user_for_token(&token).await,
        Err(HubError::UntrustedIssuer(_))
    ));

    session
        .directory()
        .publish(json!({"username": "alice", "email": "alice@example.com"}))
        .await
        .unwrap();
    let resolved = session.federation(&config).user_for_token(&token).await.unwrap();

    // Claims never override the verified profile
    assert_eq!(resolved.subject(), Some(session.signing_public().unwrap()));
    assert_eq!(resolved.username.as_deref(), Some("alice"));
    assert!(resolved
        .attributes
        .iter()
        .any(|a| a.name == "email" && a.values == vec!["alice@example.com".to_string()]));
}

#[tokio::test]
async fn test_user_for_token_rejects_other_namespace() {
    let session = alice().await;
    session.directory().publish(json!({"username": "alice"})).await.unwrap();

    let mut outsider = IdentitySession::in_memory("ns2");
    outsider.create("alice", None).await.unwrap();
    let token = outsider.tokens().issue(json!({}), 3600).unwrap().to_value().unwrap();

    let config = SamlConfig::default();
    assert!(matches!(
        session.federation(&config).user_for_token(&token).await,
        Err(HubError::UntrustedIssuer(_))
    ));
}
