use super::assertion::{SamlAssertion, SamlUser, SignedAssertion};
use super::bindings;
use super::constants::STATUS_SUCCESS;
use super::error::SamlError;
use super::metadata;
use super::request::{self, AuthnRequestInfo};
use super::response::SamlResponse;
use crate::config::SamlConfig;
use crate::core_identity::IdentitySession;
use crate::errors::{HubError, HubResult};
use crate::metrics::Timer;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where an assertion is delivered and who may consume it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderTarget {
    pub acs_url: String,
    pub entity_id: String,
}

impl ServiceProviderTarget {
    pub fn new(acs_url: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self { acs_url: acs_url.into(), entity_id: entity_id.into() }
    }
}

/// Result of answering an AuthnRequest
#[derive(Debug, Clone)]
pub struct SsoOutcome {
    pub request: AuthnRequestInfo,
    pub response: SamlResponse,
    /// Base64 response for the POST binding
    pub encoded_response: String,
    /// Auto-submitting form addressed to the request's ACS URL
    pub form: String,
}

/// SAML identity provider signing with a session's identity
pub struct FederationService<'a> {
    session: &'a IdentitySession,
    config: &'a SamlConfig,
}

impl<'a> FederationService<'a> {
    pub fn new(session: &'a IdentitySession, config: &'a SamlConfig) -> Self {
        Self { session, config }
    }

    /// Metadata reflecting the currently loaded signing key
    pub fn metadata(&self) -> HubResult<String> {
        Ok(metadata::idp_metadata(self.config, self.session.signing_public()?)?)
    }

    /// Assertion for `user`, delivered to `acs_url` and restricted to `audience`
    pub fn assertion(
        &self,
        user: &SamlUser,
        acs_url: &str,
        audience: &str,
    ) -> HubResult<SignedAssertion> {
        self.assertion_for(user, &ServiceProviderTarget::new(acs_url, audience), None)
    }

    pub fn assertion_for(
        &self,
        user: &SamlUser,
        target: &ServiceProviderTarget,
        in_response_to: Option<&str>,
    ) -> HubResult<SignedAssertion> {
        self.assertion_at(user, target, in_response_to, Utc::now())
    }

    /// Build and sign with an explicit clock reading
    pub fn assertion_at(
        &self,
        user: &SamlUser,
        target: &ServiceProviderTarget,
        in_response_to: Option<&str>,
        now: DateTime<Utc>,
    ) -> HubResult<SignedAssertion> {
        let timer = Timer::new("saml.assertion.duration_ms");
        let signing_public = self.session.signing_public()?.to_string();
        let subject = user.subject().ok_or_else(|| {
            SamlError::InvalidAssertion("user has neither id nor username".to_string())
        })?;

        let now = now.trunc_subsecs(0);
        let assertion = SamlAssertion {
            id: new_id(),
            issuer: self.config.entity_id.clone(),
            name_id: subject.to_string(),
            name_id_format: self.config.name_id_format.clone(),
            recipient: target.acs_url.clone(),
            in_response_to: in_response_to.map(str::to_string),
            attributes: user.attributes.clone(),
            not_before: now,
            not_on_or_after: add_lifetime(now, self.config.assertion_lifetime)?,
            audience: target.entity_id.clone(),
            authn_instant: now,
            session_index: new_id(),
            session_not_on_or_after: add_lifetime(now, self.config.session_lifetime)?,
        };

        let signature = self.session.sign(assertion.to_xml().as_bytes())?;
        let signed_xml = assertion.to_signed_xml(&signature, &signing_public);

        timer.stop();
        metrics::counter!("saml.assertions.issued").increment(1);
        info!(
            assertion_id = %assertion.id,
            audience = %assertion.audience,
            subject = %assertion.name_id,
            "SAML assertion issued"
        );

        Ok(SignedAssertion { assertion, signing_public, signature, signed_xml })
    }

    /// Check that this IdP signed the assertion: the signer must be the
    /// session's own key, and both signatures must match a fresh rendering
    pub fn verify_assertion(&self, signed: &SignedAssertion) -> HubResult<()> {
        let trusted = self.session.signing_public()?;
        if signed.signing_public != trusted {
            warn!(
                assertion_id = %signed.assertion.id,
                signer = %signed.signing_public,
                "Assertion signed by a foreign key"
            );
            return Err(HubError::SignatureInvalid);
        }

        let unsigned = signed.assertion.to_xml();
        if !self.session.verify(unsigned.as_bytes(), &signed.signature, trusted) {
            warn!(assertion_id = %signed.assertion.id, "Assertion signature rejected");
            return Err(HubError::SignatureInvalid);
        }
        if signed.signed_xml
            != signed.assertion.to_signed_xml(&signed.signature, &signed.signing_public)
        {
            warn!(assertion_id = %signed.assertion.id, "Signed assertion rendering altered");
            return Err(HubError::SignatureInvalid);
        }
        Ok(())
    }

    /// Success response wrapping a fresh assertion
    pub fn build_response(
        &self,
        user: &SamlUser,
        destination: &str,
        audience: &str,
        in_response_to: Option<&str>,
    ) -> HubResult<SamlResponse> {
        let target = ServiceProviderTarget::new(destination, audience);
        let assertion = self.assertion_for(user, &target, in_response_to)?;

        Ok(SamlResponse {
            id: new_id(),
            issuer: self.config.entity_id.clone(),
            destination: destination.to_string(),
            in_response_to: in_response_to.map(str::to_string),
            status_code: STATUS_SUCCESS.to_string(),
            issue_instant: assertion.assertion.not_before,
            assertion,
        })
    }

    /// [`Self::build_response`], base64-encoded for the POST binding
    pub fn response(
        &self,
        user: &SamlUser,
        destination: &str,
        audience: &str,
        in_response_to: Option<&str>,
    ) -> HubResult<String> {
        Ok(self.build_response(user, destination, audience, in_response_to)?.to_base64())
    }

    pub fn decode_request(&self, encoded: &str) -> HubResult<String> {
        Ok(request::decode_request(encoded)?)
    }

    pub fn parse_authn_request(&self, xml: &str) -> HubResult<AuthnRequestInfo> {
        Ok(request::parse_authn_request(xml)?)
    }

    /// Answer an encoded AuthnRequest for an authenticated `user`
    pub fn sso(
        &self,
        encoded_request: &str,
        user: &SamlUser,
        relay_state: Option<&str>,
    ) -> HubResult<SsoOutcome> {
        let xml = self.decode_request(encoded_request)?;
        let request = self.parse_authn_request(&xml)?;
        let acs_url = request.assertion_consumer_service_url.clone().ok_or_else(|| {
            HubError::SamlDecodeError("AuthnRequest has no AssertionConsumerServiceURL".to_string())
        })?;
        self.check_request_routing(&request, &acs_url)?;
        debug!(request_id = %request.id, issuer = %request.issuer, "AuthnRequest accepted");

        let response = self.build_response(user, &acs_url, &request.issuer, Some(&request.id))?;
        let encoded_response = response.to_base64();
        let form = bindings::post_binding_form(&acs_url, &encoded_response, relay_state);

        Ok(SsoOutcome { request, response, encoded_response, form })
    }

    /// The request must be addressed to this IdP and deliver to an https ACS
    fn check_request_routing(&self, request: &AuthnRequestInfo, acs_url: &str) -> HubResult<()> {
        if let Some(destination) = &request.destination {
            if destination != &self.config.sso_url {
                warn!(request_id = %request.id, destination = %destination, "AuthnRequest addressed elsewhere");
                return Err(SamlError::InvalidRequest(format!(
                    "Destination {} is not this IdP's SSO endpoint",
                    destination
                ))
                .into());
            }
        }
        if !acs_url.starts_with("https://") && !self.config.allow_insecure_acs {
            warn!(request_id = %request.id, acs_url, "AuthnRequest asks for a non-https ACS");
            return Err(SamlError::InvalidRequest(format!(
                "AssertionConsumerServiceURL {} is not https",
                acs_url
            ))
            .into());
        }
        Ok(())
    }

    /// Resolve a token to the user it authenticates. The token must verify,
    /// belong to this session's namespace and be issued by an identity with a
    /// verified directory record there. The subject is the issuer's signing
    /// key; the record's profile supplies the attributes.
    pub async fn user_for_token(&self, token: &Value) -> HubResult<SamlUser> {
        let claims = self.session.tokens().verify_value(token)?;
        if claims.namespace != self.session.namespace() {
            warn!(issuer = %claims.issuer, namespace = %claims.namespace, "Token from another namespace");
            return Err(HubError::UntrustedIssuer(format!(
                "token namespace {} is not {}",
                claims.namespace,
                self.session.namespace()
            )));
        }

        let record = self
            .session
            .directory()
            .lookup(&claims.issuer)
            .await?
            .ok_or_else(|| {
                warn!(issuer = %claims.issuer, "Token issuer has no directory record");
                HubError::UntrustedIssuer(format!("{} is not registered", claims.issuer))
            })?;

        let mut profile = record.profile;
        profile.insert("id".to_string(), Value::String(record.signing_public));
        Ok(SamlUser::from_profile(&Value::Object(profile)))
    }

    pub fn post_binding_form(
        &self,
        acs_url: &str,
        saml_response: &str,
        relay_state: Option<&str>,
    ) -> String {
        bindings::post_binding_form(acs_url, saml_response, relay_state)
    }
}

fn new_id() -> String {
    format!("_{}", uuid::Uuid::new_v4().simple())
}

fn add_lifetime(now: DateTime<Utc>, lifetime: Duration) -> HubResult<DateTime<Utc>> {
    chrono::Duration::from_std(lifetime)
        .ok()
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| SamlError::InvalidAssertion("lifetime out of range".to_string()).into())
}
