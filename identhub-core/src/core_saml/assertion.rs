//! Assertions: model, XML rendering and consumer-side validation

use super::constants::*;
use super::error::{SamlError, SamlResult};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;

/// One attribute with one or more values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamlAttribute {
    pub name: String,
    pub values: Vec<String>,
}

/// The authenticated principal an assertion is about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamlUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub attributes: Vec<SamlAttribute>,
}

impl SamlUser {
    /// Build from a profile object. `id` and `username` name the subject;
    /// every field except `id` becomes an attribute. Arrays become multiple
    /// values, nulls are dropped, nested objects are carried as JSON text.
    pub fn from_profile(profile: &Value) -> Self {
        let Some(map) = profile.as_object() else {
            return Self::default();
        };

        let attributes = map
            .iter()
            .filter(|(name, _)| name.as_str() != "id")
            .filter_map(|(name, value)| {
                let values = attribute_values(value);
                (!values.is_empty()).then(|| SamlAttribute { name: name.clone(), values })
            })
            .collect();

        SamlUser {
            id: map.get("id").and_then(scalar_text),
            username: map.get("username").and_then(scalar_text),
            attributes,
        }
    }

    /// `id`, falling back to `username`
    pub fn subject(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.username.as_deref())
            .filter(|s| !s.is_empty())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Array(_) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn attribute_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

/// Time-bounded, audience-restricted statement of authentication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamlAssertion {
    pub id: String,
    pub issuer: String,
    pub name_id: String,
    pub name_id_format: String,
    /// Assertion consumer service URL
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,
    pub attributes: Vec<SamlAttribute>,
    pub not_before: DateTime<Utc>,
    pub not_on_or_after: DateTime<Utc>,
    pub audience: String,
    pub authn_instant: DateTime<Utc>,
    pub session_index: String,
    pub session_not_on_or_after: DateTime<Utc>,
}

pub(crate) fn instant(t: &DateTime<Utc>) -> String {
    t.format(INSTANT_FORMAT).to_string()
}

impl SamlAssertion {
    /// Consumer-side checks: validity window, then audience
    pub fn validate(&self, expected_audience: &str, now: DateTime<Utc>) -> SamlResult<()> {
        if now < self.not_before {
            return Err(SamlError::AssertionNotYetValid);
        }
        if now >= self.not_on_or_after {
            return Err(SamlError::AssertionExpired);
        }
        if self.audience != expected_audience {
            return Err(SamlError::InvalidAudience {
                expected: expected_audience.to_string(),
                actual: self.audience.clone(),
            });
        }
        Ok(())
    }

    /// Unsigned XML. This exact rendering is what gets signed.
    pub fn to_xml(&self) -> String {
        self.render(None)
    }

    /// XML with an enveloped `ds:Signature` following the Issuer
    pub fn to_signed_xml(&self, signature: &str, signing_public: &str) -> String {
        let mut sig = String::new();
        let _ = write!(
            sig,
            r#"<ds:Signature xmlns:ds="{}"><ds:SignedInfo><ds:SignatureMethod Algorithm="{}"/></ds:SignedInfo><ds:SignatureValue>{}</ds:SignatureValue><ds:KeyInfo><ds:KeyName>{}</ds:KeyName></ds:KeyInfo></ds:Signature>"#,
            XMLDSIG_NS,
            SIGNATURE_METHOD_ED25519,
            escape(signature),
            escape(signing_public),
        );
        self.render(Some(&sig))
    }

    fn render(&self, signature: Option<&str>) -> String {
        let mut xml = String::with_capacity(2048);
        let in_response_to = self
            .in_response_to
            .as_deref()
            .map(|id| format!(r#" InResponseTo="{}""#, escape(id)))
            .unwrap_or_default();

        let _ = write!(
            xml,
            r#"<saml:Assertion xmlns:saml="{}" ID="{}" Version="2.0" IssueInstant="{}">"#,
            SAML_NS,
            escape(&self.id),
            instant(&self.not_before),
        );
        let _ = write!(xml, "<saml:Issuer>{}</saml:Issuer>", escape(&self.issuer));
        if let Some(signature) = signature {
            xml.push_str(signature);
        }

        let _ = write!(
            xml,
            r#"<saml:Subject><saml:NameID Format="{}">{}</saml:NameID><saml:SubjectConfirmation Method="{}"><saml:SubjectConfirmationData NotOnOrAfter="{}" Recipient="{}"{}/></saml:SubjectConfirmation></saml:Subject>"#,
            escape(&self.name_id_format),
            escape(&self.name_id),
            SUBJECT_CONFIRMATION_BEARER,
            instant(&self.not_on_or_after),
            escape(&self.recipient),
            in_response_to,
        );
        let _ = write!(
            xml,
            r#"<saml:Conditions NotBefore="{}" NotOnOrAfter="{}"><saml:AudienceRestriction><saml:Audience>{}</saml:Audience></saml:AudienceRestriction></saml:Conditions>"#,
            instant(&self.not_before),
            instant(&self.not_on_or_after),
            escape(&self.audience),
        );
        let _ = write!(
            xml,
            r#"<saml:AuthnStatement AuthnInstant="{}" SessionIndex="{}" SessionNotOnOrAfter="{}"><saml:AuthnContext><saml:AuthnContextClassRef>{}</saml:AuthnContextClassRef></saml:AuthnContext></saml:AuthnStatement>"#,
            instant(&self.authn_instant),
            escape(&self.session_index),
            instant(&self.session_not_on_or_after),
            AUTHN_CONTEXT_UNSPECIFIED,
        );

        if !self.attributes.is_empty() {
            xml.push_str("<saml:AttributeStatement>");
            for attribute in &self.attributes {
                let _ = write!(
                    xml,
                    r#"<saml:Attribute Name="{}" NameFormat="{}">"#,
                    escape(&attribute.name),
                    ATTRNAME_FORMAT_BASIC,
                );
                for value in &attribute.values {
                    let _ = write!(
                        xml,
                        "<saml:AttributeValue>{}</saml:AttributeValue>",
                        escape(value)
                    );
                }
                xml.push_str("</saml:Attribute>");
            }
            xml.push_str("</saml:AttributeStatement>");
        }

        xml.push_str("</saml:Assertion>");
        xml
    }
}

/// An assertion together with its detached signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAssertion {
    pub assertion: SamlAssertion,
    /// Signer's Ed25519 public key
    pub signing_public: String,
    /// Signature over [`SamlAssertion::to_xml`]
    pub signature: String,
    /// Rendering with the signature embedded
    pub signed_xml: String,
}
