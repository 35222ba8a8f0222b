//! Response envelope carrying one signed assertion

use super::assertion::{instant, SignedAssertion};
use super::constants::{SAMLP_NS, SAML_NS};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamlResponse {
    pub id: String,
    pub issuer: String,
    pub destination: String,
    /// Echoes the request ID this answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,
    pub status_code: String,
    pub issue_instant: DateTime<Utc>,
    pub assertion: SignedAssertion,
}

impl SamlResponse {
    pub fn to_xml(&self) -> String {
        let in_response_to = self
            .in_response_to
            .as_deref()
            .map(|id| format!(r#" InResponseTo="{}""#, escape(id)))
            .unwrap_or_default();

        format!(
            r#"<samlp:Response xmlns:samlp="{}" xmlns:saml="{}" ID="{}" Version="2.0" IssueInstant="{}" Destination="{}"{}><saml:Issuer>{}</saml:Issuer><samlp:Status><samlp:StatusCode Value="{}"/></samlp:Status>{}</samlp:Response>"#,
            SAMLP_NS,
            SAML_NS,
            escape(&self.id),
            instant(&self.issue_instant),
            escape(&self.destination),
            in_response_to,
            escape(&self.issuer),
            escape(&self.status_code),
            self.assertion.signed_xml,
        )
    }

    /// Base64 of the XML, ready for the POST binding
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_xml())
    }
}
