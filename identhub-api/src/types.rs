//! Request and response bodies

use identhub_core::core_saml::SignedAssertion;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub message: String,
    pub signature: String,
    pub public_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

#[derive(Debug, Deserialize)]
pub struct TokenVerifyRequest {
    pub token: Value,
}

/// Query or form fields of the SSO endpoint
#[derive(Debug, Deserialize)]
pub struct SsoParams {
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,
    #[serde(rename = "RelayState")]
    pub relay_state: Option<String>,
    /// JSON-encoded token authenticating the user
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAssertionRequest {
    pub user: Value,
    pub acs_url: String,
    pub audience: String,
    pub in_response_to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAssertionResponse {
    pub assertion: SignedAssertion,
    pub xml: String,
}
