//! SAML error types

use thiserror::Error;

pub type SamlResult<T> = Result<T, SamlError>;

/// Failures building, decoding or checking SAML messages
#[derive(Debug, Error)]
pub enum SamlError {
    /// Inbound request is structurally unusable
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    #[error("deflate error: {0}")]
    Deflate(String),

    /// Assertion cannot be built, e.g. the user has no subject
    #[error("invalid assertion: {0}")]
    InvalidAssertion(String),

    #[error("assertion signature invalid")]
    SignatureInvalid,

    #[error("assertion expired")]
    AssertionExpired,

    #[error("assertion not yet valid")]
    AssertionNotYetValid,

    #[error("invalid audience: expected {expected}, got {actual}")]
    InvalidAudience { expected: String, actual: String },
}

impl SamlError {
    /// SAML status code URI to report for this error
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::Deflate(_) | Self::InvalidAssertion(_) => {
                "urn:oasis:names:tc:SAML:2.0:status:Responder"
            }
            _ => "urn:oasis:names:tc:SAML:2.0:status:Requester",
        }
    }

    /// Short machine-readable name
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_)
            | Self::XmlParse(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_) => "SAMLDecodeError",
            Self::InvalidAssertion(_) => "InvalidAssertion",
            Self::SignatureInvalid => "SignatureInvalid",
            Self::AssertionExpired => "AssertionExpired",
            Self::AssertionNotYetValid => "AssertionNotYetValid",
            Self::InvalidAudience { .. } => "InvalidAudience",
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}
