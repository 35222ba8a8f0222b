/*
    core_saml - SAML 2.0 identity provider

    Assertions are rendered to XML by hand, every interpolated value escaped,
    and signed with the session's Ed25519 key. The detached signature covers
    the unsigned rendering; the signed rendering embeds it as ds:Signature
    after the Issuer. Inbound AuthnRequests are accepted over the POST
    (base64) and Redirect (base64 + raw DEFLATE) bindings.
*/

pub mod assertion;
pub mod bindings;
pub mod constants;
pub mod error;
pub mod metadata;
pub mod request;
pub mod response;
pub mod service;

#[cfg(test)]
mod tests;

pub use assertion::{SamlAssertion, SamlAttribute, SamlUser, SignedAssertion};
pub use error::{SamlError, SamlResult};
pub use request::AuthnRequestInfo;
pub use response::SamlResponse;
pub use service::{FederationService, ServiceProviderTarget, SsoOutcome};
