//! IdP metadata document

use super::constants::*;
use crate::config::SamlConfig;
use crate::core_identity::encoding;
use crate::core_identity::CryptoError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::escape::escape;

/// DER SubjectPublicKeyInfo for a portable Ed25519 public key, base64
pub fn ed25519_spki_base64(signing_public: &str) -> Result<String, CryptoError> {
    let raw = encoding::decode_array::<32>(signing_public)?;
    let mut der = Vec::with_capacity(ED25519_SPKI_PREFIX.len() + raw.len());
    der.extend_from_slice(&ED25519_SPKI_PREFIX);
    der.extend_from_slice(&raw);
    Ok(STANDARD.encode(der))
}

/// EntityDescriptor for an IdP signing with `signing_public`
pub fn idp_metadata(config: &SamlConfig, signing_public: &str) -> Result<String, CryptoError> {
    let spki = ed25519_spki_base64(signing_public)?;
    let sso_url = escape(&config.sso_url);

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<md:EntityDescriptor xmlns:md="{md}" entityID="{entity_id}">
  <md:IDPSSODescriptor WantAuthnRequestsSigned="false" protocolSupportEnumeration="{samlp}">
    <md:KeyDescriptor use="signing">
      <ds:KeyInfo xmlns:ds="{ds}" xmlns:dsig11="{ds11}">
        <ds:KeyName>{key_name}</ds:KeyName>
        <dsig11:DEREncodedKeyValue>{spki}</dsig11:DEREncodedKeyValue>
      </ds:KeyInfo>
    </md:KeyDescriptor>
    <md:NameIDFormat>{nameid_unspecified}</md:NameIDFormat>
    <md:NameIDFormat>{nameid_email}</md:NameIDFormat>
    <md:NameIDFormat>{nameid_persistent}</md:NameIDFormat>
    <md:SingleSignOnService Binding="{post}" Location="{sso_url}"/>
    <md:SingleSignOnService Binding="{redirect}" Location="{sso_url}"/>
  </md:IDPSSODescriptor>
</md:EntityDescriptor>"#,
        md = METADATA_NS,
        entity_id = escape(&config.entity_id),
        samlp = SAMLP_NS,
        ds = XMLDSIG_NS,
        ds11 = XMLDSIG11_NS,
        key_name = escape(signing_public),
        spki = spki,
        nameid_unspecified = NAMEID_FORMAT_UNSPECIFIED,
        nameid_email = NAMEID_FORMAT_EMAIL,
        nameid_persistent = NAMEID_FORMAT_PERSISTENT,
        post = BINDING_HTTP_POST,
        redirect = BINDING_HTTP_REDIRECT,
        sso_url = sso_url,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_identity::Keypair;

    #[test]
    fn test_spki_layout() {
        let kp = Keypair::generate();
        let der = STANDARD.decode(ed25519_spki_base64(kp.signing_public()).unwrap()).unwrap();

        assert_eq!(der.len(), 44);
        assert_eq!(&der[..12], &ED25519_SPKI_PREFIX);
        assert_eq!(encoding::encode(&der[12..]), kp.signing_public());
    }

    #[test]
    fn test_metadata_contents() {
        let kp = Keypair::generate();
        let config = SamlConfig::default();
        let xml = idp_metadata(&config, kp.signing_public()).unwrap();

        assert!(xml.contains(&format!(r#"entityID="{}""#, config.entity_id)));
        assert!(xml.contains(&format!("<ds:KeyName>{}</ds:KeyName>", kp.signing_public())));
        assert!(xml.contains(BINDING_HTTP_POST));
        assert!(xml.contains(BINDING_HTTP_REDIRECT));
        assert_eq!(xml.matches("<md:NameIDFormat>").count(), 3);
    }

    #[test]
    fn test_bad_key_rejected() {
        assert!(idp_metadata(&SamlConfig::default(), "not-a-key").is_err());
    }
}
