//! Inbound AuthnRequest decoding and parsing

use super::bindings::inflate;
use super::error::{SamlError, SamlResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

/// What the IdP needs from an AuthnRequest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthnRequestInfo {
    pub id: String,
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_binding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_id_format: Option<String>,
    pub force_authn: bool,
    pub is_passive: bool,
}

/// Base64-decode a `SAMLRequest` value. POST-binding payloads are plain XML;
/// Redirect-binding payloads are raw DEFLATE and get inflated.
pub fn decode_request(encoded: &str) -> SamlResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(SamlError::InvalidRequest("empty SAMLRequest".to_string()));
    }
    let bytes = STANDARD.decode(compact)?;

    let xml_bytes = if looks_like_xml(&bytes) { bytes } else { inflate(&bytes)? };
    if !looks_like_xml(&xml_bytes) {
        return Err(SamlError::InvalidRequest("payload is not XML".to_string()));
    }

    String::from_utf8(xml_bytes)
        .map_err(|e| SamlError::InvalidRequest(format!("invalid UTF-8 in message: {e}")))
}

fn looks_like_xml(bytes: &[u8]) -> bool {
    let start = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    start.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'<')
}

/// Extract request ID, issuer and ACS details from AuthnRequest XML
pub fn parse_authn_request(xml: &str) -> SamlResult<AuthnRequestInfo> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut info: Option<AuthnRequestInfo> = None;
    let mut depth = 0usize;
    let mut in_issuer = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                visit_element(&e, depth, &mut info)?;
                in_issuer = depth == 2 && e.local_name().as_ref() == b"Issuer";
            }
            Event::Empty(e) => visit_element(&e, depth + 1, &mut info)?,
            Event::Text(t) if in_issuer => {
                if let Some(info) = info.as_mut() {
                    info.issuer = t.unescape()?.trim().to_string();
                }
            }
            Event::End(_) => {
                in_issuer = false;
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let info = info.ok_or_else(|| SamlError::InvalidRequest("no AuthnRequest element".to_string()))?;
    if info.id.is_empty() {
        return Err(SamlError::InvalidRequest("AuthnRequest has no ID".to_string()));
    }
    if info.issuer.is_empty() {
        return Err(SamlError::InvalidRequest("AuthnRequest has no Issuer".to_string()));
    }
    Ok(info)
}

fn visit_element(
    e: &BytesStart<'_>,
    depth: usize,
    info: &mut Option<AuthnRequestInfo>,
) -> SamlResult<()> {
    match (depth, e.local_name().as_ref()) {
        (1, b"AuthnRequest") => {
            let mut request = AuthnRequestInfo::default();
            for attr in e.attributes() {
                let attr = attr?;
                let value = attr.unescape_value()?.into_owned();
                match attr.key.local_name().as_ref() {
                    b"ID" => request.id = value,
                    b"Destination" => request.destination = Some(value),
                    b"AssertionConsumerServiceURL" => {
                        request.assertion_consumer_service_url = Some(value)
                    }
                    b"ProtocolBinding" => request.protocol_binding = Some(value),
                    b"ForceAuthn" => request.force_authn = is_true(&value),
                    b"IsPassive" => request.is_passive = is_true(&value),
                    _ => {}
                }
            }
            *info = Some(request);
        }
        (1, other) => {
            return Err(SamlError::InvalidRequest(format!(
                "expected AuthnRequest, found {}",
                String::from_utf8_lossy(other)
            )));
        }
        (2, b"NameIDPolicy") => {
            if let Some(info) = info.as_mut() {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"Format" {
                        info.name_id_format = Some(attr.unescape_value()?.into_owned());
                    }
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn is_true(value: &str) -> bool {
    matches!(value.trim(), "true" | "1")
}
