//! HTTP-POST and HTTP-Redirect binding helpers

use super::error::{SamlError, SamlResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use quick_xml::escape::escape;
use std::io::{Read, Write};

/// Largest inflated message accepted from the Redirect binding
const MAX_INFLATED_SIZE: u64 = 256 * 1024;

/// Auto-submitting HTML form delivering a response to the SP's ACS
pub fn post_binding_form(acs_url: &str, saml_response: &str, relay_state: Option<&str>) -> String {
    let relay_state_input = relay_state
        .map(|rs| format!(r#"<input type="hidden" name="RelayState" value="{}"/>"#, escape(rs)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"><title>SAML POST Binding</title></head>
<body onload="document.forms[0].submit()">
  <form method="post" action="{}">
    <input type="hidden" name="SAMLResponse" value="{}"/>
    {}
    <noscript><input type="submit" value="Continue"/></noscript>
  </form>
</body>
</html>"#,
        escape(acs_url),
        escape(saml_response),
        relay_state_input
    )
}

/// Raw DEFLATE then base64, as a Redirect-binding `SAMLRequest` value
pub fn redirect_encode(xml: &str) -> SamlResult<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(xml.as_bytes())
        .map_err(|e| SamlError::Deflate(format!("compression error: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| SamlError::Deflate(format!("compression finish error: {e}")))?;
    Ok(STANDARD.encode(compressed))
}

/// Inflate a raw DEFLATE stream
pub(crate) fn inflate(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data).take(MAX_INFLATED_SIZE + 1);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| SamlError::Deflate(format!("decompression error: {e}")))?;
    if out.len() as u64 > MAX_INFLATED_SIZE {
        return Err(SamlError::Deflate("inflated message too large".to_string()));
    }
    Ok(out)
}
