#![no_main]

use identhub_core::core_saml::request::{decode_request, parse_authn_request};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Both as an encoded SAMLRequest value and as raw XML
    if let Ok(xml) = decode_request(text) {
        let _ = parse_authn_request(&xml);
    }
    let _ = parse_authn_request(text);
});
