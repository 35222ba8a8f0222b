#![no_main]

use identhub_core::IdentitySession;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary JSON must be rejected with an error, never a panic
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return;
    };

    let session = IdentitySession::in_memory("fuzz");
    let _ = session.tokens().verify_value(&value);
    let _ = session.tokens().verification(&value);
});
