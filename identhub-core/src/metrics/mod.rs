//! Metrics descriptions and timing helpers
//!
//! Counters are emitted through the `metrics` facade at the call site; no
//! exporter is installed here, so they are no-ops until the embedding binary
//! installs a recorder.

use metrics::{describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Register descriptions for every metric the crate emits
pub fn init_metrics() {
    // Identity
    describe_counter!("identity.created", "Identities generated and announced");
    describe_counter!("identity.loaded", "Identities loaded from a keystore");

    // Tokens
    describe_counter!("token.issued", "Authentication tokens issued");
    describe_counter!("token.verified", "Token verifications, labelled by result");

    // Directory
    describe_counter!("directory.published", "Directory records published");
    describe_counter!("directory.lookups", "Directory lookups, labelled by result");

    // SAML
    describe_counter!("saml.assertions.issued", "SAML assertions signed");
    describe_histogram!("saml.assertion.duration_ms", "Assertion build and sign time in milliseconds");

    // Store
    describe_counter!("dht.operations", "Directory store operations, labelled by op");
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self { name, start: Instant::now() }
    }

    /// Stop the timer and record the duration in milliseconds
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!(self.name).record(duration.as_secs_f64() * 1000.0);
    }
}
