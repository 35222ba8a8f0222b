//! Core identity test suite
//!
//! Session lifecycle, crypto properties and adversarial inputs


// Test helpers and fixtures
pub mod helpers;
