//! Authentication tokens
//!
//! A token is `{ claims, signature }` where the signature covers the
//! canonical serialization of `claims` under the issuer's signing key.
//! Tokens are self-describing: verification needs nothing but the token.

mod service;
mod token;

pub use service::{TokenService, TokenVerification};
pub use token::{AuthToken, Claims, RESERVED_CLAIMS};
