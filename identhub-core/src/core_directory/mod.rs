//! Public directory of identities
//!
//! Each identity publishes one self-signed [`DirectoryRecord`] per namespace
//! at `user:<signingPublic>:<namespace>`. Readers never trust the store:
//! every record is re-verified against the key it claims before it is
//! returned.

mod record;
mod service;

pub use record::DirectoryRecord;
pub use service::DirectoryService;
