/*
    DHTValue - stored value with metadata

    Wraps the JSON payload with the bookkeeping storage needs: when it was
    written, an optional time-to-live, and a sequence number bumped on every
    overwrite of the same key.
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Protocol version for stored values
const PROTOCOL_VERSION: u32 = 1;

/// Current Unix timestamp in seconds
pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Stored value with metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DhtValue {
    pub version: u32,

    /// The JSON payload
    pub data: Value,

    /// When the value was written (Unix seconds)
    pub timestamp: u64,

    /// Time-to-live in seconds; `None` never expires
    pub ttl: Option<u64>,

    /// Number of overwrites of this key before this one
    pub sequence: u64,
}

impl DhtValue {
    pub fn new(data: Value) -> Self {
        DhtValue {
            version: PROTOCOL_VERSION,
            data,
            timestamp: current_timestamp(),
            ttl: None,
            sequence: 0,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl.map(|d| d.as_secs());
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Expiration timestamp, if any
    pub fn expiration_time(&self) -> Option<u64> {
        self.ttl.map(|ttl| self.timestamp.saturating_add(ttl))
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp())
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expiration_time().is_some_and(|expiration| now >= expiration)
    }

    /// Size of the payload's JSON encoding
    pub fn encoded_size(&self) -> usize {
        serde_json::to_vec(&self.data).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}
