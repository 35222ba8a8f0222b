use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim names the issuer always sets; caller values for these are replaced
pub const RESERVED_CLAIMS: [&str; 4] = ["namespace", "issuer", "issuedAt", "expiresAt"];

/// Token payload: caller claims plus the issuer's standard fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub namespace: String,
    /// Issuer's signing public key
    pub issuer: String,
    /// Unix seconds
    pub issued_at: i64,
    /// Unix seconds
    pub expires_at: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// A caller-supplied claim
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// A caller-supplied string claim
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Signed token: `{ claims, signature }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub claims: Claims,
    pub signature: String,
}

impl AuthToken {
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_claims_wire_names() {
        let mut extra = Map::new();
        extra.insert("username".to_string(), json!("alice"));
        let claims = Claims {
            namespace: "ns".to_string(),
            issuer: "PUB".to_string(),
            issued_at: 10,
            expires_at: 20,
            extra,
        };

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            value,
            json!({
                "namespace": "ns",
                "issuer": "PUB",
                "issuedAt": 10,
                "expiresAt": 20,
                "username": "alice"
            })
        );

        let parsed: Claims = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.get_str("username"), Some("alice"));
    }

    #[test]
    fn test_expiry_boundary() {
        let claims: Claims = serde_json::from_value(json!({
            "namespace": "ns", "issuer": "PUB", "issuedAt": 0, "expiresAt": 100
        }))
        .unwrap();

        assert!(!claims.is_expired_at(99));
        assert!(claims.is_expired_at(100));
    }
}
