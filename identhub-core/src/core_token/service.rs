use super::token::{AuthToken, Claims, RESERVED_CLAIMS};
use crate::canonical;
use crate::core_dht::auth_key;
use crate::core_identity::IdentitySession;
use crate::errors::{HubError, HubResult};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Outcome of verification in transport-friendly form
#[derive(Debug, Clone, Serialize)]
pub struct TokenVerification {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl From<HubResult<Claims>> for TokenVerification {
    fn from(result: HubResult<Claims>) -> Self {
        match result {
            Ok(claims) => TokenVerification {
                valid: true,
                claims: Some(claims),
                error: None,
                code: None,
            },
            Err(e) => TokenVerification {
                valid: false,
                claims: None,
                code: Some(e.code()),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Issues and verifies tokens on behalf of a session
pub struct TokenService<'a> {
    session: &'a IdentitySession,
}

impl<'a> TokenService<'a> {
    pub fn new(session: &'a IdentitySession) -> Self {
        Self { session }
    }

    /// Issue a token valid for `ttl_seconds`. Zero or negative lifetimes are
    /// legal and produce a token that is already expired.
    pub fn issue(&self, claims: Value, ttl_seconds: i64) -> HubResult<AuthToken> {
        self.issue_at(claims, ttl_seconds, chrono::Utc::now().timestamp())
    }

    /// Issue with an explicit clock reading
    pub fn issue_at(&self, claims: Value, ttl_seconds: i64, now: i64) -> HubResult<AuthToken> {
        let mut extra = match claims {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(HubError::MalformedToken(format!(
                    "claims must be an object, got {}",
                    other
                )))
            }
        };
        for reserved in RESERVED_CLAIMS {
            extra.remove(reserved);
        }

        let claims = Claims {
            namespace: self.session.namespace().to_string(),
            issuer: self.session.signing_public()?.to_string(),
            issued_at: now,
            expires_at: now.saturating_add(ttl_seconds),
            extra,
        };

        let signature = self.session.sign(&canonical::canonicalize(&claims)?)?;
        metrics::counter!("token.issued").increment(1);
        debug!(issuer = %claims.issuer, expires_at = claims.expires_at, "Token issued");

        Ok(AuthToken { claims, signature })
    }

    /// Verify a typed token
    pub fn verify(&self, token: &AuthToken) -> HubResult<Claims> {
        self.verify_value(&token.to_value()?)
    }

    /// Verify a token as received on the wire
    pub fn verify_value(&self, token: &Value) -> HubResult<Claims> {
        self.verify_value_at(token, chrono::Utc::now().timestamp())
    }

    /// Structural, then temporal, then cryptographic checks
    pub fn verify_value_at(&self, token: &Value, now: i64) -> HubResult<Claims> {
        let result = self.check(token, now);
        let label = match &result {
            Ok(_) => "valid",
            Err(e) => e.code(),
        };
        metrics::counter!("token.verified", "result" => label).increment(1);
        result
    }

    /// Transport form of [`Self::verify_value`]
    pub fn verification(&self, token: &Value) -> TokenVerification {
        self.verify_value(token).into()
    }

    /// File a verified token at `auth:<hub>:<issuer>:<issuedAt>`; returns the key
    pub async fn record_authentication(
        &self,
        token: &AuthToken,
        hub_namespace: &str,
    ) -> HubResult<String> {
        self.verify(token)?;

        let key = auth_key(hub_namespace, &token.claims.issuer, token.claims.issued_at);
        self.session.store().put(&key, token.to_value()?).await?;
        debug!(key = %key, "Authentication recorded");
        Ok(key)
    }

    fn check(&self, token: &Value, now: i64) -> HubResult<Claims> {
        // Structural
        let claims_value = token
            .get("claims")
            .filter(|c| c.is_object())
            .ok_or_else(|| HubError::MalformedToken("missing claims object".to_string()))?;
        let signature = token
            .get("signature")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| HubError::MalformedToken("missing signature".to_string()))?;
        let claims: Claims = serde_json::from_value(claims_value.clone())
            .map_err(|e| HubError::MalformedToken(e.to_string()))?;

        // Temporal
        if claims.is_expired_at(now) {
            return Err(HubError::TokenExpired { expires_at: claims.expires_at, now });
        }

        // Cryptographic, over the claims exactly as received
        let signed = canonical::to_canonical_bytes(claims_value);
        if !self.session.verify(&signed, signature, &claims.issuer) {
            warn!(issuer = %claims.issuer, "Token signature rejected");
            return Err(HubError::SignatureInvalid);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_dht::tests::FailingStore;
    use crate::core_dht::DhtStorage;
    use crate::core_identity::DalekCapability;
    use serde_json::json;
    use std::sync::Arc;

    async fn session() -> IdentitySession {
        let mut session = IdentitySession::in_memory("ns1");
        session.create("alice", None).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_issue_and_verify() {
        let session = session().await;
        let tokens = session.tokens();

        let token = tokens.issue(json!({"username": "alice"}), 3600).unwrap();
        assert_eq!(token.claims.issuer, session.signing_public().unwrap());
        assert_eq!(token.claims.namespace, "ns1");
        assert_eq!(token.claims.expires_at - token.claims.issued_at, 3600);

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.get_str("username"), Some("alice"));
    }

    #[tokio::test]
    async fn test_reserved_claims_are_overridden() {
        let session = session().await;
        let token = session
            .tokens()
            .issue(json!({"issuer": "someone-else", "expiresAt": i64::MAX, "role": "admin"}), 60)
            .unwrap();

        assert_eq!(token.claims.issuer, session.signing_public().unwrap());
        assert!(token.claims.expires_at < i64::MAX);
        assert_eq!(token.claims.get_str("role"), Some("admin"));
        assert!(token.claims.get("issuer").is_none());
    }

    #[tokio::test]
    async fn test_negative_ttl_is_expired() {
        let session = session().await;
        let tokens = session.tokens();
        let token = tokens.issue(json!({"username": "alice"}), -1).unwrap();

        assert!(matches!(tokens.verify(&token), Err(HubError::TokenExpired { .. })));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_expired() {
        let session = session().await;
        let tokens = session.tokens();
        let token = tokens.issue_at(json!({}), 0, 1_000).unwrap();

        let result = tokens.verify_value_at(&token.to_value().unwrap(), 1_000);
        assert!(matches!(result, Err(HubError::TokenExpired { expires_at: 1_000, now: 1_000 })));
    }

    #[tokio::test]
    async fn test_tampered_claim_is_rejected() {
        let session = session().await;
        let tokens = session.tokens();
        let token = tokens.issue(json!({"username": "alice"}), 3600).unwrap();

        let mut value = token.to_value().unwrap();
        value["claims"]["username"] = json!("alicf");
        assert!(matches!(tokens.verify_value(&value), Err(HubError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn test_expired_and_tampered_reports_expiry() {
        let session = session().await;
        let tokens = session.tokens();
        let token = tokens.issue(json!({"username": "alice"}), -10).unwrap();

        let mut value = token.to_value().unwrap();
        value["signature"] = json!("AAAA");
        assert!(matches!(tokens.verify_value(&value), Err(HubError::TokenExpired { .. })));
    }

    #[tokio::test]
    async fn test_malformed_tokens() {
        let session = session().await;
        let tokens = session.tokens();

        for bad in [
            json!({}),
            json!({"claims": {"username": "x"}}),
            json!({"signature": "abc"}),
            json!({"claims": "not an object", "signature": "abc"}),
            json!({"claims": {"issuer": "x", "expiresAt": 1}, "signature": "abc"}),
            json!({"claims": {"namespace": "n", "issuer": "x", "issuedAt": 0, "expiresAt": "soon"}, "signature": "abc"}),
        ] {
            assert!(
                matches!(tokens.verify_value(&bad), Err(HubError::MalformedToken(_))),
                "expected MalformedToken for {}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_key_order_does_not_matter() {
        let session = session().await;
        let tokens = session.tokens();
        let token = tokens.issue(json!({"b": 1, "a": {"y": 2, "x": 1}}), 3600).unwrap();

        // Rebuild the claims with keys inserted in reverse order
        let value = token.to_value().unwrap();
        let claims = value["claims"].as_object().unwrap();
        let mut reversed = Map::new();
        let mut keys: Vec<&String> = claims.keys().collect();
        keys.reverse();
        for key in keys {
            reversed.insert(key.clone(), claims[key].clone());
        }
        let reordered = json!({"signature": value["signature"], "claims": reversed});

        assert!(tokens.verify_value(&reordered).is_ok());
    }

    #[tokio::test]
    async fn test_other_session_verifies() {
        let issuer = session().await;
        let token = issuer.tokens().issue(json!({"username": "alice"}), 3600).unwrap();

        // A session without keys can still verify: the issuer key travels in the token
        let verifier = IdentitySession::in_memory("elsewhere");
        let verification = verifier.tokens().verification(&token.to_value().unwrap());
        assert!(verification.valid);
        assert_eq!(verification.claims.unwrap().get_str("username"), Some("alice"));
    }

    #[tokio::test]
    async fn test_verification_report() {
        let session = session().await;
        let token = session.tokens().issue(json!({}), -1).unwrap();

        let report = session.tokens().verification(&token.to_value().unwrap());
        assert!(!report.valid);
        assert_eq!(report.code, Some("TokenExpired"));
        assert!(report.claims.is_none());
    }

    #[tokio::test]
    async fn test_issue_requires_keypair() {
        let session = IdentitySession::in_memory("ns1");
        let result = session.tokens().issue(json!({}), 60);
        assert!(matches!(result, Err(HubError::NotInitialized(_))));
    }

    #[tokio::test]
    async fn test_non_object_claims_rejected() {
        let session = session().await;
        assert!(session.tokens().issue(json!([1, 2]), 60).is_err());
        assert!(session.tokens().issue(Value::Null, 60).is_ok());
    }

    #[tokio::test]
    async fn test_record_authentication() {
        let store = Arc::new(DhtStorage::new());
        let mut session =
            IdentitySession::new("ns1", Arc::new(DalekCapability::new()), store.clone());
        session.create("alice", None).await.unwrap();

        let token = session.tokens().issue(json!({"username": "alice"}), 3600).unwrap();
        let key = session.tokens().record_authentication(&token, "hub").await.unwrap();

        assert_eq!(
            key,
            format!("auth:hub:{}:{}", token.claims.issuer, token.claims.issued_at)
        );
        assert_eq!(store.lookup(&key).unwrap().unwrap().data, token.to_value().unwrap());
    }

    #[tokio::test]
    async fn test_record_authentication_surfaces_store_failure() {
        let mut issuer = session().await;
        let token = issuer.tokens().issue(json!({}), 3600).unwrap();
        let portable = issuer.export_portable().unwrap();
        issuer.close();

        let store = Arc::new(FailingStore::default());
        let mut session = IdentitySession::new("ns1", Arc::new(DalekCapability::new()), store);
        session.import_portable(&portable).unwrap();

        let result = session.tokens().record_authentication(&token, "hub").await;
        assert!(matches!(result, Err(HubError::DhtUnavailable(_))));
    }
}
