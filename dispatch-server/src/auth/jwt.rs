//! JWT identity resolver
//!
//! HS256 tokens carrying `sub` (principal id) and `role`.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use shared::models::{Principal, Role};

use super::{AuthError, IdentityResolver};

/// Default token lifetime: 24 hours
const DEFAULT_TTL_MINUTES: i64 = 1440;

/// Claims stored in the token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtIdentityResolver {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtIdentityResolver {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Issue a token for a principal
    pub fn issue_token(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.id.clone(),
            role: principal.role,
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Invalid(format!("token generation failed: {e}")))
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            }
        })?;

        Ok(data.claims)
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.validate_token(token)?;
        if claims.sub.is_empty() {
            return Err(AuthError::Invalid("empty subject".to_string()));
        }
        Ok(Principal::new(claims.sub, claims.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-test-secret-test-secret";

    #[tokio::test]
    async fn test_issue_and_resolve() {
        let resolver = JwtIdentityResolver::new(SECRET);
        let token = resolver.issue_token(&Principal::kitchen("k-1")).unwrap();
        let principal = resolver.resolve(&token).await.unwrap();
        assert_eq!(principal, Principal::kitchen("k-1"));
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let issuer = JwtIdentityResolver::new("another-secret-another-secret-xx");
        let token = issuer.issue_token(&Principal::customer("c-1")).unwrap();
        let resolver = JwtIdentityResolver::new(SECRET);
        assert!(matches!(
            resolver.resolve(&token).await,
            Err(AuthError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let resolver = JwtIdentityResolver::new(SECRET).with_ttl(Duration::minutes(-10));
        let token = resolver.issue_token(&Principal::customer("c-1")).unwrap();
        assert!(matches!(resolver.resolve(&token).await, Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn test_legacy_user_role() {
        let resolver = JwtIdentityResolver::new(SECRET);
        let now = Utc::now().timestamp();
        let claims = serde_json::json!({
            "sub": "c-7",
            "role": "user",
            "exp": now + 600,
            "iat": now,
        });
        let token = encode(&Header::default(), &claims, &resolver.encoding_key).unwrap();
        let principal = resolver.resolve(&token).await.unwrap();
        assert_eq!(principal.role, Role::Customer);
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let resolver = JwtIdentityResolver::new(SECRET);
        assert!(resolver.resolve("not-a-jwt").await.is_err());
    }
}
