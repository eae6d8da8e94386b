//! JWT token generation and validation
//!
//! Tokens identify a single account; the lead service only ever sees the
//! resolved `ObjectId`, never the token.

use bson::oid::ObjectId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::LeadhubError;

/// JWT claims for an authenticated account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account ObjectId, hex-encoded
    pub sub: String,
    /// Account identifier (email)
    pub identifier: String,
    /// Issued-at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Resolved caller identity handed to services
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: ObjectId,
    pub identifier: String,
}

/// Generates and verifies tokens with a shared HMAC secret
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Issue a token for the account; returns the token and its expiry
    pub fn generate_token(
        &self,
        user_id: &ObjectId,
        identifier: &str,
    ) -> Result<(String, u64), LeadhubError> {
        let now = unix_now();
        let exp = now + self.expiry_seconds;
        let claims = Claims {
            sub: user_id.to_hex(),
            identifier: identifier.to_string(),
            iat: now,
            exp,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| LeadhubError::Auth(format!("Failed to sign token: {e}")))?;

        Ok((token, exp))
    }

    /// Verify a token and return its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, LeadhubError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| LeadhubError::Auth(format!("Invalid or expired token: {e}")))
    }

    /// Verify a token and resolve the caller identity
    pub fn resolve_caller(&self, token: &str) -> Result<Caller, LeadhubError> {
        let claims = self.verify_token(token)?;
        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| LeadhubError::Auth("Malformed subject in token".into()))?;
        Ok(Caller {
            user_id,
            identifier: claims.identifier,
        })
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_round_trip() {
        let jwt = JwtValidator::new("test-secret", 3600);
        let id = ObjectId::new();
        let (token, exp) = jwt.generate_token(&id, "alice@example.com").unwrap();

        assert!(exp > unix_now());

        let caller = jwt.resolve_caller(&token).unwrap();
        assert_eq!(caller.user_id, id);
        assert_eq!(caller.identifier, "alice@example.com");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let jwt = JwtValidator::new("secret-a", 3600);
        let (token, _) = jwt.generate_token(&ObjectId::new(), "a@b.c").unwrap();

        let other = JwtValidator::new("secret-b", 3600);
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = JwtValidator::new("test-secret", 3600);
        let now = unix_now();
        // Expired an hour ago, outside jsonwebtoken's default leeway
        let claims = Claims {
            sub: ObjectId::new().to_hex(),
            identifier: "a@b.c".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(jwt.verify_token(&token).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header(Some("Bearer abc")), Some("abc"));
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
