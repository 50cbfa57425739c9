//! JWT token generation and validation
//!
//! Tokens are stateless HS256 JWTs with an embedded expiry claim, verified on
//! every use. No server-side token set is kept, so tokens survive process
//! restarts and multiple instances can validate each other's tokens as long
//! as they share a secret.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::PermissionLevel;
use crate::types::{ArbolError, Result};

/// Claims embedded in an arbol token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id (stringified row id)
    pub sub: String,
    /// Display name at issue time
    pub name: String,
    /// Permission level granted to this token
    pub role: PermissionLevel,
    /// Issued-at (Unix seconds)
    pub iat: u64,
    /// Expiry (Unix seconds)
    pub exp: u64,
}

impl Claims {
    /// Parse the subject back into a user row id.
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse::<i64>()
            .map_err(|_| ArbolError::Auth("malformed token subject".into()))
    }

    pub fn is_admin(&self) -> bool {
        self.role >= PermissionLevel::Admin
    }
}

/// Issues and validates HS256 tokens with a fixed expiry window.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl TokenIssuer {
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Generate a token for a user.
    pub fn generate_token(
        &self,
        user_id: i64,
        name: &str,
        role: PermissionLevel,
    ) -> Result<(String, Claims)> {
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: user_id.to_string(),
            name: name.to_string(),
            role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ArbolError::Auth(format!("failed to generate token: {e}")))?;

        Ok((token, claims))
    }

    /// Validate a token and return its claims.
    ///
    /// Expired or tampered tokens fail with an `Auth` error.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| ArbolError::Auth(format!("invalid token: {e}")))
    }
}

/// Extract a bearer token from an `Authorization` header value.
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", 3600)
    }

    #[test]
    fn test_round_trip() {
        let issuer = issuer();
        let (token, issued) = issuer
            .generate_token(42, "maria", PermissionLevel::Authenticated)
            .unwrap();

        let claims = issuer.verify_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.name, "maria");
        assert_eq!(claims.role, PermissionLevel::Authenticated);
        assert_eq!(claims.exp, issued.exp);
        assert!(!claims.is_admin());
    }

    #[test]
    fn test_admin_claim() {
        let issuer = issuer();
        let (token, _) = issuer
            .generate_token(1, "admin", PermissionLevel::Admin)
            .unwrap();
        assert!(issuer.verify_token(&token).unwrap().is_admin());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (token, _) = issuer()
            .generate_token(7, "maria", PermissionLevel::Authenticated)
            .unwrap();

        let other = TokenIssuer::new("different-secret", 3600);
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = issuer();
        let (mut token, _) = issuer
            .generate_token(7, "maria", PermissionLevel::Authenticated)
            .unwrap();
        token.push('x');
        assert!(issuer.verify_token(&token).is_err());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(extract_token_from_header(Some("Basic abc")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
