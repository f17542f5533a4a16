//! Session tokens and password hashing.
//!
//! Tokens are stateless HS256 JWTs carrying `{id, email, role, iat, exp}`.
//! Logging out is the client discarding its token.

use chrono::{Duration, Utc};
use harmony_core::{Role, User};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("secret", &"[redacted]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenKeys {
    /// `ttl_days` is capped at the longest lifetime the config loader accepts.
    #[must_use]
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        let ttl_days = ttl_days.min(harmony_core::config::MAX_TOKEN_TTL_DAYS);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    /// # Errors
    ///
    /// Returns [`AuthError::Token`] if signing fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verifies signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Token`] for a malformed, forged, or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(data.claims)
    }
}

/// Lowest cost bcrypt accepts; keeps hashing fast in tests.
#[cfg(test)]
pub(crate) const TEST_COST: u32 = 4;

/// # Errors
///
/// Returns [`AuthError::Hash`] if bcrypt fails.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// # Errors
///
/// Returns [`AuthError::Hash`] if `hash` is not a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    Ok(bcrypt::verify(password, hash)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Siti".to_string(),
            email: "siti@example.com".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let keys = TokenKeys::new("test-secret", 7);
        let user = user(Role::Admin);
        let token = keys.issue(&user).expect("issue");
        let claims = keys.verify(&token).expect("verify");

        assert_eq!(claims.id, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = TokenKeys::new("one", 7)
            .issue(&user(Role::User))
            .expect("issue");
        assert!(TokenKeys::new("two", 7).verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new("test-secret", -2);
        let token = keys.issue(&user(Role::User)).expect("issue");
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn oversized_ttl_is_capped_instead_of_overflowing() {
        let keys = TokenKeys::new("test-secret", i64::MAX);
        let token = keys.issue(&user(Role::User)).expect("issue");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(
            claims.exp - claims.iat,
            harmony_core::config::MAX_TOKEN_TTL_DAYS * 24 * 60 * 60
        );
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("rahasia123", TEST_COST).expect("hash");
        assert!(verify_password("rahasia123", &hash).expect("verify"));
        assert!(!verify_password("salah", &hash).expect("verify"));
    }
}
