//! # Owner identity service
//!
//! Callers are anonymous. Each one gets an opaque owner id on its first
//! request, carried afterwards in a signed JWT cookie.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::Claims,
};

// =====================================
// Auth Service
// =====================================
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: chrono::Duration,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl AuthService {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_secret(&config.secret_key, config.token_ttl())
    }

    #[must_use]
    pub fn with_secret(secret: &str, ttl: chrono::Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Sign a token for `user_id`.
    pub fn issue(&self, user_id: &str) -> Result<String> {
        let claims = Claims::new(user_id, self.ttl);
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    /// `Unauthorized` for a bad signature, a malformed token, an expired
    /// token or an empty owner id.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                warn!(error = %e, "Token verification failed");
                AppError::Unauthorized("Invalid token".to_string())
            })?;

        if data.claims.is_expired() {
            return Err(AppError::Unauthorized("Token expired".to_string()));
        }
        if data.claims.user_id.is_empty() {
            return Err(AppError::Unauthorized("Token has no owner".to_string()));
        }

        Ok(data.claims)
    }

    /// Fresh owner id and its token.
    pub fn new_owner(&self) -> Result<(String, String)> {
        let user_id = Uuid::new_v4().to_string();
        let token = self.issue(&user_id)?;
        debug!(%user_id, "Issued new owner token");

        Ok((user_id, token))
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthService {
        AuthService::with_secret("test-secret", chrono::Duration::hours(1))
    }

    #[test]
    fn test_issue_then_verify() {
        let auth = auth();
        let (user_id, token) = auth.new_owner().unwrap();

        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let token = AuthService::with_secret("other", chrono::Duration::hours(1))
            .issue("owner")
            .unwrap();

        assert!(matches!(auth().verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(auth().verify("not-a-jwt"), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_owner_ids_are_unique() {
        let auth = auth();
        let (a, _) = auth.new_owner().unwrap();
        let (b, _) = auth.new_owner().unwrap();
        assert_ne!(a, b);
    }
}
