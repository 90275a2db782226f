//! # Owner identity
//!
//! Claims carried by the anonymous owner token. The token is issued on the
//! first request without one and identifies the owner afterwards.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// JWT claims of an owner token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Opaque owner id
    pub user_id: String,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// Issued at
    pub iat: i64,
}

impl Claims {
    #[must_use]
    pub fn new(user_id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            user_id: user_id.into(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_expiration() {
        let claims = Claims::new("owner-1", Duration::hours(1));
        assert!(!claims.is_expired());

        let expired = Claims {
            user_id: "owner-1".to_string(),
            exp: Utc::now().timestamp() - 3600,
            iat: Utc::now().timestamp() - 7200,
        };
        assert!(expired.is_expired());
    }
}
