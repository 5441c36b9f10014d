//! HS256 JWT authenticator.
//!
//! Tokens carry `sub` (user id), `username`, `iat` and `exp`. Any decoding
//! or validation failure is reported as `Unauthenticated`.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, Authenticator, Identity, UserId, Username};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issue a token for `identity` valid for `ttl_secs` seconds.
pub fn issue_token(
    secret: &[u8],
    identity: &Identity,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = TokenClaims {
        sub: identity.user_id.as_str().to_string(),
        username: identity.username.as_str().to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::Unauthenticated(e.to_string()))?;
        let user_id = UserId::new(data.claims.sub)
            .map_err(|e| AuthError::Unauthenticated(e.to_string()))?;
        let username = Username::new(data.claims.username)
            .map_err(|e| AuthError::Unauthenticated(e.to_string()))?;
        Ok(Identity::new(user_id, username))
    }
}
