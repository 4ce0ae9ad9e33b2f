use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (user identifier)
    pub jti: String, // JWT ID (unique per token)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    pub iss: String, // Issuer
}

/// Token verification failure.
///
/// Expiry is kept distinct from every other failure so clients can be told
/// to re-authenticate rather than guess; both map to 401.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Signs and verifies bearer tokens with the shared HS256 secret.
///
/// Verification is a pure function of the token and the clock; no side
/// effects, no I/O.
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl_secs: i64,
    issuer: String,
}

impl AuthManager {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_token_ttl_secs: config.access_token_ttl_secs,
            issuer: config.jwt_issuer.clone(),
        }
    }

    /// Create an access token for `subject`. Returns the token and its
    /// expiry timestamp (Unix epoch seconds).
    pub fn create_token(&self, subject: &str) -> Result<(String, i64)> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_ttl_secs);

        let claims = Claims {
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to encode JWT token")?;

        Ok((token, exp.timestamp()))
    }

    /// Verify a bearer token's signature, expiry and issuer.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.clone()]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                // Signature, parse and every other decoding failure are
                // deliberately indistinguishable to the caller
                _ => AuthError::Invalid,
            })
    }
}
