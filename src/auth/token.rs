use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a session token was rejected or could not be produced
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("token is malformed")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token subject is not a valid user id")]
    InvalidSubject,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Registered claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, stringified
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Issues and validates HS256 session tokens.
///
/// Built once at startup from the configured secret; holds no mutable state.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Default lifetime of issued tokens
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject_id` using the configured lifetime
    pub fn issue_default(&self, subject_id: i64) -> Result<String, AuthError> {
        self.issue(subject_id, self.ttl)
    }

    pub fn issue(&self, subject_id: i64, ttl: Duration) -> Result<String, AuthError> {
        self.issue_at(subject_id, ttl, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject_id: i64,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Signing(format!("token lifetime out of range: {}", ttl)))?;
        let claims = Claims {
            sub: subject_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Validate a token and return the user id it was issued for
    pub fn validate(&self, token: &str) -> Result<i64, AuthError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, AuthError> {
        // Expiry is checked below against `now` with zero leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Malformed,
            }
        })?;

        if data.claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }

        parse_subject(&data.claims.sub)
    }
}

fn parse_subject(sub: &str) -> Result<i64, AuthError> {
    match sub.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AuthError::InvalidSubject),
    }
}
