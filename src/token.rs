use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;

/// Default session lifetime: 7 days.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Claims
///
/// Payload signed into every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id.
    pub sub: String,
    pub email: String,
    /// `teacher` | `student`, kept verbatim so the role gate can compare exactly.
    pub role: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds). Valid only while `now < exp`.
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, malformed structure, or expired. Not distinguished on purpose.
    #[error("invalid token")]
    InvalidToken,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// TokenService
///
/// Issues and verifies stateless HS256 session tokens with the process-wide secret.
/// There is no session table: a token is valid iff its signature checks out and it has
/// not expired. Changing the secret invalidates every outstanding token.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

/// TokenState
///
/// Shared handle to the token service held in `AppState`.
pub type TokenState = Arc<TokenService>;

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &AuthUser) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    /// Issues a token as if the current time were `now` (unix seconds).
    pub fn issue_at(&self, user: &AuthUser, now: i64) -> Result<String, TokenError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now.saturating_add(ttl),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verifies a token against the clock value `now` (unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<AuthUser, TokenError> {
        // Expiry is checked below with a strict `now < exp` and no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::InvalidToken)?;

        if now >= data.claims.exp {
            return Err(TokenError::InvalidToken);
        }

        Ok(AuthUser {
            id: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}
