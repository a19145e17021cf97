//! Supabase JWT validation

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Audience Supabase stamps on signed-in user tokens
pub const SUPABASE_AUDIENCE: &str = "authenticated";

const CLOCK_SKEW_SECS: u64 = 60;

/// Claims carried by a Supabase access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseClaims {
    /// Supabase user id, a UUID string
    pub sub: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub aud: Option<String>,
    pub iat: Option<i64>,
    pub exp: i64,
}

/// Validates Supabase-issued access tokens
#[derive(Clone)]
pub struct JwtManager {
    key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    pub fn new(supabase_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_SECS;
        validation.set_audience(&[SUPABASE_AUDIENCE]);

        Self {
            key: DecodingKey::from_secret(supabase_secret.as_bytes()),
            validation,
        }
    }

    /// Decode and check a bearer token: signature, expiry and audience
    pub fn validate_supabase_token(&self, token: &str) -> Result<SupabaseClaims, JwtError> {
        let data = decode::<SupabaseClaims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Token validation failed: {0}")]
    Validation(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidAudience => {
                tracing::warn!("Bearer token issued for another audience");
                JwtError::Invalid
            }
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => JwtError::Invalid,
            _ => JwtError::Validation(err.to_string()),
        }
    }
}
