use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Capability token letting a customer cancel their own booking without a
/// login session. Binds booking id + email, expires after 7 days.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CancellationClaims {
    pub booking_id: Uuid,
    pub email: String,
    pub typ: String,
    pub exp: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid or expired cancellation token")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("Token is not a cancellation token")]
    WrongType,
}

#[derive(Clone)]
pub struct CancellationTokens {
    secret: String,
    ttl: Duration,
}

impl CancellationTokens {
    pub fn new(secret: String, ttl_days: i64) -> Self {
        Self {
            secret,
            ttl: Duration::days(ttl_days),
        }
    }

    pub fn issue(
        &self,
        booking_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = CancellationClaims {
            booking_id,
            email: email.to_string(),
            typ: "cancellation".to_string(),
            exp: (now + self.ttl).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<CancellationClaims, TokenError> {
        let data = decode::<CancellationClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        if data.claims.typ != "cancellation" {
            return Err(TokenError::WrongType);
        }
        Ok(data.claims)
    }
}
