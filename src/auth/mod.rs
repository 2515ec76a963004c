use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

const BCRYPT_COST: u32 = 10;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token user no longer exists")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            user_id,
            exp,
            iat: now.timestamp(),
        }
    }
}

fn secret() -> Option<&'static [u8]> {
    let secret = &config::config().security.jwt_secret;
    (!secret.is_empty()).then(|| secret.as_bytes())
}

pub fn generate_jwt(user_id: Uuid) -> Result<String, AuthError> {
    let secret = secret().ok_or_else(|| AuthError::Signing("JWT secret not configured".to_string()))?;
    let encoding_key = EncodingKey::from_secret(secret);

    encode(&Header::default(), &Claims::new(user_id), &encoding_key)
        .map_err(|e| AuthError::Signing(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = secret().ok_or_else(|| AuthError::InvalidToken("JWT secret not configured".to_string()))?;
    let decoding_key = DecodingKey::from_secret(secret);

    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// Runs on the blocking pool
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Password reset token: the raw value is mailed, only its digest is stored
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub raw: String,
    pub hashed: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn generate() -> Self {
        let raw = hex::encode(rand::random::<[u8; 20]>());
        let minutes = config::config().security.reset_token_expiry_minutes;
        Self {
            hashed: hash_reset_token(&raw),
            raw,
            expires_at: Utc::now() + Duration::minutes(minutes),
        }
    }
}

pub fn hash_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
