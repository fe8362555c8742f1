use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub email: String,
    pub user_type: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, user_type: String) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            email,
            user_type,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
}

fn secret() -> Result<&'static str, JwtError> {
    let secret = config::config().security.jwt_secret.as_str();
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    Ok(secret)
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let encoding_key = EncodingKey::from_secret(secret()?.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_jwt(token: &str) -> Result<Claims, JwtError> {
    let decoding_key = DecodingKey::from_secret(secret()?.as_bytes());

    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash a password as `sha256$<salt>$<hex digest of salt + password>`
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = sha256_hex(&format!("{}{}", salt, password));
    format!("sha256${}${}", salt, digest)
}

/// Verify against a salted hash, or a bare 64-char SHA-256 hex digest
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split('$').collect::<Vec<_>>().as_slice() {
        ["sha256", salt, digest] => sha256_hex(&format!("{}{}", salt, password)) == *digest,
        [legacy] if legacy.len() == 64 => sha256_hex(password).eq_ignore_ascii_case(legacy),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salted_hash_verifies() {
        let stored = hash_password("hunter22");
        assert!(stored.starts_with("sha256$"));
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
        assert_ne!(hash_password("hunter22"), stored);
    }

    #[test]
    fn legacy_digest_verifies() {
        let legacy = sha256_hex("secret123");
        assert!(verify_password("secret123", &legacy));
        assert!(!verify_password("secret124", &legacy));
        assert!(!verify_password("secret123", "garbage"));
    }

    #[test]
    fn token_round_trip() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "a@b.co".to_string(), "staff".to_string());
        let token = generate_jwt(&claims).unwrap();
        let decoded = decode_jwt(&token).unwrap();
        assert_eq!(decoded.sub, user_id);
        assert_eq!(decoded.user_type, "staff");
    }

    #[test]
    fn expired_token_is_reported() {
        let mut claims = Claims::new(Uuid::new_v4(), "a@b.co".to_string(), "staff".to_string());
        claims.exp = Utc::now().timestamp() - 3600;
        let token = generate_jwt(&claims).unwrap();
        assert!(matches!(decode_jwt(&token), Err(JwtError::Expired)));
        assert!(matches!(decode_jwt("not.a.token"), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn jwt_errors_display_and_box() {
        assert_eq!(JwtError::Expired.to_string(), "Token has expired");
        assert_eq!(JwtError::Invalid("bad sig".into()).to_string(), "Invalid token: bad sig");
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(JwtError::InvalidSecret);
        assert_eq!(boxed.to_string(), "Invalid JWT secret");
    }
}
