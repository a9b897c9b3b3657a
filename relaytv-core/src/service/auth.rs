//! Subscriber authentication: bearer tokens and password verification.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::task;

use crate::{
    models::{Profile, ProfileRole, UserId},
    Error, Result,
};

/// Bearer token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub username: String,
    /// Account role (admin, user)
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::from_string(self.sub.clone())
    }

    pub fn role(&self) -> Result<ProfileRole> {
        ProfileRole::from_str(&self.role)
            .map_err(|_| Error::Internal(format!("Invalid role in token: {}", self.role)))
    }
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    token_duration_hours: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &Algorithm::HS256)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], token_duration_hours: u64) -> Result<Self> {
        if secret.len() < 32 {
            return Err(Error::Configuration(
                "Token signing secret must be at least 32 bytes".to_string(),
            ));
        }
        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            token_duration_hours: i64::try_from(token_duration_hours).unwrap_or(24),
        })
    }

    /// Issue a bearer token for a resolved profile.
    pub fn issue(&self, profile: &Profile) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: profile.id.to_string(),
            username: profile.username.clone(),
            role: profile.role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.token_duration_hours)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify a bearer token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Authentication(format!("Invalid token: {e}")))
    }
}

/// Hash a password with Argon2id. CPU-intensive; runs on a blocking thread.
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();

    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {e}")))?
            .to_string();

        Ok(password_hash)
    })
    .await
    .map_err(|e| Error::Internal(format!("Password hashing task failed: {e}")))?
}

/// Verify a password against a stored hash. CPU-intensive; runs on a
/// blocking thread.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();

    task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| Error::Internal(format!("Invalid password hash: {e}")))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| Error::Internal(format!("Password verification task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileStatus;

    fn test_profile() -> Profile {
        Profile {
            id: UserId::from_string("user00000001".to_string()),
            username: "alice".to_string(),
            password_hash: String::new(),
            status: ProfileStatus::Active,
            role: ProfileRole::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_service() -> TokenService {
        TokenService::new(b"0123456789abcdef0123456789abcdef", 24).unwrap()
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let service = test_service();
        let token = service.issue(&test_profile()).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "user00000001");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role().unwrap(), ProfileRole::User);
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let service = test_service();
        assert!(matches!(
            service.verify("not-a-token"),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let token = test_service().issue(&test_profile()).unwrap();
        let other = TokenService::new(b"ffffffffffffffffffffffffffffffff", 24).unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            TokenService::new(b"short", 24),
            Err(Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let hash = hash_password("hunter2").await.unwrap();
        assert!(verify_password("hunter2", &hash).await.unwrap());
        assert!(!verify_password("hunter3", &hash).await.unwrap());
    }
}
