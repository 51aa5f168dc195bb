//! Token issuance/verification and the authenticated-principal extractor.
//!
//! Every scoped operation takes the principal as an explicit value; nothing
//! in the service layer reads auth state ambiently. Handlers obtain the
//! principal through the [`AuthUser`] extractor, which verifies the Bearer
//! token and confirms the user still exists.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::TokenPair;

use crate::error::AppError;
use crate::rest::AppState;

const ACCESS_TTL_SECS: i64 = 60 * 60;
const REFRESH_TTL_SECS: i64 = 60 * 60 * 24 * 7;

const ACCESS_TOKEN: &str = "access";
const REFRESH_TOKEN: &str = "refresh";

/// The authenticated principal making a request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
    token_type: String,
}

/// Issues and verifies the access/refresh token pair. The `token_type`
/// claim keeps a refresh token from being replayed as an access token.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue_pair(&self, user_id: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.issue(user_id, ACCESS_TOKEN, ACCESS_TTL_SECS)?,
            refresh: self.issue(user_id, REFRESH_TOKEN, REFRESH_TTL_SECS)?,
        })
    }

    /// Exchange a valid refresh token for a fresh access token.
    pub fn refresh_access(&self, refresh_token: &str) -> Result<String, AppError> {
        let user_id = self.verify(refresh_token, REFRESH_TOKEN)?;
        self.issue(&user_id, ACCESS_TOKEN, ACCESS_TTL_SECS)
    }

    /// Verify an access token and return the user id it was issued to.
    pub fn verify_access(&self, token: &str) -> Result<String, AppError> {
        self.verify(token, ACCESS_TOKEN)
    }

    fn issue(&self, user_id: &str, token_type: &str, ttl_secs: i64) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now().timestamp() + ttl_secs) as usize,
            token_type: token_type.to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    fn verify(&self, token: &str, expected_type: &str) -> Result<String, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))?;
        if data.claims.token_type != expected_type {
            return Err(AppError::Authentication("Invalid token type".to_string()));
        }
        Ok(data.claims.sub)
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Authentication(
                    "Authentication credentials were not provided".to_string(),
                )
            })?;
        let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Authentication("Invalid authorization header".to_string())
        })?;
        let user_id = state.tokens.verify_access(token)?;
        state
            .users
            .find_principal(&user_id)
            .await?
            .ok_or_else(|| AppError::Authentication("User no longer exists".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips() {
        let tokens = TokenService::new("test-secret");
        let pair = tokens.issue_pair("user-1").unwrap();
        assert_eq!(tokens.verify_access(&pair.access).unwrap(), "user-1");
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let tokens = TokenService::new("test-secret");
        let pair = tokens.issue_pair("user-1").unwrap();
        assert!(tokens.verify_access(&pair.refresh).is_err());
    }

    #[test]
    fn refresh_yields_a_working_access_token() {
        let tokens = TokenService::new("test-secret");
        let pair = tokens.issue_pair("user-1").unwrap();
        let access = tokens.refresh_access(&pair.refresh).unwrap();
        assert_eq!(tokens.verify_access(&access).unwrap(), "user-1");
    }

    #[test]
    fn access_token_cannot_be_used_to_refresh() {
        let tokens = TokenService::new("test-secret");
        let pair = tokens.issue_pair("user-1").unwrap();
        assert!(tokens.refresh_access(&pair.access).is_err());
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let tokens = TokenService::new("test-secret");
        let other = TokenService::new("other-secret");
        let pair = other.issue_pair("user-1").unwrap();
        assert!(tokens.verify_access(&pair.access).is_err());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash));
        assert!(!verify_password("wrong-password", &hash));
        assert!(!verify_password("hunter2hunter2", "not-a-phc-string"));
    }
}
