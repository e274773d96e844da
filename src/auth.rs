/// Authentication extractors and credential utilities
use crate::{
    context::AppContext,
    db::models::User,
    error::{ApiError, ApiResult},
    metrics,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use rand::RngCore;

/// Header carrying the caller's API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Random bytes behind each API key
const API_KEY_BYTES: usize = 32;

/// Extract the API key header, if present and valid UTF-8
pub fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Authenticated caller, resolved from `x-api-key`.
///
/// Handlers taking this extractor are protected; a missing or unknown key
/// rejects the request with 401 before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let Some(api_key) = extract_api_key(&parts.headers) else {
            metrics::record_auth_failure("missing");
            return Err(ApiError::Authentication("API key required".to_string()));
        };

        match state.store.get_user_by_api_key(api_key).await? {
            Some(user) => {
                tracing::debug!(user_id = user.id, "authenticated request");
                Ok(AuthUser { user })
            }
            None => {
                metrics::record_auth_failure("invalid");
                tracing::debug!("rejected unknown API key");
                Err(ApiError::Authentication("Invalid API key".to_string()))
            }
        }
    }
}

/// Generate a fresh API key: 32 random bytes, hex-encoded
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a password into an Argon2id PHC string
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{PasswordHash, PasswordVerifier};
    use axum::http::HeaderValue;
    use std::collections::HashSet;

    #[test]
    fn test_api_key_format() {
        let key = generate_api_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, key.to_lowercase());
    }

    #[test]
    fn test_api_keys_are_unique() {
        let keys: HashSet<String> = (0..100).map(|_| generate_api_key()).collect();
        assert_eq!(keys.len(), 100);
    }

    #[test]
    fn test_extract_api_key() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers), None);

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("  abc123 "));
        assert_eq!(extract_api_key(&headers), Some("abc123"));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static(""));
        assert_eq!(extract_api_key(&headers), None);
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));

        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default()
            .verify_password(b"correct horse", &parsed)
            .is_ok());
        assert!(Argon2::default()
            .verify_password(b"wrong", &parsed)
            .is_err());
    }
}
