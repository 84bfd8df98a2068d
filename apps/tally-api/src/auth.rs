//! JWT authentication module.
//!
//! Verifies HS256 bearer tokens on `/api` routes and attaches the caller
//! identity to the request. Login and token issuance belong to a separate
//! identity service; [`JwtManager::generate_access_token`] exists for
//! operators and tests.
//!
//! ```text
//!   Authorization: Bearer <jwt>
//!          │
//!          ▼
//!   require_auth ── secret unset ──► Caller::anonymous()
//!          │
//!          ├── missing / malformed / expired ──► 401 UNAUTHORIZED
//!          │
//!          ▼
//!   Caller { subject, role } in request extensions
//! ```

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const ACCESS_TOKEN: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Role of the user (e.g. "admin", "cashier")
    pub role: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type ("access")
    pub token_type: String,
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    secret: String,
    access_lifetime_secs: i64,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("access_lifetime_secs", &self.access_lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: impl Into<String>, access_lifetime_secs: i64) -> Self {
        JwtManager {
            secret: secret.into(),
            access_lifetime_secs,
        }
    }

    /// Generate an access token.
    pub fn generate_access_token(&self, subject: &str, role: &str) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_lifetime_secs);

        let claims = Claims {
            sub: subject.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN.to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Validate that a token is an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = self.validate_token(token)?;

        if claims.token_type != ACCESS_TOKEN {
            return Err(ApiError::unauthorized("Expected access token"));
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The verified identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub subject: String,
    pub role: String,
}

impl Caller {
    /// Identity used when the gate is disabled.
    pub fn anonymous() -> Self {
        Caller {
            subject: "anonymous".to_string(),
            role: "none".to_string(),
        }
    }
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller {
            subject: claims.sub,
            role: claims.role,
        }
    }
}

/// Middleware guarding `/api`. Always inserts a [`Caller`] extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = match state.jwt.as_deref() {
        None => Caller::anonymous(),
        Some(jwt) => {
            let token = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(extract_bearer_token)
                .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

            let claims = jwt.validate_access_token(token)?;
            debug!(subject = %claims.sub, role = %claims.role, "Caller authenticated");
            Caller::from(claims)
        }
    };

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret", 3600);
        let token = manager.generate_access_token("user-001", "cashier").unwrap();

        let claims = manager.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, "user-001");
        assert_eq!(claims.role, "cashier");
        assert_eq!(claims.token_type, "access");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtManager::new("secret-a", 3600)
            .generate_access_token("user-001", "admin")
            .unwrap();

        let err = JwtManager::new("secret-b", 3600)
            .validate_access_token(&token)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret", -3600);
        let token = manager.generate_access_token("user-001", "admin").unwrap();
        assert!(manager.validate_access_token(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer   "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
