use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::AppError;
use crate::models::Role;

/// Payload of the HS256 bearer tokens issued by the account service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    /// Expiration, UTC Unix timestamp.
    pub exp: i64,
}

pub fn issue_token(claims: &Claims, config: &JwtConfig) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role {} is not allowed to access this resource.",
                self.role
            )))
        }
    }
}

// Bearer JWT extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Expected a Bearer token".into()))?;

        let claims = verify_token(token, &state.config.jwt)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
        }
    }

    fn claims(exp_in: Duration) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            role: Role::SubAdmin,
            exp: (Utc::now() + exp_in).timestamp(),
        }
    }

    #[test]
    fn issued_tokens_verify() {
        let claims = claims(Duration::hours(1));
        let token = issue_token(&claims, &config()).unwrap();
        let verified = verify_token(&token, &config()).unwrap();
        assert_eq!(verified.sub, claims.sub);
        assert_eq!(verified.role, Role::SubAdmin);
    }

    #[test]
    fn expired_or_foreign_tokens_fail() {
        let expired = issue_token(&claims(Duration::hours(-2)), &config()).unwrap();
        assert!(verify_token(&expired, &config()).is_err());

        let other = JwtConfig {
            secret: "other".into(),
        };
        let foreign = issue_token(&claims(Duration::hours(1)), &other).unwrap();
        assert!(verify_token(&foreign, &config()).is_err());
    }

    #[test]
    fn require_role_checks_membership() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Customer,
        };
        assert!(user.require_role(&[Role::Customer, Role::SubAdmin]).is_ok());
        assert!(matches!(
            user.require_role(&[Role::SuperAdmin]),
            Err(AppError::Forbidden(_))
        ));
    }
}
