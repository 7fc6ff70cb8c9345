use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tradechat_core::{AppError, User};
use tradechat_db::repos::UserRepoExt;
use tradechat_db::UnitOfWork;

use crate::error::ApiError;
use crate::state::AppState;

pub const ACCESS_TOKEN: &str = "access";
pub const REFRESH_TOKEN: &str = "refresh";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User email.
    pub sub: String,
    pub exp: i64,
    pub token_type: String,
}

/// Issue a signed token for `email`.
pub fn create_token(
    email: &str,
    token_type: &str,
    expire_minutes: i64,
    secret: &str,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: email.to_string(),
        exp: (Utc::now() + Duration::minutes(expire_minutes)).timestamp(),
        token_type: token_type.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::InvalidSignature)
}

/// Verify a token's signature and expiry and return its claims.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidSignature,
    })
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|_| AppError::bad_request("could not hash password"))
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    bcrypt::verify(password, hashed).unwrap_or(false)
}

/// The authenticated, active user behind the request's bearer token.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::App(AppError::InvalidCredentials))?;

        let claims = decode_token(bearer.token(), &state.config.auth_secret)?;
        if claims.token_type != ACCESS_TOKEN {
            return Err(AppError::InvalidSignature.into());
        }

        let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
        let user = uow
            .users()
            .get_by_email(&claims.sub)
            .await
            .map_err(ApiError::Db)?
            .ok_or(AppError::InvalidCredentials)?;
        uow.commit().await.map_err(ApiError::Db)?;

        if !user.is_active {
            return Err(AppError::AccountDisabled.into());
        }
        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let token = create_token("test@example.com", ACCESS_TOKEN, 15, "secret").unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "test@example.com");
        assert_eq!(claims.token_type, ACCESS_TOKEN);
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let token = create_token("test@example.com", ACCESS_TOKEN, 15, "secret").unwrap();
        let err = decode_token(&token, "other").unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));
    }

    #[test]
    fn test_expired_token_is_reported_expired() {
        let token = create_token("test@example.com", ACCESS_TOKEN, -5, "secret").unwrap();
        let err = decode_token(&token, "secret").unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[test]
    fn test_password_hash_verify_roundtrip() {
        let hashed = hash_password("hunter2!").unwrap();
        assert!(verify_password("hunter2!", &hashed));
        assert!(!verify_password("hunter3!", &hashed));
    }
}
