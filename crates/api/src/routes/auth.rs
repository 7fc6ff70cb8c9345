use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tradechat_core::AppError;
use tradechat_db::repos::UserRepoExt;
use tradechat_db::UnitOfWork;

use crate::auth::{create_token, decode_token, verify_password, ACCESS_TOKEN, REFRESH_TOKEN};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signin", post(signin))
        .route("/auth/refresh", post(refresh))
}

#[derive(Debug, Deserialize)]
struct SignInRequest {
    email: String,
    password: String,
    #[serde(default)]
    keep_logged_in: bool,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    token_type: &'static str,
}

async fn signin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let user = uow
        .users()
        .get_by_email(&req.email)
        .await
        .map_err(ApiError::Db)?
        .ok_or(AppError::InvalidCredentials)?;
    uow.commit().await.map_err(ApiError::Db)?;

    if !verify_password(&req.password, &user.hashed_password) {
        return Err(AppError::InvalidCredentials.into());
    }
    if !user.is_active {
        return Err(AppError::AccountDisabled.into());
    }

    let config = &state.config;
    let access_token = create_token(
        &user.email,
        ACCESS_TOKEN,
        config.access_expire_minutes,
        &config.auth_secret,
    )?;
    let refresh_token = if req.keep_logged_in {
        Some(create_token(
            &user.email,
            REFRESH_TOKEN,
            config.refresh_expire_minutes,
            &config.auth_secret,
        )?)
    } else {
        None
    };

    Ok(Json(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer",
    }))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let claims = decode_token(&req.refresh_token, &state.config.auth_secret)?;
    if claims.token_type != REFRESH_TOKEN {
        return Err(AppError::InvalidSignature.into());
    }

    let access_token = create_token(
        &claims.sub,
        ACCESS_TOKEN,
        state.config.access_expire_minutes,
        &state.config.auth_secret,
    )?;
    Ok(Json(TokenResponse {
        access_token,
        refresh_token: None,
        token_type: "bearer",
    }))
}
