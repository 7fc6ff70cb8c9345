use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tradechat_core::{AppError, User};
use tradechat_db::paginator::{paginate, Page, PaginateOptions};
use tradechat_db::repos::UserRepoExt;
use tradechat_db::{Fields, Filters, UnitOfWork};
use uuid::Uuid;

use crate::auth::{hash_password, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::pagination::PageQuery;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/", post(create_user).get(list_users))
        .route("/users/{user_id}/", delete(delete_user))
        .route("/me/", get(me))
}

#[derive(Debug, Deserialize)]
struct UserCreateRequest {
    email: String,
    password: String,
    full_name: Option<String>,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UserCreateRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let hashed = hash_password(&req.password)?;

    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let user = uow
        .users()
        .create(
            Fields::new()
                .set("id", Uuid::new_v4())
                .set("email", req.email.as_str())
                .set("hashed_password", hashed.as_str())
                .set("full_name", req.full_name.clone())
                .set("is_active", true),
        )
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<User>>> {
    if !current.is_superuser {
        return Err(AppError::PermissionDenied.into());
    }
    let query = query.validate()?;

    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let page = paginate::<User>(
        uow.conn(),
        Filters::new(),
        &["id"],
        query.page,
        query.per_page,
        PaginateOptions::default(),
    )
    .await
    .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;

    Ok(Json(page))
}

async fn me(CurrentUser(current): CurrentUser) -> Json<User> {
    Json(current)
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if user_id != current.id && !current.is_superuser {
        return Err(AppError::PermissionDenied.into());
    }

    // Soft delete: the account is deactivated, never destroyed.
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    uow.users().deactivate(user_id).await.map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;

    Ok(StatusCode::NO_CONTENT)
}
