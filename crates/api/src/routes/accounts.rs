use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tradechat_core::{AppError, ExchangeAccount};
use tradechat_db::repos::AccountRepoExt;
use tradechat_db::{Fields, Filters, UnitOfWork};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/binance/accounts", post(create_account).get(list_accounts))
        .route(
            "/binance/accounts/{account_id}",
            get(get_account).delete(delete_account),
        )
}

#[derive(Debug, Deserialize)]
struct AddAccountRequest {
    name: String,
    api_key: String,
    secret_key: String,
    #[serde(default = "default_testnet")]
    testnet: bool,
}

fn default_testnet() -> bool {
    true
}

async fn create_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Json(req): Json<AddAccountRequest>,
) -> ApiResult<(StatusCode, Json<ExchangeAccount>)> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let account = uow
        .exchange_accounts()
        .create(
            Fields::new()
                .set("id", Uuid::new_v4())
                .set("user_id", current.id)
                .set("name", req.name.as_str())
                .set("api_key", req.api_key.as_str())
                .set("api_secret", req.secret_key.as_str())
                .set("testnet", req.testnet)
                .set("is_active", true),
        )
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;

    Ok((StatusCode::CREATED, Json(account)))
}

async fn list_accounts(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
) -> ApiResult<Json<Vec<ExchangeAccount>>> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let accounts = uow
        .exchange_accounts()
        .list_for_user(current.id)
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(Json(accounts))
}

async fn get_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(account_id): Path<Uuid>,
) -> ApiResult<Json<ExchangeAccount>> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let account = uow
        .exchange_accounts()
        .retrieve(Filters::new().eq("pk", account_id))
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;

    if account.user_id != current.id {
        return Err(AppError::PermissionDenied.into());
    }
    Ok(Json(account))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(account_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let account = uow
        .exchange_accounts()
        .retrieve(Filters::new().eq("pk", account_id))
        .await
        .map_err(ApiError::Db)?;
    if account.user_id != current.id {
        return Err(AppError::PermissionDenied.into());
    }
    uow.exchange_accounts()
        .delete(Filters::new().eq("pk", account_id))
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(StatusCode::NO_CONTENT)
}
