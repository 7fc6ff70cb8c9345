use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tradechat_core::{AppError, BotActivity, TradingBot};
use tradechat_db::paginator::Page;
use tradechat_db::repos::{BotActivityRepoExt, BotRepoExt};
use tradechat_db::{Fields, Filters, UnitOfWork, Value};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::pagination::PageQuery;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/trading-bots", post(create_bot).get(list_bots))
        .route(
            "/trading-bots/{bot_id}",
            get(get_bot).patch(update_bot).delete(delete_bot),
        )
        .route("/trading-bots/{bot_id}/activities", get(list_activities))
}

#[derive(Debug, Deserialize)]
struct TradingBotCreate {
    exchange_account_id: Uuid,
    name: String,
    #[serde(default)]
    tickers: Vec<String>,
    base_prompt: Option<String>,
    additional_notes: Option<String>,
    risk_tolerance: i32,
    target_profit: i32,
}

async fn create_bot(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Json(req): Json<TradingBotCreate>,
) -> ApiResult<(StatusCode, Json<TradingBot>)> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;

    // The bot must point at an exchange account the caller owns.
    let account = uow
        .exchange_accounts()
        .retrieve(Filters::new().eq("pk", req.exchange_account_id))
        .await
        .map_err(ApiError::Db)?;
    if account.user_id != current.id {
        return Err(AppError::PermissionDenied.into());
    }

    let bot = uow
        .trading_bots()
        .create(
            Fields::new()
                .set("id", Uuid::new_v4())
                .set("user_id", current.id)
                .set("exchange_account_id", req.exchange_account_id)
                .set("name", req.name.as_str())
                .set("is_active", false)
                .set("tickers", req.tickers.clone())
                .set("base_prompt", req.base_prompt.clone())
                .set("additional_notes", req.additional_notes.clone())
                .set("risk_tolerance", req.risk_tolerance)
                .set("target_profit", req.target_profit),
        )
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;

    Ok((StatusCode::CREATED, Json(bot)))
}

async fn list_bots(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<TradingBot>>> {
    let query = query.validate()?;
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let page = uow
        .trading_bots()
        .list_page(current.id, query.page, query.per_page)
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(Json(page))
}

async fn get_bot(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(bot_id): Path<Uuid>,
) -> ApiResult<Json<TradingBot>> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let bot = uow
        .trading_bots()
        .retrieve(Filters::new().eq("pk", bot_id).eq("user_id", current.id))
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(Json(bot))
}

#[derive(Debug, Deserialize)]
struct TradingBotUpdate {
    name: Option<String>,
    is_active: Option<bool>,
    tickers: Option<Vec<String>>,
    base_prompt: Option<String>,
    additional_notes: Option<String>,
    risk_tolerance: Option<i32>,
    target_profit: Option<i32>,
}

impl TradingBotUpdate {
    /// Only the provided fields are written; everything else stays put.
    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        if let Some(name) = &self.name {
            fields = fields.set("name", name.as_str());
        }
        if let Some(is_active) = self.is_active {
            fields = fields.set("is_active", is_active);
        }
        if let Some(tickers) = &self.tickers {
            fields = fields.set("tickers", tickers.clone());
        }
        if let Some(base_prompt) = &self.base_prompt {
            fields = fields.set("base_prompt", base_prompt.as_str());
        }
        if let Some(additional_notes) = &self.additional_notes {
            fields = fields.set("additional_notes", additional_notes.as_str());
        }
        if let Some(risk_tolerance) = self.risk_tolerance {
            fields = fields.set("risk_tolerance", risk_tolerance);
        }
        if let Some(target_profit) = self.target_profit {
            fields = fields.set("target_profit", target_profit);
        }
        fields.set("updated_at", Value::Timestamp(chrono::Utc::now()))
    }
}

async fn update_bot(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(bot_id): Path<Uuid>,
    Json(req): Json<TradingBotUpdate>,
) -> ApiResult<Json<TradingBot>> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let bot = uow
        .trading_bots()
        .update(
            Filters::new().eq("pk", bot_id).eq("user_id", current.id),
            req.to_fields(),
        )
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(Json(bot))
}

async fn delete_bot(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(bot_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    uow.trading_bots()
        .delete(Filters::new().eq("pk", bot_id).eq("user_id", current.id))
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_activities(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Path(bot_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<BotActivity>>> {
    let query = query.validate()?;
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    // Ownership gate before exposing the log.
    uow.trading_bots()
        .retrieve(Filters::new().eq("pk", bot_id).eq("user_id", current.id))
        .await
        .map_err(ApiError::Db)?;
    let page = uow
        .bot_activities()
        .list_page(bot_id, query.page, query.per_page)
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    Ok(Json(page))
}
