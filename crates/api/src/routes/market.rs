use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tradechat_db::repos::AccountRepoExt;
use tradechat_db::UnitOfWork;
use tradechat_exchange::BinanceClient;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/binance/account", get(account_overview))
        .route("/binance/orders", get(order_history))
}

/// Exchange client bound to the caller's linked account.
async fn client_for(
    state: &Arc<AppState>,
    user_id: uuid::Uuid,
) -> Result<BinanceClient, ApiError> {
    let mut uow = UnitOfWork::begin(&state.pool).await.map_err(ApiError::Db)?;
    let accounts = uow
        .exchange_accounts()
        .list_for_user(user_id)
        .await
        .map_err(ApiError::Db)?;
    uow.commit().await.map_err(ApiError::Db)?;
    let account = accounts.iter().find(|account| account.is_active);
    Ok(state.exchange_client(account))
}

/// Account snapshot with every balance priced against USDT.
///
/// Exchange failures come back as an inline `{"error": …}` payload by
/// convention, never as a raised server error.
async fn account_overview(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
) -> ApiResult<Json<serde_json::Value>> {
    let client = client_for(&state, current.id).await?;

    let account = match client.get_account().await {
        Ok(account) => account,
        Err(e) => return Ok(Json(json!({"error": e.to_string()}))),
    };
    let tickers = match client.get_all_tickers().await {
        Ok(tickers) => tickers,
        Err(e) => return Ok(Json(json!({"error": e.to_string()}))),
    };

    let balances: Vec<serde_json::Value> = account
        .balances
        .iter()
        .map(|balance| {
            let price = if balance.asset == "USDT" {
                Some("1".to_string())
            } else {
                tickers
                    .iter()
                    .find(|t| t.symbol == format!("{}USDT", balance.asset))
                    .map(|t| t.price.to_string())
            };
            json!({
                "asset": balance.asset,
                "free": balance.free,
                "locked": balance.locked,
                "price": price,
            })
        })
        .collect();

    Ok(Json(json!({
        "can_trade": account.can_trade,
        "balances": balances,
    })))
}

#[derive(Debug, Deserialize)]
struct OrderHistoryQuery {
    symbol: String,
}

/// Full order history for one symbol.
async fn order_history(
    State(state): State<Arc<AppState>>,
    CurrentUser(current): CurrentUser,
    Query(query): Query<OrderHistoryQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let client = client_for(&state, current.id).await?;
    match client.get_all_orders(&query.symbol).await {
        Ok(orders) => Ok(Json(json!({"orders": orders}))),
        Err(e) => Ok(Json(json!({"error": e.to_string()}))),
    }
}
