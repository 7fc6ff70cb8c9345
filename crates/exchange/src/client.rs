use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Method;
use serde::de::DeserializeOwned;
use sha2::Sha256;

use crate::models::{AccountInfo, OrderInfo, OrderRequest, RecentTrade, TickerPrice};
use crate::{ApiErrorBody, ExchangeError};

const MAINNET_URL: &str = "https://api.binance.com";
const TESTNET_URL: &str = "https://testnet.binance.vision";
const RECV_WINDOW_MS: u64 = 5000;

/// Credentials and environment for one exchange account.
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub api_key: String,
    pub api_secret: String,
    pub testnet: bool,
}

/// Async Binance spot REST client (HTTP direct, no vendor SDK).
pub struct BinanceClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl BinanceClient {
    pub fn new(config: BinanceConfig) -> Self {
        let base_url = if config.testnet { TESTNET_URL } else { MAINNET_URL };
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
            api_key: config.api_key,
            api_secret: config.api_secret,
        }
    }

    /// Override the base URL (test servers, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    // -----------------------------------------------------------------------
    // Account & market data
    // -----------------------------------------------------------------------

    /// Account snapshot including balances.
    pub async fn get_account(&self) -> Result<AccountInfo, ExchangeError> {
        self.signed_request(Method::GET, "/api/v3/account", Vec::new())
            .await
    }

    /// Latest price for one trading pair.
    pub async fn get_ticker_price(&self, symbol: &str) -> Result<TickerPrice, ExchangeError> {
        self.public_request(
            "/api/v3/ticker/price",
            vec![("symbol".to_string(), symbol.to_string())],
        )
        .await
    }

    /// Latest prices for every trading pair.
    pub async fn get_all_tickers(&self) -> Result<Vec<TickerPrice>, ExchangeError> {
        self.public_request("/api/v3/ticker/price", Vec::new()).await
    }

    /// Most recent public trades for a symbol.
    pub async fn get_recent_trades(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<RecentTrade>, ExchangeError> {
        self.public_request(
            "/api/v3/trades",
            vec![
                ("symbol".to_string(), symbol.to_string()),
                ("limit".to_string(), limit.to_string()),
            ],
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Order lifecycle
    // -----------------------------------------------------------------------

    /// Submit an order.
    pub async fn place_order(&self, order: &OrderRequest) -> Result<OrderInfo, ExchangeError> {
        tracing::info!(symbol = %order.symbol, side = order.side.as_str(), "placing order");
        self.signed_request(Method::POST, "/api/v3/order", order.to_params())
            .await
    }

    /// Cancel a working order.
    pub async fn cancel_order(
        &self,
        symbol: &str,
        order_id: i64,
    ) -> Result<OrderInfo, ExchangeError> {
        tracing::info!(symbol, order_id, "cancelling order");
        self.signed_request(
            Method::DELETE,
            "/api/v3/order",
            vec![
                ("symbol".to_string(), symbol.to_string()),
                ("orderId".to_string(), order_id.to_string()),
            ],
        )
        .await
    }

    /// Status of one order.
    pub async fn get_order(&self, symbol: &str, order_id: i64) -> Result<OrderInfo, ExchangeError> {
        self.signed_request(
            Method::GET,
            "/api/v3/order",
            vec![
                ("symbol".to_string(), symbol.to_string()),
                ("orderId".to_string(), order_id.to_string()),
            ],
        )
        .await
    }

    /// All working orders, optionally narrowed to one symbol.
    pub async fn get_open_orders(
        &self,
        symbol: Option<&str>,
    ) -> Result<Vec<OrderInfo>, ExchangeError> {
        let params = match symbol {
            Some(symbol) => vec![("symbol".to_string(), symbol.to_string())],
            None => Vec::new(),
        };
        self.signed_request(Method::GET, "/api/v3/openOrders", params)
            .await
    }

    /// Full order history for a symbol.
    pub async fn get_all_orders(&self, symbol: &str) -> Result<Vec<OrderInfo>, ExchangeError> {
        self.signed_request(
            Method::GET,
            "/api/v3/allOrders",
            vec![("symbol".to_string(), symbol.to_string())],
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    async fn public_request<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<T, ExchangeError> {
        let mut url = format!("{}{}", self.base_url, path);
        let query = encode_params(&params);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        let response = self.http.get(&url).send().await?;
        decode_response(response).await
    }

    async fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(String, String)>,
    ) -> Result<T, ExchangeError> {
        params.push(("recvWindow".to_string(), RECV_WINDOW_MS.to_string()));
        params.push((
            "timestamp".to_string(),
            Utc::now().timestamp_millis().to_string(),
        ));
        let query = encode_params(&params);
        let signature = sign(&self.api_secret, &query);
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        let response = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;
        decode_response(response).await
    }
}

/// HMAC-SHA256 over the query string, hex-encoded, as the API requires.
fn sign(secret: &str, query: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ExchangeError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(err) => Err(ExchangeError::Api {
                code: err.code,
                msg: err.msg,
            }),
            Err(_) => Err(ExchangeError::UnexpectedResponse(format!(
                "{status}: {body}"
            ))),
        };
    }
    serde_json::from_str(&body).map_err(|e| ExchangeError::UnexpectedResponse(e.to_string()))
}
