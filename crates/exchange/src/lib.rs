//! Binance exchange adapter.
//!
//! Thin async REST wrapper over the spot API: account data, ticker prices,
//! and the order lifecycle. Signed endpoints use HMAC-SHA256 request
//! signing; the testnet switch redirects everything at the base URL.

pub mod client;
pub mod models;

pub use client::{BinanceClient, BinanceConfig};
pub use models::*;

use serde::Deserialize;

/// Errors from exchange calls.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[from] reqwest::Error),
    #[error("Exchange rejected the request ({code}): {msg}")]
    Api { code: i64, msg: String },
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Binance error payload (`{"code": -1121, "msg": "Invalid symbol."}`).
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}
