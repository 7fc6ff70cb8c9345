use sqlx::PgPool;
use std::sync::Arc;
use tradechat_agent::CompletionClient;
use tradechat_core::ExchangeAccount;
use tradechat_exchange::{BinanceClient, BinanceConfig};

use crate::config::ApiConfig;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    pub pool: PgPool,
    pub config: ApiConfig,
    /// Completion backend shared by every conversation.
    pub llm: Arc<dyn CompletionClient>,
}

impl AppState {
    pub fn new(pool: PgPool, config: ApiConfig, llm: Arc<dyn CompletionClient>) -> Self {
        Self { pool, config, llm }
    }

    /// Exchange client for a user's linked account, falling back to the
    /// configured credentials when none is linked.
    pub fn exchange_client(&self, account: Option<&ExchangeAccount>) -> BinanceClient {
        let config = match account {
            Some(account) => BinanceConfig {
                api_key: account.api_key.clone(),
                api_secret: account.api_secret.clone(),
                testnet: account.testnet,
            },
            None => self.config.exchange.clone(),
        };
        BinanceClient::new(config)
    }
}
