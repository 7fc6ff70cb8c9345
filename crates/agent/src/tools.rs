use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tradechat_exchange::{BinanceClient, OrderRequest, OrderSide, OrderType};

use crate::types::Tool;

/// Executes named tools on the model's behalf.
///
/// By convention every failure — unknown tool, bad arguments, exchange
/// rejection — comes back as an inline `{"error": …}` payload rather than
/// an Err, so the conversation survives and the model can react.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definitions(&self) -> Vec<Tool>;
    async fn execute(&self, name: &str, arguments: Value) -> Value;
}

/// The trading tools backed by one exchange account.
pub struct TradingToolkit {
    client: BinanceClient,
}

#[derive(Debug, Deserialize)]
struct PlaceOrderArgs {
    symbol: String,
    side: OrderSide,
    #[serde(rename = "order_type")]
    order_type: OrderType,
    quantity: f64,
    price: Option<f64>,
    stop_price: Option<f64>,
    #[serde(default = "default_time_in_force")]
    time_in_force: String,
}

fn default_time_in_force() -> String {
    "GTC".to_string()
}

#[derive(Debug, Deserialize)]
struct CheckBalanceArgs {
    asset: String,
}

#[derive(Debug, Deserialize)]
struct SymbolArgs {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct OptionalSymbolArgs {
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderIdArgs {
    symbol: String,
    order_id: i64,
}

#[derive(Debug, Deserialize)]
struct RecentTradesArgs {
    symbol: String,
    #[serde(default = "default_trades_limit")]
    limit: u32,
}

fn default_trades_limit() -> u32 {
    10
}

impl TradingToolkit {
    pub fn new(client: BinanceClient) -> Self {
        Self { client }
    }

    async fn place_order(&self, args: Value) -> Value {
        let args: PlaceOrderArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(e) => return error_payload(&e.to_string()),
        };
        let quantity = match to_decimal(args.quantity) {
            Ok(quantity) => quantity,
            Err(e) => return error_payload(&e),
        };
        let order = OrderRequest {
            symbol: args.symbol,
            side: args.side,
            order_type: args.order_type,
            quantity,
            price: args.price.and_then(|p| to_decimal(p).ok()),
            stop_price: args.stop_price.and_then(|p| to_decimal(p).ok()),
            time_in_force: args.time_in_force,
        };
        match self.client.place_order(&order).await {
            Ok(info) => json!(info),
            Err(e) => error_payload(&e.to_string()),
        }
    }

    async fn check_balance(&self, args: Value) -> Value {
        let args: CheckBalanceArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(e) => return error_payload(&e.to_string()),
        };
        match self.client.get_account().await {
            Ok(account) => match account.balance_of(&args.asset) {
                Some(balance) => json!(balance),
                None => json!({"asset": args.asset, "free": "0", "locked": "0"}),
            },
            Err(e) => error_payload(&e.to_string()),
        }
    }

    async fn get_latest_price(&self, args: Value) -> Value {
        let args: SymbolArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(e) => return error_payload(&e.to_string()),
        };
        match self.client.get_ticker_price(&args.symbol).await {
            Ok(ticker) => json!(ticker),
            Err(e) => error_payload(&e.to_string()),
        }
    }

    async fn get_open_orders(&self, args: Value) -> Value {
        let args: OptionalSymbolArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(e) => return error_payload(&e.to_string()),
        };
        match self.client.get_open_orders(args.symbol.as_deref()).await {
            Ok(orders) => json!(orders),
            Err(e) => error_payload(&e.to_string()),
        }
    }

    async fn cancel_order(&self, args: Value) -> Value {
        let args: OrderIdArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(e) => return error_payload(&e.to_string()),
        };
        match self.client.cancel_order(&args.symbol, args.order_id).await {
            Ok(info) => json!(info),
            Err(e) => error_payload(&e.to_string()),
        }
    }

    async fn check_order_status(&self, args: Value) -> Value {
        let args: OrderIdArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(e) => return error_payload(&e.to_string()),
        };
        match self.client.get_order(&args.symbol, args.order_id).await {
            Ok(info) => json!(info),
            Err(e) => error_payload(&e.to_string()),
        }
    }

    async fn get_recent_trades(&self, args: Value) -> Value {
        let args: RecentTradesArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(e) => return error_payload(&e.to_string()),
        };
        match self.client.get_recent_trades(&args.symbol, args.limit).await {
            Ok(trades) => json!(trades),
            Err(e) => error_payload(&e.to_string()),
        }
    }
}

#[async_trait]
impl ToolExecutor for TradingToolkit {
    fn definitions(&self) -> Vec<Tool> {
        trading_tool_definitions()
    }

    async fn execute(&self, name: &str, arguments: Value) -> Value {
        tracing::debug!(tool = name, "executing tool call");
        match name {
            "place_order" => self.place_order(arguments).await,
            "check_balance" => self.check_balance(arguments).await,
            "get_latest_price" => self.get_latest_price(arguments).await,
            "get_open_orders" => self.get_open_orders(arguments).await,
            "cancel_order" => self.cancel_order(arguments).await,
            "check_order_status" => self.check_order_status(arguments).await,
            "get_recent_trades" => self.get_recent_trades(arguments).await,
            unknown => error_payload(&format!("unknown tool: {unknown}")),
        }
    }
}

/// JSON-schema definitions for the trading tools.
pub fn trading_tool_definitions() -> Vec<Tool> {
    vec![
        Tool::function(
            "place_order",
            "Place an order on the exchange. Use MARKET orders when no price is given.",
            json!({
                "type": "object",
                "properties": {
                    "symbol": {"type": "string", "description": "Trading pair, e.g. BTCUSDT"},
                    "side": {"type": "string", "enum": ["BUY", "SELL"]},
                    "order_type": {"type": "string", "enum": ["MARKET", "LIMIT", "STOP_LOSS", "TAKE_PROFIT"]},
                    "quantity": {"type": "number"},
                    "price": {"type": "number", "description": "Required for LIMIT orders"},
                    "stop_price": {"type": "number"},
                    "time_in_force": {"type": "string", "enum": ["GTC", "IOC", "FOK"]}
                },
                "required": ["symbol", "side", "order_type", "quantity"]
            }),
        ),
        Tool::function(
            "check_balance",
            "Free and locked balance of one asset in the linked account.",
            json!({
                "type": "object",
                "properties": {
                    "asset": {"type": "string", "description": "Asset symbol, e.g. BTC"}
                },
                "required": ["asset"]
            }),
        ),
        Tool::function(
            "get_latest_price",
            "Latest market price for a trading pair.",
            json!({
                "type": "object",
                "properties": {
                    "symbol": {"type": "string"}
                },
                "required": ["symbol"]
            }),
        ),
        Tool::function(
            "get_open_orders",
            "Open orders for a symbol, or all open orders when no symbol is given.",
            json!({
                "type": "object",
                "properties": {
                    "symbol": {"type": "string"}
                }
            }),
        ),
        Tool::function(
            "cancel_order",
            "Cancel an open order by id.",
            json!({
                "type": "object",
                "properties": {
                    "symbol": {"type": "string"},
                    "order_id": {"type": "integer"}
                },
                "required": ["symbol", "order_id"]
            }),
        ),
        Tool::function(
            "check_order_status",
            "Status of one order by id.",
            json!({
                "type": "object",
                "properties": {
                    "symbol": {"type": "string"},
                    "order_id": {"type": "integer"}
                },
                "required": ["symbol", "order_id"]
            }),
        ),
        Tool::function(
            "get_recent_trades",
            "Most recent public trades for a trading pair.",
            json!({
                "type": "object",
                "properties": {
                    "symbol": {"type": "string"},
                    "limit": {"type": "integer", "default": 10}
                },
                "required": ["symbol"]
            }),
        ),
    ]
}

fn to_decimal(value: f64) -> Result<Decimal, String> {
    Decimal::try_from(value).map_err(|e| format!("invalid decimal {value}: {e}"))
}

fn error_payload(message: &str) -> Value {
    json!({"error": message})
}
