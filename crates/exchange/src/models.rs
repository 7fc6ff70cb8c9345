use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// One asset balance inside an account snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// Spot account snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(default)]
    pub can_trade: bool,
    #[serde(default)]
    pub can_withdraw: bool,
    #[serde(default)]
    pub can_deposit: bool,
    pub balances: Vec<Balance>,
}

impl AccountInfo {
    /// The balance entry for one asset, if the account holds it.
    pub fn balance_of(&self, asset: &str) -> Option<&Balance> {
        self.balances.iter().find(|b| b.asset == asset)
    }
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// Latest price for one trading pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: Decimal,
}

/// One public trade from the recent-trades endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTrade {
    pub id: i64,
    pub price: Decimal,
    pub qty: Decimal,
    pub time: i64,
    pub is_buyer_maker: bool,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    StopLossLimit,
    TakeProfit,
    TakeProfitLimit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::StopLoss => "STOP_LOSS",
            OrderType::StopLossLimit => "STOP_LOSS_LIMIT",
            OrderType::TakeProfit => "TAKE_PROFIT",
            OrderType::TakeProfitLimit => "TAKE_PROFIT_LIMIT",
        }
    }
}

/// Parameters for placing one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    /// Order time policy, e.g. GTC or IOC. Only sent for limit-style orders.
    pub time_in_force: String,
}

impl OrderRequest {
    pub fn market(symbol: &str, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: "GTC".to_string(),
        }
    }

    pub fn limit(symbol: &str, side: OrderSide, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            stop_price: None,
            time_in_force: "GTC".to_string(),
        }
    }

    /// Query parameters in the order the exchange expects them.
    pub(crate) fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("symbol".to_string(), self.symbol.clone()),
            ("side".to_string(), self.side.as_str().to_string()),
            ("type".to_string(), self.order_type.as_str().to_string()),
            ("quantity".to_string(), self.quantity.to_string()),
        ];
        if let Some(price) = self.price {
            params.push(("price".to_string(), price.to_string()));
        }
        if let Some(stop_price) = self.stop_price {
            params.push(("stopPrice".to_string(), stop_price.to_string()));
        }
        if self.order_type != OrderType::Market {
            params.push(("timeInForce".to_string(), self.time_in_force.clone()));
        }
        params
    }
}

/// The exchange's acknowledgement of an order operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    pub symbol: String,
    pub order_id: i64,
    #[serde(default)]
    pub client_order_id: String,
    pub status: String,
    #[serde(default)]
    pub executed_qty: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(rename = "type", default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_order_omits_price_and_tif() {
        let order = OrderRequest::market("BTCUSDT", OrderSide::Buy, dec!(0.5));
        let params = order.to_params();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["symbol", "side", "type", "quantity"]);
    }

    #[test]
    fn test_limit_order_carries_price_and_tif() {
        let order = OrderRequest::limit("ETHUSDT", OrderSide::Sell, dec!(1), dec!(2000));
        let params = order.to_params();
        assert!(params.contains(&("price".to_string(), "2000".to_string())));
        assert!(params.contains(&("timeInForce".to_string(), "GTC".to_string())));
        assert!(params.contains(&("side".to_string(), "SELL".to_string())));
    }

    #[test]
    fn test_ticker_price_decodes_string_price() {
        let ticker: TickerPrice =
            serde_json::from_str(r#"{"symbol": "BTCUSDT", "price": "29500.00"}"#).unwrap();
        assert_eq!(ticker.price, dec!(29500.00));
    }

    #[test]
    fn test_balance_lookup() {
        let account: AccountInfo = serde_json::from_str(
            r#"{"balances": [{"asset": "BTC", "free": "0.5", "locked": "0.0"}]}"#,
        )
        .unwrap();
        assert_eq!(account.balance_of("BTC").unwrap().free, dec!(0.5));
        assert!(account.balance_of("ETH").is_none());
    }
}
