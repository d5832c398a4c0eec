use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::domain::{OrderSide, OrderType};
use crate::error::Result;

use super::types::{Balance, FeeSchedule, Market, OrderAck, OrderBook, OrderParams, Ticker};

/// Capability-bearing client bound to one venue and one acting user.
///
/// Venues expose inconsistent field names and capability sets; all
/// venue-specific translation (symbol formatting, parameter shaping,
/// authentication) lives behind this interface. The engine only ever talks
/// to the trait.
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    /// Venue slug this connector is bound to (e.g. "binance")
    fn venue(&self) -> &str;

    async fn fetch_markets(&self) -> Result<Vec<Market>>;

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker>;

    async fn fetch_order_book(&self, symbol: &str, depth: u32) -> Result<OrderBook>;

    async fn fetch_balance(&self) -> Result<Balance>;

    /// Live trading-fee endpoint. Allowed to fail; callers fall back to
    /// market metadata and static defaults.
    async fn fetch_trading_fees(&self) -> Result<FeeSchedule>;

    async fn submit_order(
        &self,
        symbol: &str,
        order_type: OrderType,
        side: OrderSide,
        quantity: Decimal,
        price: Option<Decimal>,
        params: &OrderParams,
    ) -> Result<OrderAck>;

    async fn cancel_order(&self, venue_order_id: &str, symbol: &str) -> Result<OrderAck>;

    /// Order types this venue accepts
    fn supported_order_types(&self) -> Vec<OrderType> {
        vec![
            OrderType::Market,
            OrderType::Limit,
            OrderType::StopLoss,
            OrderType::StopLimit,
            OrderType::TrailingStop,
            OrderType::TakeProfit,
            OrderType::Oco,
        ]
    }
}

/// Resolves a connector for (venue, acting user). Implementations may cache
/// per (venue, user); that cache is treated as already-synchronized here.
#[async_trait]
pub trait ConnectorRegistry: Send + Sync {
    async fn resolve(&self, venue: &str, user_id: i64) -> Result<Arc<dyn ExchangeConnector>>;
}
