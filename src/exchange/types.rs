use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{TimeInForce, TrailingType};

/// Venue-reported market definition for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    /// Symbol in the venue's wire format
    pub symbol: String,
    pub base: String,
    pub quote: String,
    /// Whether the market currently accepts orders
    pub active: bool,
    /// Venue-wide maker rate when embedded in market metadata
    pub maker: Option<Decimal>,
    /// Venue-wide taker rate when embedded in market metadata
    pub taker: Option<Decimal>,
    #[serde(default)]
    pub limits: MarketLimits,
    #[serde(default)]
    pub precision: MarketPrecision,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketLimits {
    pub amount_min: Option<Decimal>,
    pub amount_max: Option<Decimal>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    /// Minimum notional value (quantity x price)
    pub cost_min: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketPrecision {
    /// Quantity step size
    pub amount_step: Option<Decimal>,
    /// Price step size
    pub price_step: Option<Decimal>,
}

/// Venue ticker snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    /// Last traded price
    pub last: Decimal,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One price level of an order book side
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// L2 order book snapshot, best price first on each side
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// Per-currency account balance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Balance {
    pub free: HashMap<String, Decimal>,
    pub total: HashMap<String, Decimal>,
}

impl Balance {
    /// Free balance for a currency, zero when the venue omits it
    pub fn available(&self, currency: &str) -> Decimal {
        self.free
            .get(&currency.to_ascii_uppercase())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// Venue-wide maker/taker fee rates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub maker: Decimal,
    pub taker: Decimal,
}

/// Venue-specific shaping hints passed alongside a submission. Connectors
/// translate these into whatever parameter names the venue expects.
#[derive(Debug, Clone, Default)]
pub struct OrderParams {
    /// Idempotency hint supplied to the venue
    pub client_order_id: Option<String>,
    pub stop_price: Option<Decimal>,
    pub trailing_delta: Option<Decimal>,
    pub trailing_type: Option<TrailingType>,
    pub take_profit_price: Option<Decimal>,
    pub stop_loss_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
}

impl OrderParams {
    pub fn from_request(request: &crate::domain::OrderRequest) -> Self {
        Self {
            client_order_id: request.client_order_id.clone(),
            stop_price: request.stop_price,
            trailing_delta: request.trailing_delta,
            trailing_type: request.trailing_type,
            take_profit_price: request.take_profit_price,
            stop_loss_price: request.stop_loss_price,
            time_in_force: request.time_in_force,
        }
    }
}

/// Venue acknowledgement of a submission or cancellation. Everything beyond
/// the venue order id is optional; the orchestrator falls back to requested
/// values for omitted fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderAck {
    pub venue_order_id: String,
    pub client_order_id: Option<String>,
    /// Raw venue status string, mapped via `OrderStatus::from_venue`
    pub status: Option<String>,
    pub price: Option<Decimal>,
    pub average_price: Option<Decimal>,
    pub executed_quantity: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub fee_cost: Option<Decimal>,
    pub fee_currency: Option<String>,
    pub transact_time: Option<DateTime<Utc>>,
}
