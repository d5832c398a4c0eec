use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{DeskError, Result};
use crate::exchange::OrderAck;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
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

    pub fn opposite(&self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = DeskError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            _ => Err(DeskError::Validation(format!("unknown order side '{raw}'"))),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    StopLimit,
    TrailingStop,
    TakeProfit,
    Oco,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::StopLoss => "STOP_LOSS",
            OrderType::StopLimit => "STOP_LIMIT",
            OrderType::TrailingStop => "TRAILING_STOP",
            OrderType::TakeProfit => "TAKE_PROFIT",
            OrderType::Oco => "OCO",
        }
    }

    /// Limit orders rest on the book and pay the maker rate; market and all
    /// conditional types execute as market orders and take liquidity.
    pub fn is_maker(&self) -> bool {
        matches!(self, OrderType::Limit)
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = DeskError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            "STOP_LOSS" => Ok(OrderType::StopLoss),
            "STOP_LIMIT" => Ok(OrderType::StopLimit),
            "TRAILING_STOP" => Ok(OrderType::TrailingStop),
            "TAKE_PROFIT" => Ok(OrderType::TakeProfit),
            "OCO" => Ok(OrderType::Oco),
            _ => Err(DeskError::Validation(format!("unknown order type '{raw}'"))),
        }
    }
}

/// Trailing stop offset interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrailingType {
    Amount,
    Percentage,
}

impl TrailingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrailingType::Amount => "AMOUNT",
            TrailingType::Percentage => "PERCENTAGE",
        }
    }
}

impl FromStr for TrailingType {
    type Err = DeskError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AMOUNT" => Ok(TrailingType::Amount),
            "PERCENTAGE" => Ok(TrailingType::Percentage),
            _ => Err(DeskError::Validation(format!(
                "unknown trailing type '{raw}'"
            ))),
        }
    }
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good Till Cancelled
    GTC,
    /// Immediate Or Cancel
    IOC,
    /// Fill Or Kill
    FOK,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::GTC => "GTC",
            TimeInForce::IOC => "IOC",
            TimeInForce::FOK => "FOK",
        }
    }
}

impl FromStr for TimeInForce {
    type Err = DeskError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GTC" => Ok(TimeInForce::GTC),
            "IOC" => Ok(TimeInForce::IOC),
            "FOK" => Ok(TimeInForce::FOK),
            _ => Err(DeskError::Validation(format!(
                "unknown time in force '{raw}'"
            ))),
        }
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Acknowledged by the venue, resting or waiting to trigger
    New,
    /// Order partially filled
    PartiallyFilled,
    /// Order fully filled
    Filled,
    /// Order cancelled
    Canceled,
    /// Order rejected by the venue
    Rejected,
    /// Order expired
    Expired,
    /// Cancellation requested, not yet confirmed
    PendingCancel,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Expired => "EXPIRED",
            OrderStatus::PendingCancel => "PENDING_CANCEL",
        }
    }

    /// Fixed mapping from venue status strings. Unrecognized strings default
    /// to `New` so an exotic venue status never drops an acknowledged order.
    pub fn from_venue(raw: &str) -> OrderStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open" => OrderStatus::New,
            "closed" => OrderStatus::Filled,
            "canceled" | "cancelled" => OrderStatus::Canceled,
            "expired" => OrderStatus::Expired,
            "rejected" => OrderStatus::Rejected,
            "partial" | "partially_filled" => OrderStatus::PartiallyFilled,
            _ => OrderStatus::New,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }

    /// Only resting orders may be canceled.
    pub fn can_cancel(&self) -> bool {
        self.is_active()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DeskError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NEW" => Ok(OrderStatus::New),
            "PARTIALLY_FILLED" => Ok(OrderStatus::PartiallyFilled),
            "FILLED" => Ok(OrderStatus::Filled),
            "CANCELED" | "CANCELLED" => Ok(OrderStatus::Canceled),
            "REJECTED" => Ok(OrderStatus::Rejected),
            "EXPIRED" => Ok(OrderStatus::Expired),
            "PENDING_CANCEL" => Ok(OrderStatus::PendingCancel),
            _ => Err(DeskError::Validation(format!(
                "unknown order status '{raw}'"
            ))),
        }
    }
}

/// Normalized order request (what the caller wants to do)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub venue: String,
    pub base: String,
    pub quote: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub trailing_delta: Option<Decimal>,
    pub trailing_type: Option<TrailingType>,
    pub take_profit_price: Option<Decimal>,
    pub stop_loss_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub client_order_id: Option<String>,
    pub is_algorithmic: bool,
}

impl OrderRequest {
    pub fn market(
        venue: impl Into<String>,
        base: impl Into<String>,
        quote: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
    ) -> Self {
        Self {
            venue: venue.into(),
            base: base.into(),
            quote: quote.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            trailing_delta: None,
            trailing_type: None,
            take_profit_price: None,
            stop_loss_price: None,
            time_in_force: None,
            client_order_id: None,
            is_algorithmic: false,
        }
    }

    pub fn limit(
        venue: impl Into<String>,
        base: impl Into<String>,
        quote: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        let mut request = Self::market(venue, base, quote, side, quantity);
        request.order_type = OrderType::Limit;
        request.price = Some(price);
        request
    }

    /// Internal canonical symbol token (`BASEQUOTE`)
    pub fn symbol(&self) -> String {
        format!(
            "{}{}",
            self.base.to_ascii_uppercase(),
            self.quote.to_ascii_uppercase()
        )
    }

    pub fn notional(&self) -> Option<Decimal> {
        self.price.map(|p| p * self.quantity)
    }
}

/// Order (the unit of durable state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<i64>,
    pub user_id: i64,
    pub venue: String,
    pub base_coin_id: i64,
    pub quote_coin_id: i64,
    pub client_order_id: String,
    pub venue_order_id: Option<String>,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub executed_quantity: Decimal,
    pub cost: Decimal,
    pub fee_amount: Option<Decimal>,
    pub fee_currency: Option<String>,
    pub stop_price: Option<Decimal>,
    pub trailing_delta: Option<Decimal>,
    pub trailing_type: Option<TrailingType>,
    pub take_profit_price: Option<Decimal>,
    pub stop_loss_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    /// Back-reference to the sibling leg of an OCO pair
    pub oco_linked_order_id: Option<i64>,
    pub is_manual: bool,
    pub is_algorithmic: bool,
    pub status: OrderStatus,
    /// Venue-reported execution timestamp
    pub transact_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build the durable row from the venue's acknowledgement, falling back
    /// to the requested values for any field the venue omits. Executed
    /// quantity is clamped to the requested quantity.
    pub fn from_ack(
        request: &OrderRequest,
        ack: &OrderAck,
        user_id: i64,
        base_coin_id: i64,
        quote_coin_id: i64,
        is_manual: bool,
    ) -> Self {
        let now = Utc::now();
        let executed = ack
            .executed_quantity
            .unwrap_or(Decimal::ZERO)
            .min(request.quantity);
        let price = ack.price.or(request.price);
        let cost = ack.cost.unwrap_or_else(|| {
            ack.average_price
                .or(price)
                .map(|p| p * executed)
                .unwrap_or(Decimal::ZERO)
        });
        let status = ack
            .status
            .as_deref()
            .map(OrderStatus::from_venue)
            .unwrap_or(OrderStatus::New);

        Self {
            id: None,
            user_id,
            venue: request.venue.clone(),
            base_coin_id,
            quote_coin_id,
            client_order_id: ack
                .client_order_id
                .clone()
                .or_else(|| request.client_order_id.clone())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            venue_order_id: Some(ack.venue_order_id.clone()),
            symbol: request.symbol(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price,
            executed_quantity: executed,
            cost,
            fee_amount: ack.fee_cost,
            fee_currency: ack.fee_currency.clone(),
            stop_price: request.stop_price,
            trailing_delta: request.trailing_delta,
            trailing_type: request.trailing_type,
            take_profit_price: request.take_profit_price,
            stop_loss_price: request.stop_loss_price,
            time_in_force: request.time_in_force,
            oco_linked_order_id: None,
            is_manual,
            is_algorithmic: request.is_algorithmic,
            status,
            transact_time: ack.transact_time,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining_quantity(&self) -> Decimal {
        (self.quantity - self.executed_quantity).max(Decimal::ZERO)
    }

    /// Calculate fill percentage
    pub fn fill_pct(&self) -> Decimal {
        if self.quantity.is_zero() {
            return Decimal::ZERO;
        }
        self.executed_quantity / self.quantity * Decimal::ONE_HUNDRED
    }

    pub fn average_fill_price(&self) -> Option<Decimal> {
        if self.executed_quantity > Decimal::ZERO {
            Some(self.cost / self.executed_quantity)
        } else {
            None
        }
    }
}

/// Filters for listing a user's orders. Each set is empty when the caller
/// did not constrain that dimension.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub statuses: Vec<OrderStatus>,
    pub sides: Vec<OrderSide>,
    pub order_types: Vec<OrderType>,
    pub is_manual: Option<bool>,
    pub limit: Option<i64>,
}

impl OrderFilter {
    /// Parse the wire form where status/side/type each accept a single value
    /// or a comma-separated set.
    pub fn parse(
        status: Option<&str>,
        side: Option<&str>,
        order_type: Option<&str>,
        is_manual: Option<bool>,
        limit: Option<i64>,
    ) -> Result<Self> {
        Ok(Self {
            statuses: parse_set(status)?,
            sides: parse_set(side)?,
            order_types: parse_set(order_type)?,
            is_manual,
            limit,
        })
    }
}

fn parse_set<T: FromStr<Err = DeskError>>(raw: Option<&str>) -> Result<Vec<T>> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(T::from_str)
            .collect(),
    }
}
