use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderSide, OrderType};

/// Projection of an order's economics against live venue state, used to let
/// a caller inspect an order before committing it. Never persisted; never
/// submits anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPreview {
    pub venue: String,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    /// Last traded price reported by the venue
    pub market_price: Decimal,
    pub fee_rate: Decimal,
    pub fee_amount: Decimal,
    /// Only estimated for market orders (walks the book)
    pub estimated_slippage_pct: Option<Decimal>,
    pub available_balance: Decimal,
    pub required_balance: Decimal,
    pub sufficient_balance: bool,
    pub warnings: Vec<String>,
    pub supported_order_types: Vec<OrderType>,
}
