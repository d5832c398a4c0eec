use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalog reference for a tradable asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    pub id: i64,
    /// Ticker symbol (e.g. "BTC")
    pub symbol: String,
    /// Current reference price in the system's quote currency
    pub current_price: Decimal,
}
