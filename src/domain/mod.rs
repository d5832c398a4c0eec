pub mod coin;
pub mod holdings;
pub mod order;
pub mod preview;

pub use coin::Coin;
pub use holdings::{aggregate_holdings, CoinHoldings, ExchangeHolding};
pub use order::{
    Order, OrderFilter, OrderRequest, OrderSide, OrderStatus, OrderType, TimeInForce, TrailingType,
};
pub use preview::OrderPreview;
