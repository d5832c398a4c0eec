pub mod symbols;
pub mod traits;
pub mod types;

pub use symbols::{format_pair, format_symbol, split_symbol};
pub use traits::{ConnectorRegistry, ExchangeConnector};
pub use types::{
    Balance, BookLevel, FeeSchedule, Market, MarketLimits, MarketPrecision, OrderAck, OrderBook,
    OrderParams, Ticker,
};
