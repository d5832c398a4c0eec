pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod execution;
pub mod logging;
pub mod services;
pub mod supervisor;

pub use adapters::OrderStore;
pub use config::AppConfig;
pub use domain::{
    aggregate_holdings, Coin, CoinHoldings, ExchangeHolding, Order, OrderFilter, OrderPreview,
    OrderRequest, OrderSide, OrderStatus, OrderType, TimeInForce, TrailingType,
};
pub use error::{DeskError, Result};
pub use exchange::{ConnectorRegistry, ExchangeConnector};
pub use execution::ExecutionEngine;
pub use services::{CoinCatalog, CredentialSource, ExchangeCredential};
pub use supervisor::{Alert, AlertLevel, AlertManager};
