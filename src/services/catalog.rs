use async_trait::async_trait;

use crate::domain::Coin;
use crate::error::Result;

/// Coin/catalog lookup, provided by the external catalog service.
///
/// Missing coins surface as `DeskError::NotFound`.
#[async_trait]
pub trait CoinCatalog: Send + Sync {
    async fn coin_by_id(&self, id: i64) -> Result<Coin>;

    async fn coin_by_symbol(&self, symbol: &str) -> Result<Coin>;

    async fn coins_by_symbols(&self, symbols: &[String]) -> Result<Vec<Coin>>;
}
