use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Coin, Order, OrderSide};

/// Per-venue slice of a holdings snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeHolding {
    pub venue: String,
    pub amount: Decimal,
    pub last_transaction_at: Option<DateTime<Utc>>,
}

/// Net position for a (user, coin) pair, derived on demand from the filled
/// order history. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinHoldings {
    pub coin_id: i64,
    pub symbol: String,
    pub total_amount: Decimal,
    pub average_buy_price: Decimal,
    pub current_value: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_pct: Decimal,
    pub exchanges: Vec<ExchangeHolding>,
}

/// Fold a user's filled orders for one coin into a holdings snapshot.
///
/// Buys add to the bought total and the cost-basis accumulator; sells reduce
/// the net amount but leave the basis untouched. Venues whose running amount
/// nets to zero or below are dropped from the breakdown.
pub fn aggregate_holdings(coin: &Coin, orders: &[Order]) -> CoinHoldings {
    let mut total_bought = Decimal::ZERO;
    let mut total_sold = Decimal::ZERO;
    let mut cost_basis = Decimal::ZERO;
    let mut venues: Vec<(String, Decimal, Option<DateTime<Utc>>)> = Vec::new();

    for order in orders {
        let observed_at = Some(order.transact_time.unwrap_or(order.created_at));
        let idx = match venues.iter().position(|(venue, _, _)| *venue == order.venue) {
            Some(idx) => idx,
            None => {
                venues.push((order.venue.clone(), Decimal::ZERO, None));
                venues.len() - 1
            }
        };

        match order.side {
            OrderSide::Buy => {
                total_bought += order.executed_quantity;
                cost_basis += order.cost;
                venues[idx].1 += order.executed_quantity;
            }
            OrderSide::Sell => {
                total_sold += order.executed_quantity;
                venues[idx].1 -= order.executed_quantity;
            }
        }
        if observed_at > venues[idx].2 {
            venues[idx].2 = observed_at;
        }
    }

    let average_buy_price = if total_bought > Decimal::ZERO {
        cost_basis / total_bought
    } else {
        Decimal::ZERO
    };
    let total_amount = total_bought - total_sold;
    let current_value = total_amount * coin.current_price;
    let invested = total_amount * average_buy_price;
    let profit_loss = current_value - invested;
    let profit_loss_pct = if invested > Decimal::ZERO {
        profit_loss / invested * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    CoinHoldings {
        coin_id: coin.id,
        symbol: coin.symbol.clone(),
        total_amount,
        average_buy_price,
        current_value,
        profit_loss,
        profit_loss_pct,
        exchanges: venues
            .into_iter()
            .filter(|(_, amount, _)| *amount > Decimal::ZERO)
            .map(|(venue, amount, last_transaction_at)| ExchangeHolding {
                venue,
                amount,
                last_transaction_at,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderStatus, OrderType};
    use rust_decimal_macros::dec;

    fn coin(price: Decimal) -> Coin {
        Coin {
            id: 1,
            symbol: "BTC".to_string(),
            current_price: price,
        }
    }

    fn filled(venue: &str, side: OrderSide, executed: Decimal, cost: Decimal) -> Order {
        let now = Utc::now();
        Order {
            id: Some(1),
            user_id: 7,
            venue: venue.to_string(),
            base_coin_id: 1,
            quote_coin_id: 2,
            client_order_id: "cid".to_string(),
            venue_order_id: Some("vid".to_string()),
            symbol: "BTCUSDT".to_string(),
            side,
            order_type: OrderType::Market,
            quantity: executed,
            price: None,
            executed_quantity: executed,
            cost,
            fee_amount: None,
            fee_currency: None,
            stop_price: None,
            trailing_delta: None,
            trailing_type: None,
            take_profit_price: None,
            stop_loss_price: None,
            time_in_force: None,
            oco_linked_order_id: None,
            is_manual: false,
            is_algorithmic: false,
            status: OrderStatus::Filled,
            transact_time: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_zero_orders_yields_all_zero_snapshot() {
        let holdings = aggregate_holdings(&coin(dec!(50000)), &[]);

        assert_eq!(holdings.total_amount, Decimal::ZERO);
        assert_eq!(holdings.average_buy_price, Decimal::ZERO);
        assert_eq!(holdings.current_value, Decimal::ZERO);
        assert_eq!(holdings.profit_loss, Decimal::ZERO);
        assert_eq!(holdings.profit_loss_pct, Decimal::ZERO);
        assert!(holdings.exchanges.is_empty());
    }

    #[test]
    fn test_weighted_average_across_two_venues() {
        // 0.3 @ cost 12000 and 0.2 @ cost 9000 => 0.5 total, avg 42000
        let orders = vec![
            filled("binance", OrderSide::Buy, dec!(0.3), dec!(12000)),
            filled("kraken", OrderSide::Buy, dec!(0.2), dec!(9000)),
        ];
        let holdings = aggregate_holdings(&coin(dec!(42000)), &orders);

        assert_eq!(holdings.total_amount, dec!(0.5));
        assert_eq!(holdings.average_buy_price, dec!(42000));
        assert_eq!(holdings.exchanges.len(), 2);
    }

    #[test]
    fn test_sells_reduce_amount_but_not_basis() {
        // BUY 1.0 @ 40000 then SELL 0.3 => net 0.7, avg stays 40000
        let orders = vec![
            filled("binance", OrderSide::Buy, dec!(1.0), dec!(40000)),
            filled("binance", OrderSide::Sell, dec!(0.3), dec!(13500)),
        ];
        let holdings = aggregate_holdings(&coin(dec!(45000)), &orders);

        assert_eq!(holdings.total_amount, dec!(0.7));
        assert_eq!(holdings.average_buy_price, dec!(40000));
    }

    #[test]
    fn test_venue_netting_to_zero_is_excluded() {
        let orders = vec![
            filled("binance", OrderSide::Buy, dec!(1.0), dec!(40000)),
            filled("binance", OrderSide::Sell, dec!(1.0), dec!(42000)),
            filled("kraken", OrderSide::Buy, dec!(0.5), dec!(20000)),
        ];
        let holdings = aggregate_holdings(&coin(dec!(42000)), &orders);

        assert_eq!(holdings.exchanges.len(), 1);
        assert_eq!(holdings.exchanges[0].venue, "kraken");
        assert_eq!(holdings.exchanges[0].amount, dec!(0.5));
    }

    #[test]
    fn test_profit_loss_against_current_price() {
        let orders = vec![filled("binance", OrderSide::Buy, dec!(2), dec!(80000))];
        let holdings = aggregate_holdings(&coin(dec!(50000)), &orders);

        // invested 80000, now worth 100000
        assert_eq!(holdings.current_value, dec!(100000));
        assert_eq!(holdings.profit_loss, dec!(20000));
        assert_eq!(holdings.profit_loss_pct, dec!(25));
    }

    #[test]
    fn test_last_transaction_timestamp_is_most_recent() {
        let mut first = filled("binance", OrderSide::Buy, dec!(1), dec!(40000));
        first.transact_time = Some(Utc::now() - chrono::Duration::hours(2));
        let second = filled("binance", OrderSide::Buy, dec!(1), dec!(41000));
        let latest = second.transact_time;

        let holdings = aggregate_holdings(&coin(dec!(42000)), &[first, second]);
        assert_eq!(holdings.exchanges[0].last_transaction_at, latest);
    }
}
