//! Maker/taker fee-rate resolution.
//!
//! Three-tier fallback, first success wins:
//! 1. the venue's live trading-fee endpoint,
//! 2. the maker/taker rate embedded in already-loaded market metadata
//!    (fee schedules are venue-wide, not symbol-specific, for the target
//!    venues),
//! 3. a static per-venue default table with a 0.1%/0.1% global default.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::domain::OrderType;
use crate::exchange::{ExchangeConnector, FeeSchedule, Market};

/// Static default fee schedule per venue. The fallback of last resort when
/// neither the fee endpoint nor market metadata report rates.
pub fn default_fee_schedule(venue: &str) -> FeeSchedule {
    match venue.trim().to_ascii_lowercase().as_str() {
        "binance" => FeeSchedule {
            maker: dec!(0.001),
            taker: dec!(0.001),
        },
        "coinbase" => FeeSchedule {
            maker: dec!(0.004),
            taker: dec!(0.006),
        },
        "kraken" => FeeSchedule {
            maker: dec!(0.0016),
            taker: dec!(0.0026),
        },
        "kucoin" => FeeSchedule {
            maker: dec!(0.001),
            taker: dec!(0.001),
        },
        "bybit" => FeeSchedule {
            maker: dec!(0.001),
            taker: dec!(0.001),
        },
        // Global default for unknown venues: 0.1% both sides
        _ => FeeSchedule {
            maker: dec!(0.001),
            taker: dec!(0.001),
        },
    }
}

/// Resolve the fee rate for an order. Maker rate for limit orders, taker
/// rate for market and all conditional types. Always resolves; failures
/// only move resolution down a tier.
pub async fn resolve_fee_rate(
    connector: &dyn ExchangeConnector,
    markets: &[Market],
    order_type: OrderType,
) -> Decimal {
    let maker = order_type.is_maker();

    match connector.fetch_trading_fees().await {
        Ok(schedule) => {
            return if maker { schedule.maker } else { schedule.taker };
        }
        Err(e) => {
            debug!(
                venue = connector.venue(),
                "trading-fee endpoint unavailable, falling back to market metadata: {e}"
            );
        }
    }

    if let Some(rate) = markets
        .iter()
        .find_map(|m| if maker { m.maker } else { m.taker })
    {
        return rate;
    }

    let defaults = default_fee_schedule(connector.venue());
    if maker {
        defaults.maker
    } else {
        defaults.taker
    }
}

/// Fee amount for a notional value at a resolved rate
pub fn fee_amount(notional: Decimal, rate: Decimal) -> Decimal {
    notional * rate
}
