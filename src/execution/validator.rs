//! Pre-submission validation against the venue's live market definition.
//!
//! Validation performs no side effects and is safe to call repeatedly. All
//! failures surface as `DeskError::Validation` with a human-readable reason.

use rust_decimal::Decimal;

use crate::domain::OrderRequest;
use crate::error::{DeskError, Result};
use crate::exchange::{ExchangeConnector, Market};

/// Outcome of validation: the market definition used plus the quantity and
/// price adjusted to the venue's step sizes.
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub market: Market,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
}

/// Fetch the venue's market for `wire_symbol` and check the request against
/// its constraints.
pub async fn validate_order(
    connector: &dyn ExchangeConnector,
    wire_symbol: &str,
    request: &OrderRequest,
) -> Result<ValidatedOrder> {
    let markets = connector
        .fetch_markets()
        .await
        .map_err(|e| DeskError::execution("fetch markets", &e))?;
    let market = markets
        .into_iter()
        .find(|m| m.symbol.eq_ignore_ascii_case(wire_symbol))
        .ok_or_else(|| {
            DeskError::Validation(format!(
                "no market for symbol {wire_symbol} on {}",
                connector.venue()
            ))
        })?;

    let (quantity, price) = check_against_market(&market, request)?;
    Ok(ValidatedOrder {
        market,
        quantity,
        price,
    })
}

/// Check a request against one market definition. Quantity and price are
/// rounded down to the venue's step sizes first; an adjustment that pushes a
/// value outside bounds is a validation failure, not a silent truncation.
pub fn check_against_market(
    market: &Market,
    request: &OrderRequest,
) -> Result<(Decimal, Option<Decimal>)> {
    if !market.active {
        return Err(DeskError::Validation(format!(
            "market {} is not currently tradable",
            market.symbol
        )));
    }

    if request.quantity <= Decimal::ZERO {
        return Err(DeskError::Validation(
            "order quantity must be positive".to_string(),
        ));
    }

    let quantity = round_to_step(request.quantity, market.precision.amount_step);
    if quantity <= Decimal::ZERO {
        return Err(DeskError::Validation(format!(
            "quantity {} rounds to zero at the venue's step size",
            request.quantity
        )));
    }
    if let Some(min) = market.limits.amount_min {
        if quantity < min {
            return Err(DeskError::Validation(format!(
                "quantity {quantity} is below the venue minimum {min} for {}",
                market.symbol
            )));
        }
    }
    if let Some(max) = market.limits.amount_max {
        if quantity > max {
            return Err(DeskError::Validation(format!(
                "quantity {quantity} is above the venue maximum {max} for {}",
                market.symbol
            )));
        }
    }

    let price = request
        .price
        .map(|p| round_to_step(p, market.precision.price_step));
    if let Some(price) = price {
        if price <= Decimal::ZERO {
            return Err(DeskError::Validation(
                "order price must be positive".to_string(),
            ));
        }
        if let Some(min) = market.limits.price_min {
            if price < min {
                return Err(DeskError::Validation(format!(
                    "price {price} is below the venue minimum {min} for {}",
                    market.symbol
                )));
            }
        }
        if let Some(max) = market.limits.price_max {
            if price > max {
                return Err(DeskError::Validation(format!(
                    "price {price} is above the venue maximum {max} for {}",
                    market.symbol
                )));
            }
        }
        if let Some(min_cost) = market.limits.cost_min {
            let notional = quantity * price;
            if notional < min_cost {
                return Err(DeskError::Validation(format!(
                    "order value {notional} is below the venue minimum notional {min_cost} for {}",
                    market.symbol
                )));
            }
        }
    }

    Ok((quantity, price))
}

/// Round a value down to a multiple of `step`. Values pass through when the
/// venue reports no step.
pub fn round_to_step(value: Decimal, step: Option<Decimal>) -> Decimal {
    match step {
        Some(step) if step > Decimal::ZERO => (value / step).floor() * step,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use crate::exchange::{MarketLimits, MarketPrecision};
    use rust_decimal_macros::dec;

    fn market() -> Market {
        Market {
            symbol: "BTCUSDT".to_string(),
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            active: true,
            maker: Some(dec!(0.001)),
            taker: Some(dec!(0.001)),
            limits: MarketLimits {
                amount_min: Some(dec!(0.0001)),
                amount_max: Some(dec!(100)),
                price_min: Some(dec!(1)),
                price_max: Some(dec!(1000000)),
                cost_min: Some(dec!(10)),
            },
            precision: MarketPrecision {
                amount_step: Some(dec!(0.0001)),
                price_step: Some(dec!(0.01)),
            },
        }
    }

    fn limit_request(quantity: Decimal, price: Decimal) -> OrderRequest {
        OrderRequest::limit("binance", "BTC", "USDT", OrderSide::Buy, quantity, price)
    }

    #[test]
    fn test_inactive_market_is_rejected() {
        let mut market = market();
        market.active = false;
        let err = check_against_market(&market, &limit_request(dec!(1), dec!(40000))).unwrap_err();
        assert!(err.to_string().contains("BTCUSDT"));
        assert!(err.to_string().contains("not currently tradable"));
    }

    #[test]
    fn test_quantity_bounds() {
        let market = market();
        assert!(check_against_market(&market, &limit_request(dec!(0.00005), dec!(40000))).is_err());
        assert!(check_against_market(&market, &limit_request(dec!(101), dec!(40000))).is_err());
        assert!(check_against_market(&market, &limit_request(dec!(1), dec!(40000))).is_ok());
    }

    #[test]
    fn test_price_bounds() {
        let market = market();
        assert!(check_against_market(&market, &limit_request(dec!(1), dec!(0.5))).is_err());
        assert!(check_against_market(&market, &limit_request(dec!(1), dec!(2000000))).is_err());
    }

    #[test]
    fn test_minimum_notional() {
        let market = market();
        // 0.0002 * 40000 = 8, below the 10 minimum
        let err = check_against_market(&market, &limit_request(dec!(0.0002), dec!(40000)))
            .unwrap_err();
        assert!(err.to_string().contains("minimum notional"));
    }

    #[test]
    fn test_market_order_skips_price_checks() {
        let market = market();
        let request = OrderRequest::market("binance", "BTC", "USDT", OrderSide::Buy, dec!(1));
        let (quantity, price) = check_against_market(&market, &request).unwrap();
        assert_eq!(quantity, dec!(1));
        assert_eq!(price, None);
    }

    #[test]
    fn test_step_rounding_is_applied() {
        let market = market();
        let (quantity, price) =
            check_against_market(&market, &limit_request(dec!(0.12345), dec!(40000.129))).unwrap();
        assert_eq!(quantity, dec!(0.1234));
        assert_eq!(price, Some(dec!(40000.12)));
    }

    #[test]
    fn test_rounding_below_minimum_fails_instead_of_truncating() {
        let mut market = market();
        market.limits.amount_min = Some(dec!(0.0002));
        // 0.00025 floors to 0.0002 (ok); 0.00021 floors to 0.0002 (ok);
        // 0.00015 floors to 0.0001 which is below the minimum
        assert!(check_against_market(&market, &limit_request(dec!(0.00025), dec!(100000))).is_ok());
        assert!(
            check_against_market(&market, &limit_request(dec!(0.00015), dec!(100000))).is_err()
        );
    }

    #[test]
    fn test_round_to_step() {
        assert_eq!(round_to_step(dec!(1.2345), Some(dec!(0.01))), dec!(1.23));
        assert_eq!(round_to_step(dec!(1.2345), None), dec!(1.2345));
        assert_eq!(round_to_step(dec!(1.2345), Some(Decimal::ZERO)), dec!(1.2345));
    }
}
