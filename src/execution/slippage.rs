//! Order-book slippage estimation.
//!
//! Walks the relevant side of the book (asks for buys, bids for sells)
//! consuming depth level by level until the requested quantity is filled,
//! and reports the percentage gap between the quantity-weighted average
//! execution price and the best price.

use rust_decimal::Decimal;

use crate::domain::OrderSide;
use crate::exchange::OrderBook;

/// Estimated slippage percentage for executing `quantity` against the book,
/// rounded to 2 decimal places.
///
/// Insufficient depth is not an error: consumption stops at the available
/// depth and the result reflects only the filled portion. Returns 0 when
/// the book side is empty or the best price is 0.
pub fn estimate_slippage(book: &OrderBook, side: OrderSide, quantity: Decimal) -> Decimal {
    let levels = match side {
        OrderSide::Buy => book.asks.as_slice(),
        OrderSide::Sell => book.bids.as_slice(),
    };

    let best = match levels.first() {
        Some(level) => level.price,
        None => return Decimal::ZERO,
    };
    if best <= Decimal::ZERO || quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let mut remaining = quantity;
    let mut filled = Decimal::ZERO;
    let mut notional = Decimal::ZERO;
    for level in levels {
        if remaining <= Decimal::ZERO {
            break;
        }
        let take = remaining.min(level.quantity);
        notional += take * level.price;
        filled += take;
        remaining -= take;
    }
    if filled <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let weighted = notional / filled;
    ((weighted - best).abs() / best * Decimal::ONE_HUNDRED).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::BookLevel;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, quantity: Decimal) -> BookLevel {
        BookLevel { price, quantity }
    }

    fn book_with_asks(asks: Vec<BookLevel>) -> OrderBook {
        OrderBook {
            bids: Vec::new(),
            asks,
        }
    }

    #[test]
    fn test_weighted_walk_across_levels() {
        // asks [[100, 0.4], [105, 0.6]], buy 0.5:
        // weighted = (0.4*100 + 0.1*105) / 0.5 = 101 => slippage 1.00%
        let book = book_with_asks(vec![level(dec!(100), dec!(0.4)), level(dec!(105), dec!(0.6))]);
        assert_eq!(
            estimate_slippage(&book, OrderSide::Buy, dec!(0.5)),
            dec!(1.00)
        );
    }

    #[test]
    fn test_empty_side_returns_zero() {
        let book = OrderBook::default();
        assert_eq!(
            estimate_slippage(&book, OrderSide::Buy, dec!(1)),
            Decimal::ZERO
        );
        assert_eq!(
            estimate_slippage(&book, OrderSide::Sell, dec!(1)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_zero_best_price_returns_zero() {
        let book = book_with_asks(vec![level(Decimal::ZERO, dec!(10))]);
        assert_eq!(
            estimate_slippage(&book, OrderSide::Buy, dec!(1)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_fill_within_best_level_has_no_slippage() {
        let book = book_with_asks(vec![level(dec!(100), dec!(2)), level(dec!(110), dec!(2))]);
        assert_eq!(
            estimate_slippage(&book, OrderSide::Buy, dec!(1.5)),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_monotonically_non_decreasing_with_quantity() {
        let book = book_with_asks(vec![
            level(dec!(100), dec!(0.4)),
            level(dec!(105), dec!(0.6)),
            level(dec!(112), dec!(1.0)),
        ]);

        let mut previous = Decimal::ZERO;
        for quantity in [dec!(0.2), dec!(0.5), dec!(0.9), dec!(1.5), dec!(2.0)] {
            let slippage = estimate_slippage(&book, OrderSide::Buy, quantity);
            assert!(slippage >= previous, "slippage decreased at {quantity}");
            previous = slippage;
        }
    }

    #[test]
    fn test_partial_depth_uses_filled_portion_only() {
        // Book holds 1.0 total; asking for 5.0 fills what's there
        let book = book_with_asks(vec![level(dec!(100), dec!(0.4)), level(dec!(105), dec!(0.6))]);
        // weighted = (0.4*100 + 0.6*105) / 1.0 = 103 => 3.00%
        assert_eq!(
            estimate_slippage(&book, OrderSide::Buy, dec!(5)),
            dec!(3.00)
        );
    }

    #[test]
    fn test_sell_side_walks_bids() {
        let book = OrderBook {
            bids: vec![level(dec!(100), dec!(0.4)), level(dec!(95), dec!(0.6))],
            asks: Vec::new(),
        };
        // weighted = (0.4*100 + 0.1*95) / 0.5 = 99 => 1.00%
        assert_eq!(
            estimate_slippage(&book, OrderSide::Sell, dec!(0.5)),
            dec!(1.00)
        );
    }
}
