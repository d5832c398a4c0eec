//! Venue-side saga behavior for OCO pairs, driven through a recording
//! connector: leg ordering, compensation when the second leg fails, and
//! error propagation when the compensation itself fails.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Mutex;

use tradedesk::domain::{OrderRequest, OrderSide, OrderType};
use tradedesk::error::{DeskError, Result};
use tradedesk::exchange::{
    Balance, ExchangeConnector, FeeSchedule, Market, OrderAck, OrderBook, OrderParams, Ticker,
};
use tradedesk::execution::submit_oco_legs;

#[derive(Default)]
struct RecordingConnector {
    /// Zero-based index of the submit call that should fail
    fail_submit_at: Option<usize>,
    fail_cancel: bool,
    submits: Mutex<Vec<(OrderType, Option<Decimal>)>>,
    cancels: Mutex<Vec<String>>,
}

#[async_trait]
impl ExchangeConnector for RecordingConnector {
    fn venue(&self) -> &str {
        "binance"
    }

    async fn fetch_markets(&self) -> Result<Vec<Market>> {
        Ok(Vec::new())
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker> {
        Ok(Ticker {
            symbol: symbol.to_string(),
            last: dec!(42000),
            bid: None,
            ask: None,
            timestamp: None,
        })
    }

    async fn fetch_order_book(&self, _symbol: &str, _depth: u32) -> Result<OrderBook> {
        Ok(OrderBook::default())
    }

    async fn fetch_balance(&self) -> Result<Balance> {
        Ok(Balance::default())
    }

    async fn fetch_trading_fees(&self) -> Result<FeeSchedule> {
        Err(DeskError::execution("fetch trading fees", "disabled"))
    }

    async fn submit_order(
        &self,
        _symbol: &str,
        order_type: OrderType,
        _side: OrderSide,
        _quantity: Decimal,
        price: Option<Decimal>,
        _params: &OrderParams,
    ) -> Result<OrderAck> {
        let mut submits = self.submits.lock().unwrap();
        let index = submits.len();
        submits.push((order_type, price));
        if self.fail_submit_at == Some(index) {
            return Err(DeskError::execution("submit order", "venue rejected order"));
        }
        Ok(OrderAck {
            venue_order_id: format!("V{}", index + 1),
            status: Some("open".to_string()),
            ..OrderAck::default()
        })
    }

    async fn cancel_order(&self, venue_order_id: &str, _symbol: &str) -> Result<OrderAck> {
        self.cancels.lock().unwrap().push(venue_order_id.to_string());
        if self.fail_cancel {
            return Err(DeskError::execution("cancel order", "cancel unavailable"));
        }
        Ok(OrderAck {
            venue_order_id: venue_order_id.to_string(),
            status: Some("canceled".to_string()),
            ..OrderAck::default()
        })
    }
}

fn oco_legs() -> (OrderRequest, OrderRequest) {
    let mut base = OrderRequest::market("binance", "BTC", "USDT", OrderSide::Sell, dec!(0.5));
    base.order_type = OrderType::Oco;
    base.take_profit_price = Some(dec!(45000));
    base.stop_loss_price = Some(dec!(38000));

    let mut take_profit_leg = base.clone();
    take_profit_leg.price = Some(dec!(45000));
    take_profit_leg.client_order_id = Some("tp-1".to_string());

    let mut stop_loss_leg = base;
    stop_loss_leg.stop_price = Some(dec!(38000));
    stop_loss_leg.client_order_id = Some("sl-1".to_string());

    (take_profit_leg, stop_loss_leg)
}

#[tokio::test]
async fn oco_submits_take_profit_leg_before_stop_loss_leg() {
    let connector = RecordingConnector::default();
    let (take_profit_leg, stop_loss_leg) = oco_legs();

    let (tp_ack, sl_ack) =
        submit_oco_legs(&connector, "BTCUSDT", &take_profit_leg, &stop_loss_leg)
            .await
            .unwrap();

    assert_eq!(tp_ack.venue_order_id, "V1");
    assert_eq!(sl_ack.venue_order_id, "V2");

    let submits = connector.submits.lock().unwrap();
    assert_eq!(submits.len(), 2);
    assert_eq!(submits[0], (OrderType::TakeProfit, Some(dec!(45000))));
    assert_eq!(submits[1], (OrderType::StopLoss, None));
    assert!(connector.cancels.lock().unwrap().is_empty());
}

#[tokio::test]
async fn oco_cancels_take_profit_leg_when_stop_loss_leg_fails() {
    let connector = RecordingConnector {
        fail_submit_at: Some(1),
        ..RecordingConnector::default()
    };
    let (take_profit_leg, stop_loss_leg) = oco_legs();

    let err = submit_oco_legs(&connector, "BTCUSDT", &take_profit_leg, &stop_loss_leg)
        .await
        .unwrap_err();

    // The original stop-loss error propagates to the caller
    assert!(err.to_string().contains("stop-loss leg"));
    // The already-submitted take-profit leg was canceled on the venue
    assert_eq!(*connector.cancels.lock().unwrap(), vec!["V1".to_string()]);
}

#[tokio::test]
async fn oco_compensation_failure_does_not_mask_original_error() {
    let connector = RecordingConnector {
        fail_submit_at: Some(1),
        fail_cancel: true,
        ..RecordingConnector::default()
    };
    let (take_profit_leg, stop_loss_leg) = oco_legs();

    let err = submit_oco_legs(&connector, "BTCUSDT", &take_profit_leg, &stop_loss_leg)
        .await
        .unwrap_err();

    // Still the stop-loss submission error, not the cancel failure
    assert!(err.to_string().contains("submit stop-loss leg"));
    assert_eq!(connector.cancels.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn oco_take_profit_failure_skips_stop_loss_leg_entirely() {
    let connector = RecordingConnector {
        fail_submit_at: Some(0),
        ..RecordingConnector::default()
    };
    let (take_profit_leg, stop_loss_leg) = oco_legs();

    let err = submit_oco_legs(&connector, "BTCUSDT", &take_profit_leg, &stop_loss_leg)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("take-profit leg"));
    assert_eq!(connector.submits.lock().unwrap().len(), 1);
    assert!(connector.cancels.lock().unwrap().is_empty());
}
