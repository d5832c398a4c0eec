//! Order execution orchestrator.
//!
//! Turns a validated order request into a venue submission and a durable
//! local record consistent with that submission's outcome. The venue is
//! always authoritative for actual execution: a venue-side success with a
//! store-side failure is never silently reversed; it is escalated to the
//! operator channel with enough detail to manually reconcile.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::adapters::OrderStore;
use crate::config::ExecutionConfig;
use crate::domain::{
    aggregate_holdings, Coin, CoinHoldings, Order, OrderFilter, OrderPreview, OrderRequest,
    OrderSide, OrderStatus, OrderType,
};
use crate::error::{DeskError, Result};
use crate::exchange::{format_pair, ConnectorRegistry, ExchangeConnector, OrderAck, OrderParams};
use crate::execution::{fees, slippage, validator};
use crate::services::{CoinCatalog, CredentialSource};
use crate::supervisor::{Alert, AlertLevel, AlertManager};

type BoxedOrderFuture<'a> = Pin<Box<dyn Future<Output = Result<Order>> + Send + 'a>>;

/// Resolved collaborators for one request
struct VenueContext {
    connector: Arc<dyn ExchangeConnector>,
    wire_symbol: String,
    base_coin: Coin,
    quote_coin: Coin,
}

#[derive(Clone)]
pub struct ExecutionEngine {
    store: OrderStore,
    registry: Arc<dyn ConnectorRegistry>,
    catalog: Arc<dyn CoinCatalog>,
    credentials: Arc<dyn CredentialSource>,
    alerts: Arc<AlertManager>,
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(
        store: OrderStore,
        registry: Arc<dyn ConnectorRegistry>,
        catalog: Arc<dyn CoinCatalog>,
        credentials: Arc<dyn CredentialSource>,
        alerts: Arc<AlertManager>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            store,
            registry,
            catalog,
            credentials,
            alerts,
            config,
        }
    }

    // ==================== Placement ====================

    pub async fn create_order(&self, request: OrderRequest, user_id: i64) -> Result<Order> {
        self.place_order(request, user_id, false).await
    }

    /// Manual entry point; supports all seven order-type variants.
    pub async fn place_manual_order(&self, request: OrderRequest, user_id: i64) -> Result<Order> {
        self.place_order(request, user_id, true).await
    }

    fn place_order<'a>(
        &'a self,
        request: OrderRequest,
        user_id: i64,
        is_manual: bool,
    ) -> BoxedOrderFuture<'a> {
        Box::pin(async move {
        if request.order_type == OrderType::Oco {
            return self.place_oco_order(request, user_id, is_manual).await;
        }

        let ctx = self.resolve_context(&request, user_id).await?;
        let validated =
            validator::validate_order(ctx.connector.as_ref(), &ctx.wire_symbol, &request).await?;
        let fee_rate = fees::resolve_fee_rate(
            ctx.connector.as_ref(),
            std::slice::from_ref(&validated.market),
            request.order_type,
        )
        .await;

        let mut request = request;
        request.quantity = validated.quantity;
        request.price = validated.price;
        if request.client_order_id.is_none() {
            request.client_order_id = Some(Uuid::new_v4().to_string());
        }
        let params = OrderParams::from_request(&request);

        // The venue call happens inside the store transaction window so the
        // row written from the acknowledgement commits with it, or the whole
        // attempt rolls back when the venue rejects.
        let mut tx = self.store.begin().await?;
        let ack = match ctx
            .connector
            .submit_order(
                &ctx.wire_symbol,
                request.order_type,
                request.side,
                request.quantity,
                request.price,
                &params,
            )
            .await
        {
            Ok(ack) => ack,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("rollback after rejected submission failed: {rollback_err}");
                }
                return Err(DeskError::execution("submit order", &err));
            }
        };

        let mut order = Order::from_ack(
            &request,
            &ack,
            user_id,
            ctx.base_coin.id,
            ctx.quote_coin.id,
            is_manual,
        );
        apply_fee_estimate(&mut order, &request.quote, fee_rate);

        let persisted = match self.store.insert_order_tx(&mut tx, &order).await {
            Ok(id) => tx.commit().await.map(|_| id).map_err(DeskError::from),
            Err(err) => Err(err),
        };
        let id = match persisted {
            Ok(id) => id,
            Err(err) => {
                self.escalate_reconciliation(&request, &[ack.venue_order_id.clone()], &err);
                return Err(DeskError::Internal(
                    "order was accepted by the venue but could not be recorded locally".to_string(),
                ));
            }
        };
        order.id = Some(id);
        info!(
            order_id = id,
            venue = %request.venue,
            venue_order_id = %ack.venue_order_id,
            side = %request.side,
            order_type = %request.order_type,
            "order placed"
        );

        // Protective orders ride outside the original transaction: the entry
        // order already succeeded, so their failure must not undo it.
        if matches!(request.order_type, OrderType::Market | OrderType::Limit)
            && (request.stop_loss_price.is_some() || request.take_profit_price.is_some())
        {
            self.attach_protective_orders(&request, &order, user_id, is_manual)
                .await;
        }

        Ok(order)
        })
    }

    /// Two-leg OCO saga: take-profit leg first, stop-loss leg second, venue
    /// compensation when the second leg fails, then both rows in one local
    /// transaction with two-step cross-linkage.
    async fn place_oco_order(
        &self,
        request: OrderRequest,
        user_id: i64,
        is_manual: bool,
    ) -> Result<Order> {
        let take_profit = request.take_profit_price.ok_or_else(|| {
            DeskError::Validation("OCO orders require a take-profit price".to_string())
        })?;
        let stop_loss = request.stop_loss_price.ok_or_else(|| {
            DeskError::Validation("OCO orders require a stop-loss price".to_string())
        })?;

        let ctx = self.resolve_context(&request, user_id).await?;
        let validated =
            validator::validate_order(ctx.connector.as_ref(), &ctx.wire_symbol, &request).await?;
        let fee_rate = fees::resolve_fee_rate(
            ctx.connector.as_ref(),
            std::slice::from_ref(&validated.market),
            request.order_type,
        )
        .await;

        let mut request = request;
        request.quantity = validated.quantity;

        let mut tp_leg = request.clone();
        tp_leg.price = Some(take_profit);
        tp_leg.stop_price = None;
        if tp_leg.client_order_id.is_none() {
            tp_leg.client_order_id = Some(Uuid::new_v4().to_string());
        }

        let mut sl_leg = request.clone();
        sl_leg.price = None;
        sl_leg.stop_price = Some(stop_loss);
        sl_leg.client_order_id = Some(Uuid::new_v4().to_string());

        let (tp_ack, sl_ack) =
            submit_oco_legs(ctx.connector.as_ref(), &ctx.wire_symbol, &tp_leg, &sl_leg).await?;

        let mut leg_a = Order::from_ack(
            &tp_leg,
            &tp_ack,
            user_id,
            ctx.base_coin.id,
            ctx.quote_coin.id,
            is_manual,
        );
        apply_fee_estimate(&mut leg_a, &request.quote, fee_rate);
        let mut leg_b = Order::from_ack(
            &sl_leg,
            &sl_ack,
            user_id,
            ctx.base_coin.id,
            ctx.quote_coin.id,
            is_manual,
        );
        apply_fee_estimate(&mut leg_b, &request.quote, fee_rate);

        match self.persist_oco_pair(&leg_a, &mut leg_b).await {
            Ok((id_a, id_b)) => {
                leg_a.id = Some(id_a);
                leg_a.oco_linked_order_id = Some(id_b);
                info!(
                    order_id = id_a,
                    linked_order_id = id_b,
                    venue = %request.venue,
                    "OCO pair placed"
                );
                Ok(leg_a)
            }
            Err(err) => {
                self.escalate_reconciliation(
                    &request,
                    &[tp_ack.venue_order_id.clone(), sl_ack.venue_order_id.clone()],
                    &err,
                );
                Err(DeskError::Internal(
                    "OCO legs were accepted by the venue but could not be recorded locally"
                        .to_string(),
                ))
            }
        }
    }

    /// Insert leg A, insert leg B referencing A, update A to reference B.
    /// Neither id exists before its own insert, so the linkage is a two-step
    /// write inside one transaction.
    async fn persist_oco_pair(&self, leg_a: &Order, leg_b: &mut Order) -> Result<(i64, i64)> {
        let mut tx = self.store.begin().await?;
        let id_a = self.store.insert_order_tx(&mut tx, leg_a).await?;
        leg_b.oco_linked_order_id = Some(id_a);
        let id_b = self.store.insert_order_tx(&mut tx, leg_b).await?;
        self.store.link_oco_pair_tx(&mut tx, id_a, id_b).await?;
        tx.commit().await?;
        Ok((id_a, id_b))
    }

    /// Best-effort follow-up after a committed entry order. Failures are
    /// logged as warnings, never propagated: the entry order already won.
    async fn attach_protective_orders(
        &self,
        request: &OrderRequest,
        entry: &Order,
        user_id: i64,
        is_manual: bool,
    ) {
        let exit_side = request.side.opposite();
        let mut children: Vec<OrderRequest> = Vec::new();

        if let Some(stop_loss) = request.stop_loss_price {
            let mut child = request.clone();
            child.order_type = OrderType::StopLoss;
            child.side = exit_side;
            child.price = None;
            child.stop_price = Some(stop_loss);
            child.take_profit_price = None;
            child.stop_loss_price = None;
            child.client_order_id = None;
            children.push(child);
        }
        if let Some(take_profit) = request.take_profit_price {
            let mut child = request.clone();
            child.order_type = OrderType::TakeProfit;
            child.side = exit_side;
            child.price = None;
            child.stop_price = Some(take_profit);
            child.take_profit_price = None;
            child.stop_loss_price = None;
            child.client_order_id = None;
            children.push(child);
        }

        for child in children {
            let order_type = child.order_type;
            let fut: BoxedOrderFuture<'_> = self.place_order(child, user_id, is_manual);
            if let Err(err) = fut.await {
                warn!(
                    entry_order_id = ?entry.id,
                    "failed to attach protective {order_type} order: {err}"
                );
            }
        }
    }

    // ==================== Cancellation ====================

    /// Cancel an order the user owns. The venue is called first; a fill the
    /// venue reports wins over the cancellation. A linked OCO leg is
    /// canceled in cascade, best-effort.
    pub async fn cancel_order(&self, order_id: i64, user_id: i64) -> Result<Order> {
        let order = self.store.order_for_user(user_id, order_id).await?;
        self.cancel_single(order, user_id).await
    }

    fn cancel_single<'a>(&'a self, order: Order, user_id: i64) -> BoxedOrderFuture<'a> {
        Box::pin(async move {
            ensure_cancelable(order.status)?;
            let id = order
                .id
                .ok_or_else(|| DeskError::Internal("order row has no id".to_string()))?;

            let connector = self.registry.resolve(&order.venue, user_id).await?;
            let base = self.catalog.coin_by_id(order.base_coin_id).await?;
            let quote = self.catalog.coin_by_id(order.quote_coin_id).await?;
            let wire_symbol = format_pair(&order.venue, &base.symbol, &quote.symbol);

            if let Some(venue_order_id) = order.venue_order_id.as_deref() {
                let ack = connector
                    .cancel_order(venue_order_id, &wire_symbol)
                    .await
                    .map_err(|e| DeskError::execution("cancel order", &e))?;
                ensure_venue_released(&ack)?;
            }

            let canceled = self.store.mark_canceled(id).await?;
            info!(order_id = id, venue = %order.venue, "order canceled");

            if let Some(linked_id) = order.oco_linked_order_id {
                match self.store.order_for_user(user_id, linked_id).await {
                    Ok(linked) if linked.status.can_cancel() => {
                        if let Err(err) = self.cancel_single(linked, user_id).await {
                            warn!(
                                order_id = id,
                                linked_order_id = linked_id,
                                "failed to cancel linked OCO leg: {err}"
                            );
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(
                            order_id = id,
                            linked_order_id = linked_id,
                            "could not load linked OCO leg: {err}"
                        );
                    }
                }
            }

            Ok(canceled)
        })
    }

    // ==================== Preview ====================

    pub async fn preview_order(&self, request: &OrderRequest, user_id: i64) -> Result<OrderPreview> {
        self.preview(request, user_id, false).await
    }

    pub async fn preview_manual_order(
        &self,
        request: &OrderRequest,
        user_id: i64,
    ) -> Result<OrderPreview> {
        self.preview(request, user_id, true).await
    }

    /// Non-mutating projection of the order against live venue state. Never
    /// submits, never persists.
    async fn preview(
        &self,
        request: &OrderRequest,
        user_id: i64,
        manual: bool,
    ) -> Result<OrderPreview> {
        let ctx = self.resolve_context(request, user_id).await?;
        let markets = ctx
            .connector
            .fetch_markets()
            .await
            .map_err(|e| DeskError::execution("fetch markets", &e))?;
        let ticker = ctx
            .connector
            .fetch_ticker(&ctx.wire_symbol)
            .await
            .map_err(|e| DeskError::execution("fetch ticker", &e))?;
        let market_price = ticker.last;

        let fee_rate =
            fees::resolve_fee_rate(ctx.connector.as_ref(), &markets, request.order_type).await;
        let reference_price = request.price.unwrap_or(market_price);
        let notional = request.quantity * reference_price;
        let fee = fees::fee_amount(notional, fee_rate);

        let estimated_slippage_pct = if request.order_type == OrderType::Market {
            let book = ctx
                .connector
                .fetch_order_book(&ctx.wire_symbol, self.config.order_book_depth)
                .await
                .map_err(|e| DeskError::execution("fetch order book", &e))?;
            Some(slippage::estimate_slippage(&book, request.side, request.quantity))
        } else {
            None
        };

        let balance = ctx
            .connector
            .fetch_balance()
            .await
            .map_err(|e| DeskError::execution("fetch balance", &e))?;
        let (currency, required) = match request.side {
            OrderSide::Buy => (request.quote.to_ascii_uppercase(), notional + fee),
            OrderSide::Sell => (request.base.to_ascii_uppercase(), request.quantity),
        };
        let available = balance.available(&currency);
        let sufficient = available >= required;

        let mut warnings = Vec::new();
        if !sufficient {
            warnings.push(format!(
                "insufficient {currency} balance: required {required}, available {available}"
            ));
        }
        if manual {
            if let Some(limit) = request.price {
                if market_price > Decimal::ZERO {
                    let deviation =
                        ((limit - market_price) / market_price * Decimal::ONE_HUNDRED).abs();
                    if deviation > self.config.price_deviation_warning_pct {
                        warnings.push(format!(
                            "limit price {limit} deviates {}% from the market price {market_price}",
                            deviation.round_dp(2)
                        ));
                    }
                }
            }
            if let Some(slippage_pct) = estimated_slippage_pct {
                if slippage_pct > self.config.slippage_warning_pct {
                    warnings.push(format!(
                        "estimated slippage {slippage_pct}% exceeds the {}% warning threshold",
                        self.config.slippage_warning_pct
                    ));
                }
            }
        }

        Ok(OrderPreview {
            venue: request.venue.clone(),
            symbol: request.symbol(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price: request.price,
            market_price,
            fee_rate,
            fee_amount: fee,
            estimated_slippage_pct,
            available_balance: available,
            required_balance: required,
            sufficient_balance: sufficient,
            warnings,
            supported_order_types: ctx.connector.supported_order_types(),
        })
    }

    // ==================== Queries ====================

    pub async fn get_orders(&self, user_id: i64, filter: &OrderFilter) -> Result<Vec<Order>> {
        self.store.list_orders(user_id, filter).await
    }

    pub async fn get_order(&self, user_id: i64, order_id: i64) -> Result<Order> {
        self.store.order_for_user(user_id, order_id).await
    }

    pub async fn holdings_by_coin(&self, user_id: i64, coin_id: i64) -> Result<CoinHoldings> {
        let coin = self.catalog.coin_by_id(coin_id).await?;
        let orders = self.store.filled_orders_for_coin(user_id, coin.id).await?;
        Ok(aggregate_holdings(&coin, &orders))
    }

    // ==================== Internals ====================

    async fn resolve_context(&self, request: &OrderRequest, user_id: i64) -> Result<VenueContext> {
        self.credentials
            .active_credential(user_id, &request.venue)
            .await?;
        let connector = self.registry.resolve(&request.venue, user_id).await?;
        let base_coin = self.catalog.coin_by_symbol(&request.base).await?;
        let quote_coin = self.catalog.coin_by_symbol(&request.quote).await?;
        let wire_symbol = format_pair(&request.venue, &request.base, &request.quote);
        Ok(VenueContext {
            connector,
            wire_symbol,
            base_coin,
            quote_coin,
        })
    }

    /// The venue accepted but the local write failed: the one category that
    /// must reach an operator with reconciliation detail. The caller only
    /// sees a generic failure.
    fn escalate_reconciliation(
        &self,
        request: &OrderRequest,
        venue_order_ids: &[String],
        err: &DeskError,
    ) {
        let alert = Alert::new(
            AlertLevel::Critical,
            "execution-engine",
            "order persistence failed after venue submission",
            &format!(
                "venue {} accepted {} {} {} (order id(s) {:?}) but the local write failed: {err}; manual reconciliation required",
                request.venue,
                request.side,
                request.quantity,
                request.symbol(),
                venue_order_ids,
            ),
        )
        .with_metadata(serde_json::json!({
            "venue": request.venue,
            "venue_order_ids": venue_order_ids,
            "symbol": request.symbol(),
            "side": request.side.as_str(),
            "order_type": request.order_type.as_str(),
            "quantity": request.quantity.to_string(),
            "error": err.to_string(),
        }));
        self.alerts.raise(alert);
    }
}

/// Submit the two venue-side legs of an OCO pair. The take-profit leg goes
/// first; when the stop-loss leg fails, the already-submitted take-profit
/// leg is canceled best-effort before the original error propagates.
///
/// The take-profit leg's live status is not re-checked before canceling; if
/// it filled in the race window the venue cancel no-ops or errors depending
/// on venue semantics.
pub async fn submit_oco_legs(
    connector: &dyn ExchangeConnector,
    wire_symbol: &str,
    take_profit_leg: &OrderRequest,
    stop_loss_leg: &OrderRequest,
) -> Result<(OrderAck, OrderAck)> {
    let tp_params = OrderParams::from_request(take_profit_leg);
    let tp_ack = connector
        .submit_order(
            wire_symbol,
            OrderType::TakeProfit,
            take_profit_leg.side,
            take_profit_leg.quantity,
            take_profit_leg.price,
            &tp_params,
        )
        .await
        .map_err(|e| DeskError::execution("submit take-profit leg", &e))?;

    let sl_params = OrderParams::from_request(stop_loss_leg);
    match connector
        .submit_order(
            wire_symbol,
            OrderType::StopLoss,
            stop_loss_leg.side,
            stop_loss_leg.quantity,
            None,
            &sl_params,
        )
        .await
    {
        Ok(sl_ack) => Ok((tp_ack, sl_ack)),
        Err(err) => {
            warn!(
                venue_order_id = %tp_ack.venue_order_id,
                "stop-loss leg rejected, canceling submitted take-profit leg"
            );
            if let Err(cancel_err) = connector
                .cancel_order(&tp_ack.venue_order_id, wire_symbol)
                .await
            {
                error!(
                    venue_order_id = %tp_ack.venue_order_id,
                    "failed to cancel take-profit leg after stop-loss failure: {cancel_err}"
                );
            }
            Err(DeskError::execution("submit stop-loss leg", &err))
        }
    }
}

/// Only NEW and PARTIALLY_FILLED orders may be canceled.
pub fn ensure_cancelable(status: OrderStatus) -> Result<()> {
    match status {
        OrderStatus::New | OrderStatus::PartiallyFilled => Ok(()),
        OrderStatus::Filled => Err(DeskError::Validation(
            "cannot cancel a filled order".to_string(),
        )),
        OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired => Err(
            DeskError::Validation(format!("order is already terminal ({status})")),
        ),
        OrderStatus::PendingCancel => Err(DeskError::Validation(
            "cancellation is already in progress".to_string(),
        )),
    }
}

/// A cancellation acknowledgement that reports the order filled means the
/// fill won the race; the local cancellation is rejected.
pub fn ensure_venue_released(ack: &OrderAck) -> Result<()> {
    if let Some(raw) = ack.status.as_deref() {
        if OrderStatus::from_venue(raw) == OrderStatus::Filled {
            return Err(DeskError::execution(
                "cancel order",
                "order already filled on the venue",
            ));
        }
    }
    Ok(())
}

fn apply_fee_estimate(order: &mut Order, quote: &str, fee_rate: Decimal) {
    if order.fee_amount.is_none() {
        let basis = if order.cost > Decimal::ZERO {
            order.cost
        } else {
            order.price.unwrap_or(Decimal::ZERO) * order.quantity
        };
        order.fee_amount = Some(fees::fee_amount(basis, fee_rate));
        order.fee_currency = Some(quote.to_ascii_uppercase());
    }
}
