use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use tracing::{debug, info, instrument};

use crate::domain::{Order, OrderFilter, OrderSide, OrderStatus, OrderType};
use crate::error::{DeskError, Result};

const ORDER_COLUMNS: &str = "id, user_id, venue, base_coin_id, quote_coin_id, client_order_id, \
     venue_order_id, symbol, side, order_type, quantity, price, executed_quantity, cost, \
     fee_amount, fee_currency, stop_price, trailing_delta, trailing_type, take_profit_price, \
     stop_loss_price, time_in_force, oco_linked_order_id, is_manual, is_algorithmic, status, \
     transact_time, created_at, updated_at";

/// PostgreSQL order store
#[derive(Clone)]
pub struct OrderStore {
    pool: PgPool,
}

impl OrderStore {
    /// Create a new store with its own connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool (zero-cost reuse)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open a transaction. Dropping it without commit rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    // ==================== Writes ====================

    /// Insert an order inside the caller's transaction
    pub async fn insert_order_tx(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        order: &Order,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (
                user_id, venue, base_coin_id, quote_coin_id, client_order_id, venue_order_id,
                symbol, side, order_type, quantity, price, executed_quantity, cost,
                fee_amount, fee_currency, stop_price, trailing_delta, trailing_type,
                take_profit_price, stop_loss_price, time_in_force, oco_linked_order_id,
                is_manual, is_algorithmic, status, transact_time, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, NOW(), NOW()
            )
            RETURNING id
            "#,
        )
        .bind(order.user_id)
        .bind(&order.venue)
        .bind(order.base_coin_id)
        .bind(order.quote_coin_id)
        .bind(&order.client_order_id)
        .bind(&order.venue_order_id)
        .bind(&order.symbol)
        .bind(order.side.as_str())
        .bind(order.order_type.as_str())
        .bind(order.quantity)
        .bind(order.price)
        .bind(order.executed_quantity)
        .bind(order.cost)
        .bind(order.fee_amount)
        .bind(&order.fee_currency)
        .bind(order.stop_price)
        .bind(order.trailing_delta)
        .bind(order.trailing_type.map(|t| t.as_str()))
        .bind(order.take_profit_price)
        .bind(order.stop_loss_price)
        .bind(order.time_in_force.map(|t| t.as_str()))
        .bind(order.oco_linked_order_id)
        .bind(order.is_manual)
        .bind(order.is_algorithmic)
        .bind(order.status.as_str())
        .bind(order.transact_time)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.get("id"))
    }

    /// Second step of the OCO linkage: point leg A at leg B after both
    /// inserts returned their ids.
    pub async fn link_oco_pair_tx(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        leg_a_id: i64,
        leg_b_id: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders SET oco_linked_order_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(leg_a_id)
        .bind(leg_b_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Transition an order to CANCELED and return the updated row
    #[instrument(skip(self))]
    pub async fn mark_canceled(&self, order_id: i64) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET status = 'CANCELED', updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DeskError::NotFound(format!("order {order_id} not found")))?;

        Ok(row_to_order(&row))
    }

    // ==================== Reads ====================

    /// Fetch one order, enforcing ownership: a user may only read their own
    /// orders, and a foreign id looks identical to a missing one.
    pub async fn order_for_user(&self, user_id: i64, order_id: i64) -> Result<Order> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DeskError::NotFound(format!("order {order_id} not found")))?;

        Ok(row_to_order(&row))
    }

    /// List a user's orders, most recent first, applying set-membership
    /// filters for any constrained dimension.
    #[instrument(skip(self, filter))]
    pub async fn list_orders(&self, user_id: i64, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = "));
        builder.push_bind(user_id);

        if !filter.statuses.is_empty() {
            builder.push(" AND status = ANY(");
            builder.push_bind(
                filter
                    .statuses
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect::<Vec<String>>(),
            );
            builder.push(")");
        }
        if !filter.sides.is_empty() {
            builder.push(" AND side = ANY(");
            builder.push_bind(
                filter
                    .sides
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect::<Vec<String>>(),
            );
            builder.push(")");
        }
        if !filter.order_types.is_empty() {
            builder.push(" AND order_type = ANY(");
            builder.push_bind(
                filter
                    .order_types
                    .iter()
                    .map(|t| t.as_str().to_string())
                    .collect::<Vec<String>>(),
            );
            builder.push(")");
        }
        if let Some(is_manual) = filter.is_manual {
            builder.push(" AND is_manual = ");
            builder.push_bind(is_manual);
        }

        builder.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        debug!(user_id, count = rows.len(), "listed orders");
        Ok(rows.iter().map(row_to_order).collect())
    }

    /// A user's filled orders for one coin, ordered by execution time, for
    /// the holdings fold.
    pub async fn filled_orders_for_coin(&self, user_id: i64, coin_id: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE user_id = $1 AND base_coin_id = $2 AND status = 'FILLED'
            ORDER BY COALESCE(transact_time, created_at) ASC
            "#
        ))
        .bind(user_id)
        .bind(coin_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_order).collect())
    }
}

fn row_to_order(row: &PgRow) -> Order {
    Order {
        id: Some(row.get("id")),
        user_id: row.get("user_id"),
        venue: row.get("venue"),
        base_coin_id: row.get("base_coin_id"),
        quote_coin_id: row.get("quote_coin_id"),
        client_order_id: row.get("client_order_id"),
        venue_order_id: row.get("venue_order_id"),
        symbol: row.get("symbol"),
        side: row
            .get::<String, _>("side")
            .parse()
            .unwrap_or(OrderSide::Buy),
        order_type: row
            .get::<String, _>("order_type")
            .parse()
            .unwrap_or(OrderType::Market),
        quantity: row.get("quantity"),
        price: row.get("price"),
        executed_quantity: row.get("executed_quantity"),
        cost: row.get("cost"),
        fee_amount: row.get("fee_amount"),
        fee_currency: row.get("fee_currency"),
        stop_price: row.get("stop_price"),
        trailing_delta: row.get("trailing_delta"),
        trailing_type: row
            .get::<Option<String>, _>("trailing_type")
            .and_then(|s| s.parse().ok()),
        take_profit_price: row.get("take_profit_price"),
        stop_loss_price: row.get("stop_loss_price"),
        time_in_force: row
            .get::<Option<String>, _>("time_in_force")
            .and_then(|s| s.parse().ok()),
        oco_linked_order_id: row.get("oco_linked_order_id"),
        is_manual: row.get("is_manual"),
        is_algorithmic: row.get("is_algorithmic"),
        status: row
            .get::<String, _>("status")
            .parse()
            .unwrap_or(OrderStatus::New),
        transact_time: row.get("transact_time"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
