use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{AddressId, CustomerId, IntentId, OrderId, ProductId};
use domain::{
    Address, Money, Order, OrderLine, OrderNumber, OrderState, OrderTotals, PaymentState, Product,
};

use crate::error::StoreError;
use crate::store::{
    AddressStore, InventoryStore, OrderStore, ReserveOutcome, TransitionOutcome,
};
use crate::Result;

/// PostgreSQL-backed store implementation.
///
/// Every conditional transition is a single `UPDATE … WHERE <precondition>`;
/// `rows_affected` decides between `Applied` and `NotApplied`, so concurrent
/// callers race inside the database rather than in application code.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            list_price: Money::from_cents(row.try_get("list_price_cents")?),
            sale_price: row
                .try_get::<Option<i64>, _>("sale_price_cents")?
                .map(Money::from_cents),
            on_sale: row.try_get("on_sale")?,
            active: row.try_get("active")?,
        })
    }

    fn row_to_order(row: PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let state_raw: String = row.try_get("state")?;
        let state = OrderState::parse(&state_raw)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown order state '{state_raw}'")))?;

        let payment_raw: String = row.try_get("payment_state")?;
        let payment_state = PaymentState::parse(&payment_raw).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown payment state '{payment_raw}'"))
        })?;

        Ok(Order::from_stored(
            OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            OrderNumber::from_stored(row.try_get::<String, _>("number")?),
            CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            AddressId::from_uuid(row.try_get::<Uuid, _>("address_id")?),
            lines,
            OrderTotals {
                subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
                tax: Money::from_cents(row.try_get("tax_cents")?),
                shipping_cost: Money::from_cents(row.try_get("shipping_cents")?),
                total: Money::from_cents(row.try_get("total_cents")?),
            },
            state,
            payment_state,
            row.try_get::<Option<String>, _>("payment_intent_id")?
                .map(IntentId::new),
            row.try_get("created_at")?,
            row.try_get("updated_at")?,
        ))
    }

    async fn load_lines(&self, order_id: Uuid) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_cents
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderLine::new(
                    row.try_get::<String, _>("product_id")?,
                    row.try_get::<i32, _>("quantity")? as u32,
                    Money::from_cents(row.try_get("unit_price_cents")?),
                ))
            })
            .collect()
    }

    async fn load_order_row(&self, row: Option<PgRow>) -> Result<Option<Order>> {
        let Some(row) = row else {
            return Ok(None);
        };
        let id: Uuid = row.try_get("id")?;
        let lines = self.load_lines(id).await?;
        Ok(Some(Self::row_to_order(row, lines)?))
    }
}

const ORDER_COLUMNS: &str = "id, number, customer_id, address_id, subtotal_cents, tax_cents, \
     shipping_cents, total_cents, state, payment_state, payment_intent_id, created_at, updated_at";

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, list_price_cents, sale_price_cents, on_sale, active
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn reserve(&self, product_id: &ProductId, quantity: u32) -> Result<ReserveOutcome> {
        // Decrement-if-sufficient in one statement; no read-then-write window.
        let result = sqlx::query(
            r#"
            UPDATE products
            SET available = available - $2
            WHERE id = $1 AND available >= $2
            "#,
        )
        .bind(product_id.as_str())
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(ReserveOutcome::Reserved);
        }

        // Distinguish "not enough stock" from "no such product".
        match self.available(product_id).await? {
            Some(_) => Ok(ReserveOutcome::Insufficient),
            None => Err(StoreError::ProductNotFound(product_id.clone())),
        }
    }

    async fn release(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET available = available + $2
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_str())
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProductNotFound(product_id.clone()));
        }
        Ok(())
    }

    async fn available(&self, product_id: &ProductId) -> Result<Option<u32>> {
        let available: Option<i32> =
            sqlx::query_scalar("SELECT available FROM products WHERE id = $1")
                .bind(product_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(available.map(|a| a.max(0) as u32))
    }
}

#[async_trait]
impl AddressStore for PostgresStore {
    async fn get_address(&self, address_id: AddressId) -> Result<Option<Address>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, line1, city, postal_code, country, created_at
            FROM addresses
            WHERE id = $1
            "#,
        )
        .bind(address_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(Address {
                id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
                customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
                line1: row.try_get("line1")?,
                city: row.try_get("city")?,
                postal_code: row.try_get("postal_code")?,
                country: row.try_get("country")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, number, customer_id, address_id, subtotal_cents, tax_cents,
                                shipping_cents, total_cents, state, payment_state,
                                payment_intent_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.number().as_str())
        .bind(order.customer_id().as_uuid())
        .bind(order.address_id().as_uuid())
        .bind(order.subtotal().cents())
        .bind(order.tax().cents())
        .bind(order.shipping_cost().cents())
        .bind(order.total().cents())
        .bind(order.state().as_str())
        .bind(order.payment_state().as_str())
        .bind(order.payment_intent_id().map(|i| i.as_str().to_string()))
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateOrder(order.id());
            }
            StoreError::Database(e)
        })?;

        for line in order.lines() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(line.product_id.as_str())
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        self.load_order_row(row).await
    }

    async fn find_by_intent(&self, intent_id: &IntentId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_intent_id = $1"
        ))
        .bind(intent_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        self.load_order_row(row).await
    }

    async fn attach_intent(
        &self,
        order_id: OrderId,
        intent_id: &IntentId,
    ) -> Result<TransitionOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_intent_id = $2, payment_state = 'processing', updated_at = $3
            WHERE id = $1 AND payment_state = 'pending'
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(intent_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            TransitionOutcome::Applied
        } else {
            TransitionOutcome::NotApplied
        })
    }

    async fn apply_payment_success(&self, intent_id: &IntentId) -> Result<TransitionOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_state = 'paid', state = 'confirmed', updated_at = $2
            WHERE payment_intent_id = $1
              AND payment_state = 'processing'
              AND state = 'created'
            "#,
        )
        .bind(intent_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            TransitionOutcome::Applied
        } else {
            TransitionOutcome::NotApplied
        })
    }

    async fn apply_payment_failure(&self, intent_id: &IntentId) -> Result<TransitionOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_state = 'failed', state = 'cancelled', updated_at = $2
            WHERE payment_intent_id = $1
              AND payment_state IN ('pending', 'processing')
              AND state IN ('created', 'confirmed')
            "#,
        )
        .bind(intent_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            TransitionOutcome::Applied
        } else {
            TransitionOutcome::NotApplied
        })
    }

    async fn cancel_unpaid(&self, order_id: OrderId) -> Result<TransitionOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_state = 'failed', state = 'cancelled', updated_at = $2
            WHERE id = $1
              AND payment_state IN ('pending', 'processing')
              AND state IN ('created', 'confirmed')
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            TransitionOutcome::Applied
        } else {
            TransitionOutcome::NotApplied
        })
    }
}
