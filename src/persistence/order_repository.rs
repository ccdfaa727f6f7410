//! SQLite order store

use async_trait::async_trait;
use tracing::{debug, error};
use uuid::Uuid;

use super::models::{convert_all, OrderRecord};
use super::DbPool;
use crate::domain::entities::order::{Order, OrderStatus};
use crate::domain::errors::StoreError;
use crate::domain::repositories::order_repository::OrderRepository;

const ORDER_COLUMNS: &str = "id, account_id, stock_id, side, quantity, limit_price, status, \
     created_at, executed_at, execution_price, cancelled_at, failure_reason";

pub struct SqliteOrderRepository {
    pool: DbPool,
}

impl SqliteOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, account_id, stock_id, side, quantity, limit_price, status,
                created_at, executed_at, execution_price, cancelled_at, failure_reason
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(order.id.to_string())
        .bind(order.account_id.to_string())
        .bind(order.stock_id.to_string())
        .bind(order.side.as_str())
        .bind(order.quantity.to_string())
        .bind(order.limit_price.to_string())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.executed_at)
        .bind(order.execution_price.map(|p| p.to_string()))
        .bind(order.cancelled_at)
        .bind(order.failure_reason.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert order {}: {}", order.id, e);
            StoreError::from(e)
        })?;

        debug!("Inserted order {} ({})", order.id, order.side);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let record = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {} FROM orders WHERE id = ?1",
            ORDER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        record.map(Order::try_from).transpose()
    }

    async fn list_for_account(
        &self,
        account_id: Uuid,
        pending_only: bool,
    ) -> Result<Vec<Order>, StoreError> {
        let filter = if pending_only {
            "AND status = 'PENDING'"
        } else {
            ""
        };
        let records = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {} FROM orders WHERE account_id = ?1 {} ORDER BY created_at DESC, rowid DESC",
            ORDER_COLUMNS, filter
        ))
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        convert_all(records)
    }

    async fn list_pending(&self) -> Result<Vec<Order>, StoreError> {
        let records = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {} FROM orders WHERE status = 'PENDING' ORDER BY created_at ASC, rowid ASC",
            ORDER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        convert_all(records)
    }

    async fn transition_from_pending(&self, order: &Order) -> Result<bool, StoreError> {
        if order.status == OrderStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "order {} transition must leave PENDING",
                order.id
            )));
        }

        let rows_affected = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?1, executed_at = ?2, execution_price = ?3,
                cancelled_at = ?4, failure_reason = ?5
            WHERE id = ?6 AND status = 'PENDING'
            "#,
        )
        .bind(order.status.as_str())
        .bind(order.executed_at)
        .bind(order.execution_price.map(|p| p.to_string()))
        .bind(order.cancelled_at)
        .bind(order.failure_reason.as_deref())
        .bind(order.id.to_string())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            debug!("Order {} was no longer pending, {} not applied", order.id, order.status);
            return Ok(false);
        }

        debug!("Order {} → {}", order.id, order.status);
        Ok(true)
    }
}
