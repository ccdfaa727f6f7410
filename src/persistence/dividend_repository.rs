//! SQLite dividend store

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::models::{convert_all, DividendPaymentRecord, DividendRecord};
use super::DbPool;
use crate::domain::entities::dividend::{Dividend, DividendPayment};
use crate::domain::errors::StoreError;
use crate::domain::repositories::dividend_repository::DividendRepository;

pub struct SqliteDividendRepository {
    pool: DbPool,
}

impl SqliteDividendRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DividendRepository for SqliteDividendRepository {
    async fn insert_dividend(&self, dividend: &Dividend) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO dividends (id, stock_id, amount_per_share, pay_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(dividend.id.to_string())
        .bind(dividend.stock_id.to_string())
        .bind(dividend.amount_per_share.to_string())
        .bind(dividend.pay_date)
        .bind(dividend.created_at)
        .execute(&self.pool)
        .await?;

        debug!("Recorded dividend {} for stock {}", dividend.id, dividend.stock_id);
        Ok(())
    }

    async fn get_dividend(&self, id: Uuid) -> Result<Option<Dividend>, StoreError> {
        let record = sqlx::query_as::<_, DividendRecord>(
            "SELECT id, stock_id, amount_per_share, pay_date, created_at FROM dividends WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        record.map(Dividend::try_from).transpose()
    }

    async fn payment_exists(&self, account_id: Uuid, dividend_id: Uuid) -> Result<bool, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM dividend_payments WHERE account_id = ?1 AND dividend_id = ?2",
        )
        .bind(account_id.to_string())
        .bind(dividend_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn insert_payment(&self, payment: &DividendPayment) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO dividend_payments (
                id, account_id, stock_id, dividend_id, share_quantity,
                total_amount, payment_date, status, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (account_id, dividend_id) DO NOTHING
            "#,
        )
        .bind(payment.id.to_string())
        .bind(payment.account_id.to_string())
        .bind(payment.stock_id.to_string())
        .bind(payment.dividend_id.to_string())
        .bind(payment.share_quantity.to_string())
        .bind(payment.total_amount.to_string())
        .bind(payment.payment_date)
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }

    async fn payments_for_dividend(
        &self,
        dividend_id: Uuid,
    ) -> Result<Vec<DividendPayment>, StoreError> {
        let records = sqlx::query_as::<_, DividendPaymentRecord>(
            r#"
            SELECT id, account_id, stock_id, dividend_id, share_quantity,
                   total_amount, payment_date, status, created_at
            FROM dividend_payments
            WHERE dividend_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(dividend_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        convert_all(records)
    }
}
