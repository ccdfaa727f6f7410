//! SQLite ledger store: accounts, stocks, holdings and the transaction log
//!
//! `commit_trade` is the only path that changes balances or holdings. It
//! runs in a single transaction and writes nothing unless every guard holds.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Sqlite, Transaction as SqlTransaction};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::models::{convert_all, AccountRecord, HoldingRecord, StockRecord, TransactionRecord};
use super::DbPool;
use crate::domain::entities::account::Account;
use crate::domain::entities::holding::Holding;
use crate::domain::entities::order::Order;
use crate::domain::entities::stock::Stock;
use crate::domain::entities::transaction::Transaction;
use crate::domain::errors::StoreError;
use crate::domain::repositories::ledger_repository::{
    CommitOutcome, HoldingWrite, LedgerRepository, TradeCommit,
};

const HOLDING_COLUMNS: &str = "account_id, stock_id, quantity, average_cost_basis, \
     total_cost_basis, realized_gain, first_purchase_date, version";

const TRANSACTION_COLUMNS: &str =
    "id, account_id, stock_id, order_id, side, share_quantity, price_per_share, created_at";

pub struct SqliteLedgerRepository {
    pool: DbPool,
}

impl SqliteLedgerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn claim_order(
    tx: &mut SqlTransaction<'_, Sqlite>,
    order: &Order,
) -> Result<bool, StoreError> {
    let rows_affected = sqlx::query(
        r#"
        UPDATE orders
        SET status = ?1, executed_at = ?2, execution_price = ?3
        WHERE id = ?4 AND status = 'PENDING'
        "#,
    )
    .bind(order.status.as_str())
    .bind(order.executed_at)
    .bind(order.execution_price.map(|p| p.to_string()))
    .bind(order.id.to_string())
    .execute(&mut **tx)
    .await?
    .rows_affected();

    Ok(rows_affected == 1)
}

async fn update_account(
    tx: &mut SqlTransaction<'_, Sqlite>,
    account: &Account,
) -> Result<bool, StoreError> {
    let rows_affected = sqlx::query(
        r#"
        UPDATE accounts
        SET cash_balance = ?1, version = version + 1
        WHERE id = ?2 AND version = ?3
        "#,
    )
    .bind(account.cash_balance.to_string())
    .bind(account.id.to_string())
    .bind(account.version as i64)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    Ok(rows_affected == 1)
}

async fn write_holding(
    tx: &mut SqlTransaction<'_, Sqlite>,
    write: &HoldingWrite,
) -> Result<bool, StoreError> {
    match write {
        HoldingWrite::Insert(h) => {
            let result = sqlx::query(&format!(
                "INSERT INTO holdings ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
                HOLDING_COLUMNS
            ))
            .bind(h.account_id.to_string())
            .bind(h.stock_id.to_string())
            .bind(h.quantity.to_string())
            .bind(h.average_cost_basis.to_string())
            .bind(h.total_cost_basis.to_string())
            .bind(h.realized_gain.to_string())
            .bind(h.first_purchase_date)
            .execute(&mut **tx)
            .await;

            match result {
                Ok(_) => Ok(true),
                // another trade opened the position first
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
                Err(e) => Err(e.into()),
            }
        }
        HoldingWrite::Update(h) => {
            let rows_affected = sqlx::query(
                r#"
                UPDATE holdings
                SET quantity = ?1, average_cost_basis = ?2, total_cost_basis = ?3,
                    realized_gain = ?4, version = version + 1
                WHERE account_id = ?5 AND stock_id = ?6 AND version = ?7
                "#,
            )
            .bind(h.quantity.to_string())
            .bind(h.average_cost_basis.to_string())
            .bind(h.total_cost_basis.to_string())
            .bind(h.realized_gain.to_string())
            .bind(h.account_id.to_string())
            .bind(h.stock_id.to_string())
            .bind(h.version as i64)
            .execute(&mut **tx)
            .await?
            .rows_affected();

            Ok(rows_affected == 1)
        }
    }
}

async fn append_transaction(
    tx: &mut SqlTransaction<'_, Sqlite>,
    transaction: &Transaction,
) -> Result<(), StoreError> {
    sqlx::query(&format!(
        "INSERT INTO transactions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        TRANSACTION_COLUMNS
    ))
    .bind(transaction.id.to_string())
    .bind(transaction.account_id.to_string())
    .bind(transaction.stock_id.to_string())
    .bind(transaction.order_id.map(|id| id.to_string()))
    .bind(transaction.side.as_str())
    .bind(transaction.share_quantity.to_string())
    .bind(transaction.price_per_share.to_string())
    .bind(transaction.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl LedgerRepository for SqliteLedgerRepository {
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO accounts (id, cash_balance, version, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(account.id.to_string())
        .bind(account.cash_balance.to_string())
        .bind(account.version as i64)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        debug!("Opened account {} with {}", account.id, account.cash_balance);
        Ok(())
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "SELECT id, cash_balance, version, created_at FROM accounts WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        record.map(Account::try_from).transpose()
    }

    async fn insert_stock(&self, stock: &Stock) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO stocks (id, symbol) VALUES (?1, ?2)")
            .bind(stock.id.to_string())
            .bind(&stock.symbol)
            .execute(&self.pool)
            .await?;

        debug!("Registered stock {} as {}", stock.symbol, stock.id);
        Ok(())
    }

    async fn get_stock(&self, id: Uuid) -> Result<Option<Stock>, StoreError> {
        let record = sqlx::query_as::<_, StockRecord>("SELECT id, symbol FROM stocks WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        record.map(Stock::try_from).transpose()
    }

    async fn get_holding(
        &self,
        account_id: Uuid,
        stock_id: Uuid,
    ) -> Result<Option<Holding>, StoreError> {
        let record = sqlx::query_as::<_, HoldingRecord>(&format!(
            "SELECT {} FROM holdings WHERE account_id = ?1 AND stock_id = ?2",
            HOLDING_COLUMNS
        ))
        .bind(account_id.to_string())
        .bind(stock_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        record.map(Holding::try_from).transpose()
    }

    async fn holdings_for_account(&self, account_id: Uuid) -> Result<Vec<Holding>, StoreError> {
        let records = sqlx::query_as::<_, HoldingRecord>(&format!(
            "SELECT {} FROM holdings WHERE account_id = ?1 ORDER BY first_purchase_date ASC",
            HOLDING_COLUMNS
        ))
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        convert_all(records)
    }

    async fn holders_of(&self, stock_id: Uuid) -> Result<Vec<Holding>, StoreError> {
        // quantities are decimal text, so the positive filter runs after parsing
        let records = sqlx::query_as::<_, HoldingRecord>(&format!(
            "SELECT {} FROM holdings WHERE stock_id = ?1 ORDER BY first_purchase_date ASC",
            HOLDING_COLUMNS
        ))
        .bind(stock_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let holdings: Vec<Holding> = convert_all(records)?;
        Ok(holdings
            .into_iter()
            .filter(|h| h.quantity > Decimal::ZERO)
            .collect())
    }

    async fn transactions_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<Transaction>, StoreError> {
        let records = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {} FROM transactions WHERE account_id = ?1 ORDER BY created_at DESC, rowid DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        convert_all(records)
    }

    async fn commit_trade(&self, commit: &TradeCommit) -> Result<CommitOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin trade commit: {}", e);
            StoreError::from(e)
        })?;

        if let Some(order) = &commit.order_claim {
            if !claim_order(&mut tx, order).await? {
                tx.rollback().await?;
                debug!("Order {} no longer pending, trade discarded", order.id);
                return Ok(CommitOutcome::OrderNotPending);
            }
        }

        if !update_account(&mut tx, &commit.account).await? {
            tx.rollback().await?;
            warn!(
                "Account {} moved past version {}",
                commit.account.id, commit.account.version
            );
            return Ok(CommitOutcome::StaleVersion);
        }

        if !write_holding(&mut tx, &commit.holding).await? {
            tx.rollback().await?;
            let holding = commit.holding.holding();
            warn!(
                "Holding {}/{} moved past version {}",
                holding.account_id, holding.stock_id, holding.version
            );
            return Ok(CommitOutcome::StaleVersion);
        }

        append_transaction(&mut tx, &commit.transaction).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit trade {}: {}", commit.transaction.id, e);
            StoreError::from(e)
        })?;

        Ok(CommitOutcome::Applied)
    }
}
