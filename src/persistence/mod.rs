//! Persistence Layer
//!
//! SQLite storage for accounts, stocks, holdings, orders, the transaction
//! log, dividends and dividend payments, via sqlx.
//!
//! # Storage conventions
//! - Identifiers are UUID strings
//! - Money and share quantities are decimal strings, never REAL, so they
//!   round-trip exactly
//! - Timestamps are RFC 3339 text; dates are `YYYY-MM-DD`
//! - `accounts.version` and `holdings.version` back the optimistic checks
//!   in `commit_trade`
//!
//! # Database Schema
//!
//! ## Orders Table
//! - id, account_id, stock_id
//! - side: "BUY_LIMIT" or "SELL_LIMIT"
//! - quantity, limit_price: Decimal
//! - status: "PENDING", "EXECUTED", "CANCELLED", "FAILED"
//! - executed_at, execution_price, cancelled_at, failure_reason
//!
//! ## Holdings Table
//! - one row per (account_id, stock_id), kept after it reaches zero shares
//!
//! ## Dividend Payments Table
//! - one row per (account_id, dividend_id), enforced by a unique index

pub mod dividend_repository;
pub mod ledger_repository;
pub mod models;
pub mod order_repository;

use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::domain::errors::StoreError;

pub use dividend_repository::SqliteDividendRepository;
pub use ledger_repository::SqliteLedgerRepository;
pub use order_repository::SqliteOrderRepository;

/// Database connection pool
pub type DbPool = SqlitePool;

/// Database initialization error
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Backend(error.to_string()),
        }
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Initialize the database connection pool
///
/// # Arguments
/// - `database_url`: SQLite URL (e.g., "sqlite://data/stockfolio.db" or "sqlite::memory:")
///
/// # Errors
/// Returns error if database connection fails or migrations fail
pub async fn init_database(database_url: &str) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", database_url);

    let in_memory = is_in_memory(database_url);

    // Ensure data directory exists
    if !in_memory {
        if let Some(db_path) = database_url.strip_prefix("sqlite://") {
            let db_path = db_path.split('?').next().unwrap_or(db_path);
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
                    })?;
                }
            }
        }
    }

    let mut options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(tracing::log::LevelFilter::Debug);

    // An in-memory database lives and dies with its connection, so the pool
    // holds exactly one and never recycles it.
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options = options.journal_mode(SqliteJournalMode::Wal);
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options.connect_with(options).await?;

    run_migrations(&pool).await?;

    info!("✓ Database initialized successfully");

    Ok(pool)
}

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "accounts",
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            cash_balance TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL
        )
        "#,
    ),
    (
        "stocks",
        r#"
        CREATE TABLE IF NOT EXISTS stocks (
            id TEXT PRIMARY KEY,
            symbol TEXT NOT NULL UNIQUE
        )
        "#,
    ),
    (
        "holdings",
        r#"
        CREATE TABLE IF NOT EXISTS holdings (
            account_id TEXT NOT NULL,
            stock_id TEXT NOT NULL,
            quantity TEXT NOT NULL,
            average_cost_basis TEXT NOT NULL,
            total_cost_basis TEXT NOT NULL,
            realized_gain TEXT NOT NULL,
            first_purchase_date DATETIME NOT NULL,
            version INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (account_id, stock_id),
            FOREIGN KEY (account_id) REFERENCES accounts(id),
            FOREIGN KEY (stock_id) REFERENCES stocks(id)
        )
        "#,
    ),
    (
        "orders",
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            stock_id TEXT NOT NULL,
            side TEXT NOT NULL CHECK(side IN ('BUY_LIMIT', 'SELL_LIMIT')),
            quantity TEXT NOT NULL,
            limit_price TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('PENDING', 'EXECUTED', 'CANCELLED', 'FAILED')),
            created_at DATETIME NOT NULL,
            executed_at DATETIME,
            execution_price TEXT,
            cancelled_at DATETIME,
            failure_reason TEXT,
            FOREIGN KEY (account_id) REFERENCES accounts(id),
            FOREIGN KEY (stock_id) REFERENCES stocks(id)
        )
        "#,
    ),
    (
        "transactions",
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            stock_id TEXT NOT NULL,
            order_id TEXT,
            side TEXT NOT NULL CHECK(side IN ('BUY', 'SELL')),
            share_quantity TEXT NOT NULL,
            price_per_share TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            FOREIGN KEY (account_id) REFERENCES accounts(id),
            FOREIGN KEY (stock_id) REFERENCES stocks(id),
            FOREIGN KEY (order_id) REFERENCES orders(id)
        )
        "#,
    ),
    (
        "dividends",
        r#"
        CREATE TABLE IF NOT EXISTS dividends (
            id TEXT PRIMARY KEY,
            stock_id TEXT NOT NULL,
            amount_per_share TEXT NOT NULL,
            pay_date DATE NOT NULL,
            created_at DATETIME NOT NULL,
            FOREIGN KEY (stock_id) REFERENCES stocks(id)
        )
        "#,
    ),
    (
        "dividend_payments",
        r#"
        CREATE TABLE IF NOT EXISTS dividend_payments (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL,
            stock_id TEXT NOT NULL,
            dividend_id TEXT NOT NULL,
            share_quantity TEXT NOT NULL,
            total_amount TEXT NOT NULL,
            payment_date DATE NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('PAID')),
            created_at DATETIME NOT NULL,
            UNIQUE (account_id, dividend_id),
            FOREIGN KEY (account_id) REFERENCES accounts(id),
            FOREIGN KEY (dividend_id) REFERENCES dividends(id)
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_orders_status_created ON orders(status, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_orders_account ON orders(account_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_holdings_stock ON holdings(stock_id)",
    "CREATE INDEX IF NOT EXISTS idx_dividend_payments_dividend ON dividend_payments(dividend_id)",
];

/// Run database migrations
async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    for (table, ddl) in MIGRATIONS {
        sqlx::query(ddl).execute(pool).await.map_err(|e| {
            DatabaseError::MigrationError(format!("Failed to create {} table: {}", table, e))
        })?;
    }

    for ddl in INDEXES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;
    }

    info!("✓ Database migrations completed successfully");

    Ok(())
}

pub(crate) fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw)
        .map_err(|e| StoreError::Corrupt(format!("{} '{}' is not a UUID: {}", field, raw, e)))
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(raw)
        .map_err(|e| StoreError::Corrupt(format!("{} '{}' is not a decimal: {}", field, raw, e)))
}

pub(crate) fn parse_version(field: &str, raw: i64) -> Result<u64, StoreError> {
    u64::try_from(raw)
        .map_err(|_| StoreError::Corrupt(format!("{} has negative version {}", field, raw)))
}
