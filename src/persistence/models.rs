//! Database Models
//!
//! Row shapes as stored, and their conversion into domain entities. Every
//! conversion re-validates what it reads, so a hand-edited or truncated row
//! surfaces as `StoreError::Corrupt` instead of a bogus entity.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use super::{parse_decimal, parse_uuid, parse_version};
use crate::domain::entities::account::Account;
use crate::domain::entities::dividend::{Dividend, DividendPayment, PaymentStatus};
use crate::domain::entities::holding::Holding;
use crate::domain::entities::order::{Order, OrderSide, OrderStatus};
use crate::domain::entities::stock::Stock;
use crate::domain::entities::transaction::{TradeSide, Transaction};
use crate::domain::errors::StoreError;
use crate::domain::value_objects::{price::Price, quantity::Quantity};

fn corrupt<E: std::fmt::Display>(field: &str) -> impl Fn(E) -> StoreError + '_ {
    move |reason: E| StoreError::Corrupt(format!("{}: {}", field, reason))
}

fn price(field: &str, raw: &str) -> Result<Price, StoreError> {
    Price::new(parse_decimal(field, raw)?).map_err(corrupt(field))
}

fn quantity(field: &str, raw: &str) -> Result<Quantity, StoreError> {
    Quantity::new(parse_decimal(field, raw)?).map_err(corrupt(field))
}

#[derive(Debug, Clone, FromRow)]
pub struct AccountRecord {
    pub id: String,
    pub cash_balance: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AccountRecord> for Account {
    type Error = StoreError;

    fn try_from(record: AccountRecord) -> Result<Self, Self::Error> {
        Ok(Account {
            id: parse_uuid("accounts.id", &record.id)?,
            cash_balance: parse_decimal("accounts.cash_balance", &record.cash_balance)?,
            version: parse_version("accounts.version", record.version)?,
            created_at: record.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StockRecord {
    pub id: String,
    pub symbol: String,
}

impl TryFrom<StockRecord> for Stock {
    type Error = StoreError;

    fn try_from(record: StockRecord) -> Result<Self, Self::Error> {
        Ok(Stock {
            id: parse_uuid("stocks.id", &record.id)?,
            symbol: record.symbol,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct HoldingRecord {
    pub account_id: String,
    pub stock_id: String,
    pub quantity: String,
    pub average_cost_basis: String,
    pub total_cost_basis: String,
    pub realized_gain: String,
    pub first_purchase_date: DateTime<Utc>,
    pub version: i64,
}

impl TryFrom<HoldingRecord> for Holding {
    type Error = StoreError;

    fn try_from(record: HoldingRecord) -> Result<Self, Self::Error> {
        Ok(Holding {
            account_id: parse_uuid("holdings.account_id", &record.account_id)?,
            stock_id: parse_uuid("holdings.stock_id", &record.stock_id)?,
            quantity: parse_decimal("holdings.quantity", &record.quantity)?,
            average_cost_basis: parse_decimal(
                "holdings.average_cost_basis",
                &record.average_cost_basis,
            )?,
            total_cost_basis: parse_decimal("holdings.total_cost_basis", &record.total_cost_basis)?,
            realized_gain: parse_decimal("holdings.realized_gain", &record.realized_gain)?,
            first_purchase_date: record.first_purchase_date,
            version: parse_version("holdings.version", record.version)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderRecord {
    pub id: String,
    pub account_id: String,
    pub stock_id: String,
    pub side: String,
    pub quantity: String,
    pub limit_price: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub execution_price: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl TryFrom<OrderRecord> for Order {
    type Error = StoreError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let execution_price = record
            .execution_price
            .as_deref()
            .map(|raw| price("orders.execution_price", raw))
            .transpose()?;

        Ok(Order {
            id: parse_uuid("orders.id", &record.id)?,
            account_id: parse_uuid("orders.account_id", &record.account_id)?,
            stock_id: parse_uuid("orders.stock_id", &record.stock_id)?,
            side: record
                .side
                .parse::<OrderSide>()
                .map_err(corrupt("orders.side"))?,
            quantity: quantity("orders.quantity", &record.quantity)?,
            limit_price: price("orders.limit_price", &record.limit_price)?,
            status: record
                .status
                .parse::<OrderStatus>()
                .map_err(corrupt("orders.status"))?,
            created_at: record.created_at,
            executed_at: record.executed_at,
            execution_price,
            cancelled_at: record.cancelled_at,
            failure_reason: record.failure_reason,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TransactionRecord {
    pub id: String,
    pub account_id: String,
    pub stock_id: String,
    pub order_id: Option<String>,
    pub side: String,
    pub share_quantity: String,
    pub price_per_share: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = StoreError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: parse_uuid("transactions.id", &record.id)?,
            account_id: parse_uuid("transactions.account_id", &record.account_id)?,
            stock_id: parse_uuid("transactions.stock_id", &record.stock_id)?,
            order_id: record
                .order_id
                .as_deref()
                .map(|raw| parse_uuid("transactions.order_id", raw))
                .transpose()?,
            side: record
                .side
                .parse::<TradeSide>()
                .map_err(corrupt("transactions.side"))?,
            share_quantity: quantity("transactions.share_quantity", &record.share_quantity)?,
            price_per_share: price("transactions.price_per_share", &record.price_per_share)?,
            created_at: record.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DividendRecord {
    pub id: String,
    pub stock_id: String,
    pub amount_per_share: String,
    pub pay_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DividendRecord> for Dividend {
    type Error = StoreError;

    fn try_from(record: DividendRecord) -> Result<Self, Self::Error> {
        Ok(Dividend {
            id: parse_uuid("dividends.id", &record.id)?,
            stock_id: parse_uuid("dividends.stock_id", &record.stock_id)?,
            amount_per_share: price("dividends.amount_per_share", &record.amount_per_share)?,
            pay_date: record.pay_date,
            created_at: record.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DividendPaymentRecord {
    pub id: String,
    pub account_id: String,
    pub stock_id: String,
    pub dividend_id: String,
    pub share_quantity: String,
    pub total_amount: String,
    pub payment_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DividendPaymentRecord> for DividendPayment {
    type Error = StoreError;

    fn try_from(record: DividendPaymentRecord) -> Result<Self, Self::Error> {
        Ok(DividendPayment {
            id: parse_uuid("dividend_payments.id", &record.id)?,
            account_id: parse_uuid("dividend_payments.account_id", &record.account_id)?,
            stock_id: parse_uuid("dividend_payments.stock_id", &record.stock_id)?,
            dividend_id: parse_uuid("dividend_payments.dividend_id", &record.dividend_id)?,
            share_quantity: parse_decimal("dividend_payments.share_quantity", &record.share_quantity)?,
            total_amount: parse_decimal("dividend_payments.total_amount", &record.total_amount)?,
            payment_date: record.payment_date,
            status: record
                .status
                .parse::<PaymentStatus>()
                .map_err(corrupt("dividend_payments.status"))?,
            created_at: record.created_at,
        })
    }
}

/// Convert a batch of rows, failing on the first corrupt one
pub(crate) fn convert_all<R, T>(records: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    records.into_iter().map(T::try_from).collect()
}
