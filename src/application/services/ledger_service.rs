//! Accounts, stocks and direct trades

use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::account::Account;
use crate::domain::entities::holding::Holding;
use crate::domain::entities::stock::Stock;
use crate::domain::entities::transaction::{TradeSide, Transaction};
use crate::domain::errors::{StoreError, TradeError, ValidationError};
use crate::domain::repositories::ledger_repository::LedgerRepository;
use crate::domain::services::transaction_processor::{TradeRequest, TransactionProcessor};
use crate::domain::value_objects::{price::Price, quantity::Quantity};

/// Unvalidated direct trade input
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectTrade {
    pub account_id: Uuid,
    pub stock_id: Uuid,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub price_per_share: Decimal,
}

pub struct LedgerService {
    ledger: Arc<dyn LedgerRepository>,
    processor: Arc<TransactionProcessor>,
}

impl LedgerService {
    pub fn new(ledger: Arc<dyn LedgerRepository>, processor: Arc<TransactionProcessor>) -> Self {
        Self { ledger, processor }
    }

    pub async fn open_account(&self, cash_balance: Decimal) -> Result<Account, TradeError> {
        let account = Account::open(cash_balance)?;
        self.ledger.insert_account(&account).await?;
        info!(account_id = %account.id, cash = %account.cash_balance, "Account opened");
        Ok(account)
    }

    pub async fn get_account(&self, id: Uuid) -> Result<Account, TradeError> {
        self.ledger
            .get_account(id)
            .await?
            .ok_or(TradeError::AccountNotFound(id))
    }

    pub async fn register_stock(&self, symbol: &str) -> Result<Stock, TradeError> {
        let stock = Stock::new(symbol)?;
        match self.ledger.insert_stock(&stock).await {
            Ok(()) => {
                info!(stock_id = %stock.id, symbol = %stock.symbol, "Stock registered");
                Ok(stock)
            }
            Err(StoreError::Conflict(_)) => Err(ValidationError::InvalidSymbol(format!(
                "{} is already registered",
                stock.symbol
            ))
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a trade immediately at the given price
    pub async fn trade(&self, trade: DirectTrade) -> Result<Transaction, TradeError> {
        let request = TradeRequest {
            account_id: trade.account_id,
            stock_id: trade.stock_id,
            side: trade.side,
            quantity: Quantity::new(trade.quantity)?,
            price_per_share: Price::new(trade.price_per_share)?,
        };
        self.processor.process(request).await
    }

    pub async fn holdings(&self, account_id: Uuid) -> Result<Vec<Holding>, TradeError> {
        self.get_account(account_id).await?;
        Ok(self.ledger.holdings_for_account(account_id).await?)
    }

    /// Newest first
    pub async fn transactions(&self, account_id: Uuid) -> Result<Vec<Transaction>, TradeError> {
        self.get_account(account_id).await?;
        Ok(self.ledger.transactions_for_account(account_id).await?)
    }
}
