//! Ledger Repository Trait
//!
//! Accounts, stocks, holdings and the append-only transaction log. Trades
//! are written through `commit_trade`, which applies the account update,
//! the holding write, the transaction row and an optional order claim as
//! one atomic unit guarded by the versions the caller read.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::account::Account;
use crate::domain::entities::holding::Holding;
use crate::domain::entities::order::Order;
use crate::domain::entities::stock::Stock;
use crate::domain::entities::transaction::Transaction;
use crate::domain::errors::StoreError;

/// Holding side of a trade commit
#[derive(Debug, Clone)]
pub enum HoldingWrite {
    /// First buy for the (account, stock) pair
    Insert(Holding),
    /// Existing row; `holding.version` is the version it was read at
    Update(Holding),
}

impl HoldingWrite {
    pub fn holding(&self) -> &Holding {
        match self {
            HoldingWrite::Insert(h) | HoldingWrite::Update(h) => h,
        }
    }
}

/// Everything one trade changes
#[derive(Debug, Clone)]
pub struct TradeCommit {
    /// New account state; `account.version` is the version it was read at
    pub account: Account,
    pub holding: HoldingWrite,
    pub transaction: Transaction,
    /// Executed order to claim; the commit is refused if it is no longer pending
    pub order_claim: Option<Order>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// Account or holding changed since it was read; nothing was written
    StaleVersion,
    /// The claimed order left `PENDING` first; nothing was written
    OrderNotPending,
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn insert_stock(&self, stock: &Stock) -> Result<(), StoreError>;

    async fn get_stock(&self, id: Uuid) -> Result<Option<Stock>, StoreError>;

    async fn get_holding(
        &self,
        account_id: Uuid,
        stock_id: Uuid,
    ) -> Result<Option<Holding>, StoreError>;

    /// Every holding of an account, closed positions included
    async fn holdings_for_account(&self, account_id: Uuid) -> Result<Vec<Holding>, StoreError>;

    /// Current holders of a stock (quantity > 0)
    async fn holders_of(&self, stock_id: Uuid) -> Result<Vec<Holding>, StoreError>;

    /// Transaction log of an account, newest first
    async fn transactions_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn commit_trade(&self, commit: &TradeCommit) -> Result<CommitOutcome, StoreError>;
}
