//! TransactionProcessor - validates and atomically applies one trade against
//! the account balance, the holding and the transaction log

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::entities::holding::Holding;
use crate::domain::entities::order::Order;
use crate::domain::entities::transaction::{TradeSide, Transaction};
use crate::domain::errors::TradeError;
use crate::domain::repositories::ledger_repository::{
    CommitOutcome, HoldingWrite, LedgerRepository, TradeCommit,
};
use crate::domain::services::account_locks::AccountLocks;
use crate::domain::value_objects::{price::Price, quantity::Quantity};

/// A trade to apply. Quantity and price are positive by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    pub account_id: Uuid,
    pub stock_id: Uuid,
    pub side: TradeSide,
    pub quantity: Quantity,
    pub price_per_share: Price,
}

impl TradeRequest {
    fn for_order(order: &Order, price: Price) -> Self {
        TradeRequest {
            account_id: order.account_id,
            stock_id: order.stock_id,
            side: order.side.trade_side(),
            quantity: order.quantity,
            price_per_share: price,
        }
    }
}

/// Applies trades under the account's lock and commits them with
/// optimistic version checks, retrying a bounded number of times when the
/// stored account or holding moved underneath it.
pub struct TransactionProcessor {
    ledger: Arc<dyn LedgerRepository>,
    locks: AccountLocks,
    max_retries: u32,
}

impl TransactionProcessor {
    pub fn new(ledger: Arc<dyn LedgerRepository>, max_retries: u32) -> Self {
        Self {
            ledger,
            locks: AccountLocks::new(),
            max_retries,
        }
    }

    /// Apply a direct trade
    pub async fn process(&self, request: TradeRequest) -> Result<Transaction, TradeError> {
        let commit = self.apply(&request, None).await?;
        Ok(commit.transaction)
    }

    /// Apply a triggered limit order at `price`.
    ///
    /// The order is claimed `PENDING → EXECUTED` inside the same atomic unit
    /// as the ledger writes; if it was cancelled or failed in the meantime
    /// nothing is written and `OrderNotPending` is returned.
    pub async fn execute_order(
        &self,
        order: &Order,
        price: Price,
    ) -> Result<(Order, Transaction), TradeError> {
        if !order.is_pending() {
            return Err(TradeError::OrderNotPending(order.id));
        }

        let request = TradeRequest::for_order(order, price);
        let commit = self.apply(&request, Some(order)).await?;

        match commit.order_claim {
            Some(executed) => Ok((executed, commit.transaction)),
            None => Err(TradeError::Storage(format!(
                "commit for order {} carried no order claim",
                order.id
            ))),
        }
    }

    async fn apply(
        &self,
        request: &TradeRequest,
        order: Option<&Order>,
    ) -> Result<TradeCommit, TradeError> {
        let _guard = self.locks.acquire(request.account_id).await;
        let attempts = self.max_retries + 1;

        for attempt in 1..=attempts {
            let commit = self.prepare(request, order, Utc::now()).await?;

            match self.ledger.commit_trade(&commit).await? {
                CommitOutcome::Applied => {
                    info!(
                        account_id = %request.account_id,
                        stock_id = %request.stock_id,
                        side = %request.side,
                        quantity = %request.quantity,
                        price = %request.price_per_share,
                        transaction_id = %commit.transaction.id,
                        "Trade applied"
                    );
                    return Ok(commit);
                }
                CommitOutcome::OrderNotPending => {
                    let order_id = order.map(|o| o.id).unwrap_or_default();
                    info!(order_id = %order_id, "Order left PENDING before its trade committed");
                    return Err(TradeError::OrderNotPending(order_id));
                }
                CommitOutcome::StaleVersion => {
                    warn!(
                        account_id = %request.account_id,
                        "Ledger version conflict (attempt {}/{})",
                        attempt,
                        attempts
                    );
                }
            }
        }

        Err(TradeError::ConcurrentModification {
            account_id: request.account_id,
            attempts,
        })
    }

    /// Read current state and compute the post-trade records
    async fn prepare(
        &self,
        request: &TradeRequest,
        order: Option<&Order>,
        now: DateTime<Utc>,
    ) -> Result<TradeCommit, TradeError> {
        let mut account = self
            .ledger
            .get_account(request.account_id)
            .await?
            .ok_or(TradeError::AccountNotFound(request.account_id))?;

        self.ledger
            .get_stock(request.stock_id)
            .await?
            .ok_or(TradeError::StockNotFound(request.stock_id))?;

        let existing = self
            .ledger
            .get_holding(request.account_id, request.stock_id)
            .await?;

        let notional = request.price_per_share.times(request.quantity)?;

        let holding = match request.side {
            TradeSide::Buy => {
                account.debit(notional)?;
                match existing {
                    Some(mut holding) => {
                        holding.apply_buy(request.quantity, request.price_per_share)?;
                        HoldingWrite::Update(holding)
                    }
                    None => HoldingWrite::Insert(Holding::open(
                        request.account_id,
                        request.stock_id,
                        request.quantity,
                        request.price_per_share,
                        now,
                    )?),
                }
            }
            TradeSide::Sell => {
                let mut holding = existing.ok_or(TradeError::InsufficientHolding {
                    requested: request.quantity.value(),
                    held: rust_decimal::Decimal::ZERO,
                })?;
                let gain = holding.apply_sell(request.quantity, request.price_per_share)?;
                debug!(account_id = %request.account_id, realized = %gain, "Sell realizes gain");
                account.credit(notional)?;
                HoldingWrite::Update(holding)
            }
        };

        let order_claim = match order {
            Some(order) => {
                let mut executed = order.clone();
                executed
                    .mark_executed(request.price_per_share, now)
                    .map_err(|_| TradeError::OrderNotPending(order.id))?;
                Some(executed)
            }
            None => None,
        };

        let mut transaction = Transaction::record(
            request.account_id,
            request.stock_id,
            order.map(|o| o.id),
            request.side,
            request.quantity,
            request.price_per_share,
        );
        transaction.created_at = now;

        Ok(TradeCommit {
            account,
            holding,
            transaction,
            order_claim,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::order::{OrderSide, OrderStatus};
    use crate::domain::errors::{StoreError, ValidationError};
    use crate::domain::repositories::order_repository::OrderRepository;
    use crate::test_support::TestLedger;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ten_pow(exp: u32) -> Decimal {
        Decimal::from_i128_with_scale(10_i128.pow(exp), 0)
    }

    fn buy(account_id: Uuid, stock_id: Uuid, qty: Decimal, price: Decimal) -> TradeRequest {
        TradeRequest {
            account_id,
            stock_id,
            side: TradeSide::Buy,
            quantity: Quantity::new(qty).unwrap(),
            price_per_share: Price::new(price).unwrap(),
        }
    }

    fn sell(account_id: Uuid, stock_id: Uuid, qty: Decimal, price: Decimal) -> TradeRequest {
        TradeRequest {
            side: TradeSide::Sell,
            ..buy(account_id, stock_id, qty, price)
        }
    }

    #[tokio::test]
    async fn test_buy_debits_cash_and_opens_holding() {
        let env = TestLedger::new().await;
        let account = env.account(dec!(1000)).await;
        let stock = env.stock("ACME").await;
        let processor = TransactionProcessor::new(env.ledger(), 3);

        let tx = processor
            .process(buy(account, stock, dec!(10), dec!(100)))
            .await
            .unwrap();

        assert_eq!(tx.side, TradeSide::Buy);
        assert_eq!(tx.notional().unwrap(), dec!(1000));
        assert_eq!(env.cash(account).await, Decimal::ZERO);

        let holding = env.holding(account, stock).await.unwrap();
        assert_eq!(holding.quantity, dec!(10));
        assert_eq!(holding.average_cost_basis, dec!(100));
        assert_eq!(holding.total_cost_basis, dec!(1000));
    }

    #[tokio::test]
    async fn test_buy_rejected_on_insufficient_funds() {
        let env = TestLedger::new().await;
        let account = env.account(dec!(999.99)).await;
        let stock = env.stock("ACME").await;
        let processor = TransactionProcessor::new(env.ledger(), 3);

        let err = processor
            .process(buy(account, stock, dec!(10), dec!(100)))
            .await
            .unwrap_err();

        assert!(err.is_rejection());
        assert_eq!(err.error_code(), "ERR_INSUFFICIENT_FUNDS");
        assert_eq!(env.cash(account).await, dec!(999.99));
        assert!(env.holding(account, stock).await.is_none());
        assert!(env.transactions(account).await.is_empty());
    }

    #[tokio::test]
    async fn test_sell_without_holding_rejected() {
        let env = TestLedger::new().await;
        let account = env.account(dec!(0)).await;
        let stock = env.stock("ACME").await;
        let processor = TransactionProcessor::new(env.ledger(), 3);

        let err = processor
            .process(sell(account, stock, dec!(1), dec!(10)))
            .await
            .unwrap_err();

        assert!(matches!(err, TradeError::InsufficientHolding { .. }));
        assert!(env.transactions(account).await.is_empty());
    }

    #[tokio::test]
    async fn test_sell_credits_proceeds() {
        let env = TestLedger::new().await;
        let account = env.account(dec!(1000)).await;
        let stock = env.stock("ACME").await;
        let processor = TransactionProcessor::new(env.ledger(), 3);

        processor
            .process(buy(account, stock, dec!(10), dec!(100)))
            .await
            .unwrap();
        processor
            .process(sell(account, stock, dec!(4), dec!(150)))
            .await
            .unwrap();

        assert_eq!(env.cash(account).await, dec!(600));
        let holding = env.holding(account, stock).await.unwrap();
        assert_eq!(holding.quantity, dec!(6));
        assert_eq!(holding.realized_gain, dec!(200));
        assert_eq!(env.transactions(account).await.len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_buy_is_rejected_without_writes() {
        let env = TestLedger::new().await;
        let account = env.account(dec!(1000)).await;
        let stock = env.stock("ACME").await;
        let processor = TransactionProcessor::new(env.ledger(), 3);

        let err = processor
            .process(buy(account, stock, ten_pow(28), dec!(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, TradeError::Validation(ValidationError::InvalidAmount(_))));
        assert_eq!(err.error_code(), "ERR_VALIDATION");
        assert_eq!(env.cash(account).await, dec!(1000));
        assert!(env.holding(account, stock).await.is_none());
        assert!(env.transactions(account).await.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_sell_proceeds_are_rejected_without_writes() {
        let env = TestLedger::new().await;
        let account = env.account(Decimal::MAX - dec!(1000)).await;
        let stock = env.stock("ACME").await;
        let processor = TransactionProcessor::new(env.ledger(), 3);
        processor
            .process(buy(account, stock, dec!(10), dec!(100)))
            .await
            .unwrap();

        let err = processor
            .process(sell(account, stock, dec!(10), ten_pow(27)))
            .await
            .unwrap_err();

        assert!(matches!(err, TradeError::Validation(_)));
        assert_eq!(env.cash(account).await, Decimal::MAX - dec!(2000));
        assert_eq!(env.holding(account, stock).await.unwrap().quantity, dec!(10));
        assert_eq!(env.transactions(account).await.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_account_and_stock() {
        let env = TestLedger::new().await;
        let account = env.account(dec!(10)).await;
        let processor = TransactionProcessor::new(env.ledger(), 3);

        let missing_account = Uuid::new_v4();
        let err = processor
            .process(buy(missing_account, Uuid::new_v4(), dec!(1), dec!(1)))
            .await
            .unwrap_err();
        assert_eq!(err, TradeError::AccountNotFound(missing_account));

        let missing_stock = Uuid::new_v4();
        let err = processor
            .process(buy(account, missing_stock, dec!(1), dec!(1)))
            .await
            .unwrap_err();
        assert_eq!(err, TradeError::StockNotFound(missing_stock));
    }

    #[tokio::test]
    async fn test_execute_order_claims_pending_order() {
        let env = TestLedger::new().await;
        let account = env.account(dec!(1000)).await;
        let stock = env.stock("ACME").await;
        let order = env
            .pending_order(account, stock, OrderSide::BuyLimit, dec!(10), dec!(50))
            .await;
        let processor = TransactionProcessor::new(env.ledger(), 3);

        let (executed, tx) = processor
            .execute_order(&order, Price::new(dec!(48)).unwrap())
            .await
            .unwrap();

        assert_eq!(executed.status, OrderStatus::Executed);
        assert_eq!(executed.execution_price.unwrap().value(), dec!(48));
        assert_eq!(tx.order_id, Some(order.id));
        assert_eq!(tx.created_at, executed.executed_at.unwrap());

        let stored = env.orders().get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Executed);
        assert_eq!(env.cash(account).await, dec!(520));
    }

    #[tokio::test]
    async fn test_execute_cancelled_order_is_noop() {
        let env = TestLedger::new().await;
        let account = env.account(dec!(1000)).await;
        let stock = env.stock("ACME").await;
        let order = env
            .pending_order(account, stock, OrderSide::BuyLimit, dec!(10), dec!(50))
            .await;

        // cancel lands after the scheduler already read the order as pending
        let mut cancelled = order.clone();
        cancelled.mark_cancelled(Utc::now()).unwrap();
        assert!(env.orders().transition_from_pending(&cancelled).await.unwrap());

        let processor = TransactionProcessor::new(env.ledger(), 3);
        let err = processor
            .execute_order(&order, Price::new(dec!(48)).unwrap())
            .await
            .unwrap_err();

        assert_eq!(err, TradeError::OrderNotPending(order.id));
        assert_eq!(env.cash(account).await, dec!(1000));
        assert!(env.transactions(account).await.is_empty());
        assert!(env.holding(account, stock).await.is_none());
    }

    /// Ledger that reports a version conflict for the first `conflicts` commits
    struct ConflictingLedger {
        inner: Arc<dyn LedgerRepository>,
        conflicts: AtomicU32,
        commits: AtomicU32,
    }

    #[async_trait]
    impl LedgerRepository for ConflictingLedger {
        async fn insert_account(
            &self,
            account: &crate::domain::entities::account::Account,
        ) -> Result<(), StoreError> {
            self.inner.insert_account(account).await
        }
        async fn get_account(
            &self,
            id: Uuid,
        ) -> Result<Option<crate::domain::entities::account::Account>, StoreError> {
            self.inner.get_account(id).await
        }
        async fn insert_stock(
            &self,
            stock: &crate::domain::entities::stock::Stock,
        ) -> Result<(), StoreError> {
            self.inner.insert_stock(stock).await
        }
        async fn get_stock(
            &self,
            id: Uuid,
        ) -> Result<Option<crate::domain::entities::stock::Stock>, StoreError> {
            self.inner.get_stock(id).await
        }
        async fn get_holding(
            &self,
            account_id: Uuid,
            stock_id: Uuid,
        ) -> Result<Option<Holding>, StoreError> {
            self.inner.get_holding(account_id, stock_id).await
        }
        async fn holdings_for_account(&self, account_id: Uuid) -> Result<Vec<Holding>, StoreError> {
            self.inner.holdings_for_account(account_id).await
        }
        async fn holders_of(&self, stock_id: Uuid) -> Result<Vec<Holding>, StoreError> {
            self.inner.holders_of(stock_id).await
        }
        async fn transactions_for_account(
            &self,
            account_id: Uuid,
        ) -> Result<Vec<Transaction>, StoreError> {
            self.inner.transactions_for_account(account_id).await
        }
        async fn commit_trade(&self, commit: &TradeCommit) -> Result<CommitOutcome, StoreError> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            let remaining = self.conflicts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts.store(remaining - 1, Ordering::SeqCst);
                return Ok(CommitOutcome::StaleVersion);
            }
            self.inner.commit_trade(commit).await
        }
    }

    #[tokio::test]
    async fn test_version_conflict_is_retried() {
        let env = TestLedger::new().await;
        let account = env.account(dec!(100)).await;
        let stock = env.stock("ACME").await;
        let ledger = Arc::new(ConflictingLedger {
            inner: env.ledger(),
            conflicts: AtomicU32::new(2),
            commits: AtomicU32::new(0),
        });
        let processor = TransactionProcessor::new(ledger.clone(), 3);

        processor
            .process(buy(account, stock, dec!(1), dec!(10)))
            .await
            .unwrap();

        assert_eq!(ledger.commits.load(Ordering::SeqCst), 3);
        assert_eq!(env.cash(account).await, dec!(90));
    }

    #[tokio::test]
    async fn test_persistent_conflict_surfaces_concurrent_modification() {
        let env = TestLedger::new().await;
        let account = env.account(dec!(100)).await;
        let stock = env.stock("ACME").await;
        let ledger = Arc::new(ConflictingLedger {
            inner: env.ledger(),
            conflicts: AtomicU32::new(u32::MAX),
            commits: AtomicU32::new(0),
        });
        let processor = TransactionProcessor::new(ledger.clone(), 2);

        let err = processor
            .process(buy(account, stock, dec!(1), dec!(10)))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TradeError::ConcurrentModification {
                account_id: account,
                attempts: 3
            }
        );
        assert_eq!(ledger.commits.load(Ordering::SeqCst), 3);
        assert_eq!(env.cash(account).await, dec!(100));
    }
}
