//! Shared fixtures for unit tests: an in-memory ledger plus scripted
//! price oracle and notifier doubles.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::entities::account::Account;
use crate::domain::entities::holding::Holding;
use crate::domain::entities::order::{Order, OrderSide};
use crate::domain::entities::stock::Stock;
use crate::domain::entities::transaction::{TradeSide, Transaction};
use crate::domain::errors::{NotifyError, PriceError};
use crate::domain::repositories::dividend_repository::DividendRepository;
use crate::domain::repositories::ledger_repository::LedgerRepository;
use crate::domain::repositories::notifier::{NotificationEvent, Notifier};
use crate::domain::repositories::order_repository::OrderRepository;
use crate::domain::repositories::price_oracle::PriceOracle;
use crate::domain::services::transaction_processor::{TradeRequest, TransactionProcessor};
use crate::domain::value_objects::{price::Price, quantity::Quantity};
use crate::persistence::{
    init_database, DbPool, SqliteDividendRepository, SqliteLedgerRepository,
    SqliteOrderRepository,
};

pub struct TestLedger {
    pub pool: DbPool,
    ledger: Arc<dyn LedgerRepository>,
    orders: Arc<dyn OrderRepository>,
    dividends: Arc<dyn DividendRepository>,
}

impl TestLedger {
    pub async fn new() -> Self {
        let pool = init_database("sqlite::memory:").await.unwrap();
        Self {
            ledger: Arc::new(SqliteLedgerRepository::new(pool.clone())),
            orders: Arc::new(SqliteOrderRepository::new(pool.clone())),
            dividends: Arc::new(SqliteDividendRepository::new(pool.clone())),
            pool,
        }
    }

    pub fn ledger(&self) -> Arc<dyn LedgerRepository> {
        self.ledger.clone()
    }

    pub fn orders(&self) -> Arc<dyn OrderRepository> {
        self.orders.clone()
    }

    pub fn dividends(&self) -> Arc<dyn DividendRepository> {
        self.dividends.clone()
    }

    pub async fn account(&self, cash: Decimal) -> Uuid {
        let account = Account::open(cash).unwrap();
        self.ledger.insert_account(&account).await.unwrap();
        account.id
    }

    pub async fn stock(&self, symbol: &str) -> Uuid {
        let stock = Stock::new(symbol).unwrap();
        self.ledger.insert_stock(&stock).await.unwrap();
        stock.id
    }

    pub async fn cash(&self, account_id: Uuid) -> Decimal {
        self.ledger
            .get_account(account_id)
            .await
            .unwrap()
            .unwrap()
            .cash_balance
    }

    pub async fn holding(&self, account_id: Uuid, stock_id: Uuid) -> Option<Holding> {
        self.ledger.get_holding(account_id, stock_id).await.unwrap()
    }

    pub async fn transactions(&self, account_id: Uuid) -> Vec<Transaction> {
        self.ledger
            .transactions_for_account(account_id)
            .await
            .unwrap()
    }

    pub async fn pending_order(
        &self,
        account_id: Uuid,
        stock_id: Uuid,
        side: OrderSide,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> Order {
        let order = Order::new(
            account_id,
            stock_id,
            side,
            Quantity::new(quantity).unwrap(),
            Price::new(limit_price).unwrap(),
        );
        self.orders.insert(&order).await.unwrap();
        order
    }

    pub async fn buy(&self, account_id: Uuid, stock_id: Uuid, quantity: Decimal, price: Decimal) {
        self.trade(account_id, stock_id, TradeSide::Buy, quantity, price)
            .await;
    }

    pub async fn sell(&self, account_id: Uuid, stock_id: Uuid, quantity: Decimal, price: Decimal) {
        self.trade(account_id, stock_id, TradeSide::Sell, quantity, price)
            .await;
    }

    async fn trade(
        &self,
        account_id: Uuid,
        stock_id: Uuid,
        side: TradeSide,
        quantity: Decimal,
        price: Decimal,
    ) {
        TransactionProcessor::new(self.ledger(), 0)
            .process(TradeRequest {
                account_id,
                stock_id,
                side,
                quantity: Quantity::new(quantity).unwrap(),
                price_per_share: Price::new(price).unwrap(),
            })
            .await
            .unwrap();
    }
}

type LookupHook = Arc<dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync>;

/// Price oracle answering from a fixed table
#[derive(Default)]
pub struct ScriptedPriceOracle {
    prices: Mutex<HashMap<String, Decimal>>,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    lookups: Mutex<Vec<String>>,
    hook: Mutex<Option<LookupHook>>,
}

impl ScriptedPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, symbol: &str, price: Decimal) -> Self {
        self.set_price(symbol, price);
        self
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub fn fail(&self, symbol: &str) {
        self.failing.lock().unwrap().insert(symbol.to_string());
    }

    pub fn recover(&self, symbol: &str) {
        self.failing.lock().unwrap().remove(symbol);
    }

    pub fn delay(&self, symbol: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(symbol.to_string(), delay);
    }

    /// Await `hook` at the start of every lookup
    pub fn on_lookup<F, Fut>(&self, hook: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let hook: LookupHook =
            Arc::new(move |symbol: String| -> BoxFuture<'static, ()> { Box::pin(hook(symbol)) });
        *self.hook.lock().unwrap() = Some(hook);
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceOracle for ScriptedPriceOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn current_price(&self, symbol: &str) -> Result<Price, PriceError> {
        self.lookups.lock().unwrap().push(symbol.to_string());
        let hook = self.hook.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook(symbol.to_string()).await;
        }

        let delay = self.delays.lock().unwrap().get(symbol).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().unwrap().contains(symbol) {
            return Err(PriceError::Unavailable {
                symbol: symbol.to_string(),
                reason: "scripted outage".to_string(),
            });
        }

        let price = self.prices.lock().unwrap().get(symbol).copied();
        match price {
            Some(p) => Price::new(p).map_err(|e| PriceError::InvalidResponse {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            }),
            None => Err(PriceError::Unavailable {
                symbol: symbol.to_string(),
                reason: "no quote".to_string(),
            }),
        }
    }
}

/// Notifier that keeps every published event
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(String, NotificationEvent)>>,
    reject: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(String, NotificationEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn reject_all(&self) {
        *self.reject.lock().unwrap() = true;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, topic: &str, event: &NotificationEvent) -> Result<(), NotifyError> {
        if *self.reject.lock().unwrap() {
            return Err(NotifyError::Rejected {
                topic: topic.to_string(),
                reason: "rejecting".to_string(),
            });
        }
        self.events
            .lock()
            .unwrap()
            .push((topic.to_string(), event.clone()));
        Ok(())
    }
}
