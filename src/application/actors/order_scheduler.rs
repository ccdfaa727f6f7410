//! Limit Order Scheduler
//!
//! Periodically re-evaluates every pending limit order against the price
//! oracle and hands triggered orders to the transaction processor. Runs as
//! a long-lived actor: an interval ticker plus a control channel for
//! on-demand ticks and shutdown.
//!
//! Within a tick:
//! - one price lookup per distinct symbol, bounded fan-out, each lookup
//!   under its own timeout
//! - triggered orders grouped by account; groups run concurrently, orders
//!   inside a group run oldest first
//! - a failure on one order never aborts the rest of the tick

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::entities::order::Order;
use crate::domain::errors::{PriceError, StoreError, TradeError};
use crate::domain::repositories::ledger_repository::LedgerRepository;
use crate::domain::repositories::notifier::{NotificationEvent, Notifier, OrderExecutedEvent};
use crate::domain::repositories::order_repository::OrderRepository;
use crate::domain::repositories::price_oracle::PriceOracle;
use crate::domain::services::transaction_processor::TransactionProcessor;
use crate::domain::value_objects::price::Price;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub price_timeout: Duration,
    /// Consecutive ticks without a price before an order is failed; `None` retries forever
    pub max_price_failures: Option<u32>,
    pub max_parallel_accounts: usize,
    pub max_concurrent_price_lookups: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            price_timeout: Duration::from_millis(5000),
            max_price_failures: None,
            max_parallel_accounts: 4,
            max_concurrent_price_lookups: 8,
        }
    }
}

/// Counts for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub pending: usize,
    pub triggered: usize,
    pub executed: usize,
    pub failed: usize,
    /// No price this tick; still pending
    pub skipped: usize,
    /// Left PENDING through another writer before its trade committed
    pub superseded: usize,
}

impl TickSummary {
    fn absorb(&mut self, other: TickSummary) {
        self.executed += other.executed;
        self.failed += other.failed;
        self.superseded += other.superseded;
    }
}

pub struct LimitOrderScheduler {
    orders: Arc<dyn OrderRepository>,
    ledger: Arc<dyn LedgerRepository>,
    processor: Arc<TransactionProcessor>,
    oracle: Arc<dyn PriceOracle>,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    /// Consecutive price failures per pending order
    price_failures: Mutex<HashMap<Uuid, u32>>,
}

impl LimitOrderScheduler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        ledger: Arc<dyn LedgerRepository>,
        processor: Arc<TransactionProcessor>,
        oracle: Arc<dyn PriceOracle>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            orders,
            ledger,
            processor,
            oracle,
            notifier,
            config,
            price_failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Evaluate every pending order once.
    ///
    /// Only a failure to load the pending set fails the tick; everything
    /// after that is isolated per symbol, per account and per order.
    pub async fn run_tick(&self) -> Result<TickSummary, StoreError> {
        let pending = self.orders.list_pending().await?;
        let mut summary = TickSummary {
            pending: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            self.forget_failures(&HashSet::new());
            debug!("No pending orders");
            return Ok(summary);
        }

        let (symbols, missing_stocks) = self.resolve_symbols(&pending).await;
        let prices = self.fetch_prices(symbols.values().cloned().collect()).await;

        let mut groups: Vec<(Uuid, Vec<(Order, Price)>)> = Vec::new();
        let mut group_index: HashMap<Uuid, usize> = HashMap::new();

        for order in pending.iter() {
            if missing_stocks.contains(&order.stock_id) {
                let reason = TradeError::StockNotFound(order.stock_id).to_string();
                if self.fail_order(order, &reason).await {
                    summary.failed += 1;
                } else {
                    summary.superseded += 1;
                }
                continue;
            }
            let Some(symbol) = symbols.get(&order.stock_id) else {
                // stock row unreadable this tick, evaluated again next tick
                summary.skipped += 1;
                continue;
            };

            let price = match prices.get(symbol) {
                Some(Ok(price)) => *price,
                Some(Err(e)) => {
                    warn!(order_id = %order.id, symbol = %symbol, "Skipping order: {}", e);
                    if self.record_price_failure(order, symbol).await {
                        summary.failed += 1;
                    } else {
                        summary.skipped += 1;
                    }
                    continue;
                }
                None => {
                    summary.skipped += 1;
                    continue;
                }
            };

            self.clear_price_failure(order.id);

            if !order.is_triggered_at(price) {
                debug!(
                    order_id = %order.id,
                    symbol = %symbol,
                    side = %order.side,
                    limit = %order.limit_price,
                    current = %price,
                    "Not triggered"
                );
                continue;
            }

            summary.triggered += 1;
            let slot = *group_index.entry(order.account_id).or_insert_with(|| {
                groups.push((order.account_id, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push((order.clone(), price));
        }

        let outcomes: Vec<TickSummary> = stream::iter(groups)
            .map(|(account_id, batch)| self.run_account(account_id, batch, &symbols))
            .buffer_unordered(self.config.max_parallel_accounts.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            summary.absorb(outcome);
        }

        let still_pending: HashSet<Uuid> = pending.iter().map(|o| o.id).collect();
        self.forget_failures(&still_pending);

        info!(
            pending = summary.pending,
            triggered = summary.triggered,
            executed = summary.executed,
            failed = summary.failed,
            skipped = summary.skipped,
            superseded = summary.superseded,
            "Scheduler tick complete"
        );

        Ok(summary)
    }

    /// Symbol per referenced stock, plus the stocks that no longer exist
    async fn resolve_symbols(&self, pending: &[Order]) -> (HashMap<Uuid, String>, HashSet<Uuid>) {
        let stock_ids: HashSet<Uuid> = pending.iter().map(|o| o.stock_id).collect();
        let mut symbols = HashMap::with_capacity(stock_ids.len());
        let mut missing = HashSet::new();

        for stock_id in stock_ids {
            match self.ledger.get_stock(stock_id).await {
                Ok(Some(stock)) => {
                    symbols.insert(stock_id, stock.symbol);
                }
                Ok(None) => {
                    error!(stock_id = %stock_id, "Pending orders reference a missing stock");
                    missing.insert(stock_id);
                }
                Err(e) => {
                    warn!(stock_id = %stock_id, "Failed to load stock: {}", e);
                }
            }
        }

        (symbols, missing)
    }

    async fn fetch_prices(&self, symbols: HashSet<String>) -> HashMap<String, Result<Price, PriceError>> {
        let oracle = &self.oracle;
        let limit = self.config.price_timeout;

        stream::iter(symbols)
            .map(|symbol| async move {
                let result = match timeout(limit, oracle.current_price(&symbol)).await {
                    Ok(result) => result,
                    Err(_) => Err(PriceError::Timeout {
                        symbol: symbol.clone(),
                        after_ms: limit.as_millis() as u64,
                    }),
                };
                (symbol, result)
            })
            .buffer_unordered(self.config.max_concurrent_price_lookups.max(1))
            .collect()
            .await
    }

    /// Execute one account's triggered orders in order
    async fn run_account(
        &self,
        account_id: Uuid,
        batch: Vec<(Order, Price)>,
        symbols: &HashMap<Uuid, String>,
    ) -> TickSummary {
        let mut summary = TickSummary::default();

        for (order, price) in batch {
            match self.processor.execute_order(&order, price).await {
                Ok((executed, transaction)) => {
                    summary.executed += 1;
                    info!(
                        order_id = %order.id,
                        account_id = %account_id,
                        side = %order.side,
                        quantity = %order.quantity,
                        price = %price,
                        "Limit order executed"
                    );

                    let event = NotificationEvent::OrderExecuted(OrderExecutedEvent {
                        order_id: executed.id,
                        account_id,
                        stock_symbol: symbols.get(&order.stock_id).cloned().unwrap_or_default(),
                        side: executed.side,
                        quantity: executed.quantity.value(),
                        execution_price: price.value(),
                        executed_at: executed.executed_at.unwrap_or(transaction.created_at),
                    });
                    if let Err(e) = self.notifier.publish(&event.topic(), &event).await {
                        warn!(order_id = %order.id, "Failed to publish execution: {}", e);
                    }
                }
                Err(TradeError::OrderNotPending(_)) => {
                    info!(order_id = %order.id, "Order left PENDING before execution, skipped");
                    summary.superseded += 1;
                }
                Err(e) => {
                    error!(
                        order_id = %order.id,
                        account_id = %account_id,
                        code = e.error_code(),
                        severity = %e.severity(),
                        "Order execution failed: {}",
                        e
                    );
                    if self.fail_order(&order, &e.to_string()).await {
                        summary.failed += 1;
                    } else {
                        summary.superseded += 1;
                    }
                }
            }
        }

        summary
    }

    /// Move `order` to FAILED if it is still pending
    async fn fail_order(&self, order: &Order, reason: &str) -> bool {
        let mut failed = order.clone();
        if failed.mark_failed(reason).is_err() {
            return false;
        }

        match self.orders.transition_from_pending(&failed).await {
            Ok(true) => {
                warn!(order_id = %order.id, reason = %reason, "Order marked FAILED");
                true
            }
            Ok(false) => {
                debug!(order_id = %order.id, "Order already left PENDING, failure dropped");
                false
            }
            Err(e) => {
                error!(order_id = %order.id, "Failed to mark order FAILED: {}", e);
                false
            }
        }
    }

    /// Count a missed price; returns true when the order was failed for it
    async fn record_price_failure(&self, order: &Order, symbol: &str) -> bool {
        let Some(max) = self.config.max_price_failures else {
            return false;
        };

        let attempts = {
            let mut failures = match self.price_failures.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let count = failures.entry(order.id).or_insert(0);
            *count += 1;
            *count
        };

        if attempts < max {
            return false;
        }

        let reason = format!("price unavailable for {} after {} attempts", symbol, attempts);
        let failed = self.fail_order(order, &reason).await;
        self.clear_price_failure(order.id);
        failed
    }

    fn clear_price_failure(&self, order_id: Uuid) {
        if let Ok(mut failures) = self.price_failures.lock() {
            failures.remove(&order_id);
        }
    }

    /// Drop counters for orders that are no longer pending
    fn forget_failures(&self, still_pending: &HashSet<Uuid>) {
        if let Ok(mut failures) = self.price_failures.lock() {
            failures.retain(|id, _| still_pending.contains(id));
        }
    }
}

/// Control messages for the scheduler actor
#[derive(Debug)]
pub enum SchedulerMessage {
    /// Run one tick immediately and report its summary
    RunNow {
        reply: mpsc::Sender<Result<TickSummary, String>>,
    },
    Shutdown,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SchedulerError {
    #[error("Scheduler is not running")]
    Stopped,

    #[error("Scheduler tick failed: {0}")]
    TickFailed(String),
}

/// Cloneable handle to a running scheduler actor
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<SchedulerMessage>,
}

impl SchedulerHandle {
    pub async fn run_now(&self) -> Result<TickSummary, SchedulerError> {
        let (reply, mut rx) = mpsc::channel(1);
        self.tx
            .send(SchedulerMessage::RunNow { reply })
            .await
            .map_err(|_| SchedulerError::Stopped)?;

        match rx.recv().await {
            Some(Ok(summary)) => Ok(summary),
            Some(Err(e)) => Err(SchedulerError::TickFailed(e)),
            None => Err(SchedulerError::Stopped),
        }
    }

    pub async fn shutdown(&self) {
        if self.tx.send(SchedulerMessage::Shutdown).await.is_err() {
            debug!("Scheduler already stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Actor that owns the ticker
pub struct SchedulerActor {
    scheduler: Arc<LimitOrderScheduler>,
}

impl SchedulerActor {
    pub fn new(scheduler: Arc<LimitOrderScheduler>) -> Self {
        Self { scheduler }
    }

    async fn tick(&self) -> Result<TickSummary, String> {
        self.scheduler.run_tick().await.map_err(|e| {
            error!("Scheduler tick failed: {}", e);
            e.to_string()
        })
    }

    pub async fn run(self, mut rx: mpsc::Receiver<SchedulerMessage>) {
        let period = self.scheduler.config().interval;
        info!("Starting limit order scheduler with interval {:?}", period);

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = self.tick().await;
                }

                msg = rx.recv() => {
                    match msg {
                        Some(SchedulerMessage::RunNow { reply }) => {
                            let result = self.tick().await;
                            if reply.send(result).await.is_err() {
                                debug!("RunNow caller went away before the summary");
                            }
                        }
                        Some(SchedulerMessage::Shutdown) => {
                            info!("Limit order scheduler shutting down");
                            break;
                        }
                        None => {
                            info!("Scheduler control channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Spawn the scheduler actor
pub fn spawn_order_scheduler(scheduler: Arc<LimitOrderScheduler>) -> (SchedulerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<SchedulerMessage>(16);
    let actor = SchedulerActor::new(scheduler);
    let join = tokio::spawn(async move {
        actor.run(rx).await;
    });
    (SchedulerHandle { tx }, join)
}
