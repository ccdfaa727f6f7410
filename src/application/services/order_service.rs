//! Order placement, query and cancellation

use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::order::{Order, OrderSide};
use crate::domain::errors::OrderError;
use crate::domain::repositories::ledger_repository::LedgerRepository;
use crate::domain::repositories::order_repository::OrderRepository;
use crate::domain::value_objects::{price::Price, quantity::Quantity};

/// Unvalidated order placement input
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub account_id: Uuid,
    pub stock_id: Uuid,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub limit_price: Decimal,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    ledger: Arc<dyn LedgerRepository>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, ledger: Arc<dyn LedgerRepository>) -> Self {
        Self { orders, ledger }
    }

    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order, OrderError> {
        let quantity = Quantity::new(request.quantity)?;
        let limit_price = Price::new(request.limit_price)?;
        limit_price.times(quantity)?;

        self.ledger
            .get_account(request.account_id)
            .await?
            .ok_or(OrderError::AccountNotFound(request.account_id))?;
        self.ledger
            .get_stock(request.stock_id)
            .await?
            .ok_or(OrderError::StockNotFound(request.stock_id))?;

        let order = Order::new(
            request.account_id,
            request.stock_id,
            request.side,
            quantity,
            limit_price,
        );
        self.orders.insert(&order).await?;

        info!(
            order_id = %order.id,
            account_id = %order.account_id,
            side = %order.side,
            quantity = %order.quantity,
            limit = %order.limit_price,
            "Limit order placed"
        );
        Ok(order)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order, OrderError> {
        self.orders.get(id).await?.ok_or(OrderError::NotFound(id))
    }

    /// Newest first
    pub async fn list_orders(
        &self,
        account_id: Uuid,
        pending_only: bool,
    ) -> Result<Vec<Order>, OrderError> {
        self.ledger
            .get_account(account_id)
            .await?
            .ok_or(OrderError::AccountNotFound(account_id))?;

        Ok(self.orders.list_for_account(account_id, pending_only).await?)
    }

    /// Cancel a pending order. Losing a race against execution leaves the
    /// order untouched and reports its current status.
    pub async fn cancel_order(&self, id: Uuid) -> Result<Order, OrderError> {
        let order = self.get_order(id).await?;
        let mut cancelled = order.clone();
        cancelled
            .mark_cancelled(chrono::Utc::now())
            .map_err(|e| OrderError::NotPending { id, status: e.from })?;

        if self.orders.transition_from_pending(&cancelled).await? {
            info!(order_id = %id, "Order cancelled");
            return Ok(cancelled);
        }

        let current = self.get_order(id).await?;
        Err(OrderError::NotPending {
            id,
            status: current.status,
        })
    }
}
