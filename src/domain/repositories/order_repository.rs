//! Order Repository Trait
//!
//! Storage seam for limit orders. Every status change goes through
//! `transition_from_pending`, a compare-and-swap on `status = PENDING`, so
//! a cancel request and the scheduler can race safely: exactly one of them
//! observes the order as pending and commits.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::order::Order;
use crate::domain::errors::StoreError;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Order>, StoreError>;

    /// Orders of one account, newest first
    async fn list_for_account(
        &self,
        account_id: Uuid,
        pending_only: bool,
    ) -> Result<Vec<Order>, StoreError>;

    /// All pending orders, oldest created first
    async fn list_pending(&self) -> Result<Vec<Order>, StoreError>;

    /// Persist `order`'s terminal state if the stored row is still pending.
    ///
    /// Returns `false` (and writes nothing) when another writer already moved
    /// the order out of `PENDING`.
    async fn transition_from_pending(&self, order: &Order) -> Result<bool, StoreError>;
}
