use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::dividend::{Dividend, DividendPayment};
use crate::domain::errors::StoreError;

#[async_trait]
pub trait DividendRepository: Send + Sync {
    async fn insert_dividend(&self, dividend: &Dividend) -> Result<(), StoreError>;

    async fn get_dividend(&self, id: Uuid) -> Result<Option<Dividend>, StoreError>;

    async fn payment_exists(&self, account_id: Uuid, dividend_id: Uuid) -> Result<bool, StoreError>;

    /// Insert unless a payment for (account, dividend) already exists.
    /// Returns whether a row was written.
    async fn insert_payment(&self, payment: &DividendPayment) -> Result<bool, StoreError>;

    async fn payments_for_dividend(
        &self,
        dividend_id: Uuid,
    ) -> Result<Vec<DividendPayment>, StoreError>;
}
