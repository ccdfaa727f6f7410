//! Price Oracle Trait
//!
//! Current-price lookup used by the limit order scheduler. Implementations
//! may fail or hang; callers bound every lookup with a timeout.

use async_trait::async_trait;

use crate::domain::errors::PriceError;
use crate::domain::value_objects::price::Price;

#[async_trait]
pub trait PriceOracle: Send + Sync {
    fn name(&self) -> &str;

    async fn current_price(&self, symbol: &str) -> Result<Price, PriceError>;
}
