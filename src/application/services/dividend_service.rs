//! Dividend announcement: persist the dividend, then distribute it

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::entities::dividend::{Dividend, DividendPayment};
use crate::domain::errors::DividendError;
use crate::domain::repositories::dividend_repository::DividendRepository;
use crate::domain::repositories::ledger_repository::LedgerRepository;
use crate::domain::services::dividend_distributor::{DistributionSummary, DividendDistributor};
use crate::domain::value_objects::price::Price;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceDividend {
    pub stock_id: Uuid,
    pub amount_per_share: Decimal,
    pub pay_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub dividend: Dividend,
    pub distribution: DistributionSummary,
}

pub struct DividendService {
    ledger: Arc<dyn LedgerRepository>,
    dividends: Arc<dyn DividendRepository>,
    distributor: Arc<DividendDistributor>,
}

impl DividendService {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        dividends: Arc<dyn DividendRepository>,
        distributor: Arc<DividendDistributor>,
    ) -> Self {
        Self {
            ledger,
            dividends,
            distributor,
        }
    }

    pub async fn announce_dividend(
        &self,
        request: AnnounceDividend,
    ) -> Result<Announcement, DividendError> {
        let amount = Price::new(request.amount_per_share)?;
        self.ledger
            .get_stock(request.stock_id)
            .await?
            .ok_or(DividendError::StockNotFound(request.stock_id))?;

        let dividend = Dividend::announce(request.stock_id, amount, request.pay_date);
        self.dividends.insert_dividend(&dividend).await?;
        info!(
            dividend_id = %dividend.id,
            stock_id = %dividend.stock_id,
            per_share = %dividend.amount_per_share,
            pay_date = %dividend.pay_date,
            "Dividend announced"
        );

        let distribution = self.distributor.distribute(dividend.id).await?;
        Ok(Announcement {
            dividend,
            distribution,
        })
    }

    /// Re-run distribution for an existing dividend; only missing payments are created
    pub async fn redistribute(&self, dividend_id: Uuid) -> Result<DistributionSummary, DividendError> {
        self.distributor.distribute(dividend_id).await
    }

    pub async fn payments_for(&self, dividend_id: Uuid) -> Result<Vec<DividendPayment>, DividendError> {
        self.dividends
            .get_dividend(dividend_id)
            .await?
            .ok_or(DividendError::NotFound(dividend_id))?;
        Ok(self.dividends.payments_for_dividend(dividend_id).await?)
    }
}
