//! DividendDistributor - creates exactly one payment per current holder of a
//! dividend's stock

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::errors::DividendError;
use crate::domain::repositories::dividend_repository::DividendRepository;
use crate::domain::repositories::ledger_repository::LedgerRepository;
use crate::domain::repositories::notifier::{DividendPaidEvent, NotificationEvent, Notifier};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSummary {
    pub dividend_id: Uuid,
    pub holders: usize,
    pub created: usize,
    pub skipped: usize,
    /// Holders whose payment could not be computed; retried on the next run
    pub failed: usize,
    pub total_paid: Decimal,
}

pub struct DividendDistributor {
    ledger: Arc<dyn LedgerRepository>,
    dividends: Arc<dyn DividendRepository>,
    notifier: Arc<dyn Notifier>,
}

impl DividendDistributor {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        dividends: Arc<dyn DividendRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            ledger,
            dividends,
            notifier,
        }
    }

    /// Pay `dividend_id` to every account holding its stock right now.
    ///
    /// Safe to invoke repeatedly: holders that already have a payment for
    /// this dividend are skipped, and the store refuses duplicate
    /// (account, dividend) rows if two invocations overlap. Cash balances are
    /// not touched.
    pub async fn distribute(&self, dividend_id: Uuid) -> Result<DistributionSummary, DividendError> {
        let dividend = self
            .dividends
            .get_dividend(dividend_id)
            .await?
            .ok_or(DividendError::NotFound(dividend_id))?;

        let stock = self
            .ledger
            .get_stock(dividend.stock_id)
            .await?
            .ok_or(DividendError::StockNotFound(dividend.stock_id))?;

        let holders: Vec<_> = self
            .ledger
            .holders_of(stock.id)
            .await?
            .into_iter()
            .filter(|h| h.quantity > Decimal::ZERO)
            .collect();

        let mut summary = DistributionSummary {
            dividend_id,
            holders: holders.len(),
            ..Default::default()
        };

        for holding in &holders {
            if self
                .dividends
                .payment_exists(holding.account_id, dividend.id)
                .await?
            {
                debug!(
                    account_id = %holding.account_id,
                    dividend_id = %dividend.id,
                    "Payment already exists, skipping"
                );
                summary.skipped += 1;
                continue;
            }

            let payment = match dividend.payment_for(holding) {
                Ok(payment) => payment,
                Err(e) => {
                    error!(
                        account_id = %holding.account_id,
                        dividend_id = %dividend.id,
                        "Cannot compute dividend payment: {}", e
                    );
                    summary.failed += 1;
                    continue;
                }
            };
            if !self.dividends.insert_payment(&payment).await? {
                summary.skipped += 1;
                continue;
            }

            summary.created += 1;
            summary.total_paid = summary.total_paid.saturating_add(payment.total_amount);

            let event = NotificationEvent::DividendPaid(DividendPaidEvent {
                payment_id: payment.id,
                dividend_id: dividend.id,
                account_id: payment.account_id,
                stock_symbol: stock.symbol.clone(),
                share_quantity: payment.share_quantity,
                total_amount: payment.total_amount,
                payment_date: payment.payment_date,
            });
            if let Err(e) = self.notifier.publish(&event.topic(), &event).await {
                warn!(payment_id = %payment.id, "Failed to publish dividend payment: {}", e);
            }
        }

        info!(
            dividend_id = %dividend.id,
            symbol = %stock.symbol,
            holders = summary.holders,
            created = summary.created,
            skipped = summary.skipped,
            failed = summary.failed,
            total_paid = %summary.total_paid,
            "Dividend distributed"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::dividend::Dividend;
    use crate::domain::repositories::notifier::dividend_topic;
    use crate::domain::value_objects::price::Price;
    use crate::test_support::{RecordingNotifier, TestLedger};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    async fn announce(env: &TestLedger, stock: Uuid, per_share: Decimal) -> Dividend {
        let dividend = Dividend::announce(
            stock,
            Price::new(per_share).unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
        );
        env.dividends().insert_dividend(&dividend).await.unwrap();
        dividend
    }

    #[tokio::test]
    async fn test_one_payment_per_holder() {
        let env = TestLedger::new().await;
        let stock = env.stock("ACME").await;
        let other_stock = env.stock("OTHER").await;
        let alice = env.account(dec!(10000)).await;
        let bob = env.account(dec!(10000)).await;
        env.buy(alice, stock, dec!(10), dec!(20)).await;
        env.buy(bob, stock, dec!(4), dec!(25)).await;
        env.buy(bob, other_stock, dec!(100), dec!(1)).await;

        let notifier = Arc::new(RecordingNotifier::default());
        let distributor = DividendDistributor::new(env.ledger(), env.dividends(), notifier.clone());
        let dividend = announce(&env, stock, dec!(0.5)).await;

        let summary = distributor.distribute(dividend.id).await.unwrap();
        assert_eq!(summary.holders, 2);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.total_paid, dec!(7));

        let payments = env.dividends().payments_for_dividend(dividend.id).await.unwrap();
        assert_eq!(payments.len(), 2);
        let alice_payment = payments.iter().find(|p| p.account_id == alice).unwrap();
        assert_eq!(alice_payment.share_quantity, dec!(10));
        assert_eq!(alice_payment.total_amount, dec!(5));

        let topics: Vec<String> = notifier.events().into_iter().map(|(t, _)| t).collect();
        assert!(topics.contains(&dividend_topic(alice)));
        assert!(topics.contains(&dividend_topic(bob)));

        // cash is a separate value stream
        assert_eq!(env.cash(alice).await, dec!(9800));
    }

    #[tokio::test]
    async fn test_distribution_is_idempotent() {
        let env = TestLedger::new().await;
        let stock = env.stock("ACME").await;
        let alice = env.account(dec!(1000)).await;
        env.buy(alice, stock, dec!(3), dec!(10)).await;

        let notifier = Arc::new(RecordingNotifier::default());
        let distributor = DividendDistributor::new(env.ledger(), env.dividends(), notifier.clone());
        let dividend = announce(&env, stock, dec!(1)).await;

        let first = distributor.distribute(dividend.id).await.unwrap();
        let second = distributor.distribute(dividend.id).await.unwrap();

        assert_eq!(first.created, 1);
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(
            env.dividends().payments_for_dividend(dividend.id).await.unwrap().len(),
            1
        );
        assert_eq!(notifier.events().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_positions_receive_nothing() {
        let env = TestLedger::new().await;
        let stock = env.stock("ACME").await;
        let alice = env.account(dec!(1000)).await;
        env.buy(alice, stock, dec!(5), dec!(10)).await;
        env.sell(alice, stock, dec!(5), dec!(12)).await;

        let distributor = DividendDistributor::new(
            env.ledger(),
            env.dividends(),
            Arc::new(RecordingNotifier::default()),
        );
        let dividend = announce(&env, stock, dec!(1)).await;

        let summary = distributor.distribute(dividend.id).await.unwrap();
        assert_eq!(summary.holders, 0);
        assert_eq!(summary.created, 0);
    }

    #[tokio::test]
    async fn test_unknown_dividend() {
        let env = TestLedger::new().await;
        let distributor = DividendDistributor::new(
            env.ledger(),
            env.dividends(),
            Arc::new(RecordingNotifier::default()),
        );
        let id = Uuid::new_v4();
        assert_eq!(
            distributor.distribute(id).await.unwrap_err(),
            DividendError::NotFound(id)
        );
    }

    #[tokio::test]
    async fn test_concurrent_distributions_do_not_duplicate() {
        let env = TestLedger::new().await;
        let stock = env.stock("ACME").await;
        for _ in 0..5 {
            let account = env.account(dec!(100)).await;
            env.buy(account, stock, dec!(1), dec!(10)).await;
        }

        let distributor = Arc::new(DividendDistributor::new(
            env.ledger(),
            env.dividends(),
            Arc::new(RecordingNotifier::default()),
        ));
        let dividend = announce(&env, stock, dec!(2)).await;

        let (a, b) = tokio::join!(
            distributor.distribute(dividend.id),
            distributor.distribute(dividend.id)
        );
        assert_eq!(a.unwrap().created + b.unwrap().created, 5);
        assert_eq!(
            env.dividends().payments_for_dividend(dividend.id).await.unwrap().len(),
            5
        );
    }

    #[tokio::test]
    async fn test_uncomputable_payment_fails_only_that_holder() {
        let env = TestLedger::new().await;
        let stock = env.stock("ACME").await;
        let small = env.account(dec!(100)).await;
        let large = env.account(dec!(1000)).await;
        env.buy(small, stock, dec!(1), dec!(10)).await;
        env.buy(large, stock, dec!(10), dec!(10)).await;

        let distributor = DividendDistributor::new(
            env.ledger(),
            env.dividends(),
            Arc::new(RecordingNotifier::default()),
        );
        let per_share = Decimal::MAX / dec!(4);
        let dividend = announce(&env, stock, per_share).await;

        let summary = distributor.distribute(dividend.id).await.unwrap();
        assert_eq!(summary.holders, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_paid, dividend.amount_per_share.value());

        let payments = env.dividends().payments_for_dividend(dividend.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].account_id, small);
    }
}
