//! HTTP surface: shared state and the route table

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::actors::order_scheduler::SchedulerHandle;
use crate::application::handlers::{
    account_handler, dividend_handler, order_handler, scheduler_handler,
};
use crate::application::services::{DividendService, LedgerService, OrderService};

/// Services shared by every handler
pub struct AppState {
    pub ledger: LedgerService,
    pub orders: OrderService,
    pub dividends: DividendService,
    pub scheduler: SchedulerHandle,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/accounts", post(account_handler::open_account))
        .route("/accounts/:id", get(account_handler::get_account))
        .route("/accounts/:id/holdings", get(account_handler::list_holdings))
        .route(
            "/accounts/:id/transactions",
            get(account_handler::list_transactions),
        )
        .route("/accounts/:id/orders", get(order_handler::list_account_orders))
        .route("/stocks", post(account_handler::register_stock))
        .route("/trades", post(account_handler::execute_trade))
        .route("/orders", post(order_handler::place_order))
        .route(
            "/orders/:id",
            get(order_handler::get_order).delete(order_handler::cancel_order),
        )
        .route("/dividends", post(dividend_handler::announce_dividend))
        .route("/dividends/:id/payments", get(dividend_handler::list_payments))
        .route(
            "/dividends/:id/distribute",
            post(dividend_handler::distribute_dividend),
        )
        .route("/scheduler/run", post(scheduler_handler::run_scheduler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "running",
        "scheduler": state.scheduler.is_running(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::actors::order_scheduler::{
        spawn_order_scheduler, LimitOrderScheduler, SchedulerConfig,
    };
    use crate::domain::services::dividend_distributor::DividendDistributor;
    use crate::domain::services::transaction_processor::TransactionProcessor;
    use crate::test_support::{RecordingNotifier, ScriptedPriceOracle, TestLedger};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        oracle: Arc<ScriptedPriceOracle>,
        _env: TestLedger,
    }

    async fn harness() -> Harness {
        let env = TestLedger::new().await;
        let oracle = Arc::new(ScriptedPriceOracle::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let processor = Arc::new(TransactionProcessor::new(env.ledger(), 3));

        let scheduler = Arc::new(LimitOrderScheduler::new(
            env.orders(),
            env.ledger(),
            processor.clone(),
            oracle.clone(),
            notifier.clone(),
            SchedulerConfig {
                interval: Duration::from_secs(3600),
                ..SchedulerConfig::default()
            },
        ));
        let (handle, _join) = spawn_order_scheduler(scheduler);

        let distributor = Arc::new(DividendDistributor::new(
            env.ledger(),
            env.dividends(),
            notifier,
        ));
        let state = Arc::new(AppState {
            ledger: LedgerService::new(env.ledger(), processor),
            orders: OrderService::new(env.orders(), env.ledger()),
            dividends: DividendService::new(env.ledger(), env.dividends(), distributor),
            scheduler: handle,
        });

        Harness {
            app: router(state),
            oracle,
            _env: env,
        }
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn decimal(value: &Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    fn id(value: &Value) -> String {
        value["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_reports_scheduler() {
        let h = harness().await;
        let (status, body) = call(&h.app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert_eq!(body["scheduler"], true);
    }

    #[tokio::test]
    async fn test_limit_order_flow_over_http() {
        let h = harness().await;
        let (status, account) =
            call(&h.app, "POST", "/accounts", Some(json!({ "cashBalance": "1000" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let account_id = id(&account);

        let (status, stock) =
            call(&h.app, "POST", "/stocks", Some(json!({ "symbol": "ACME" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let stock_id = id(&stock);

        let (status, order) = call(
            &h.app,
            "POST",
            "/orders",
            Some(json!({
                "accountId": account_id,
                "stockId": stock_id,
                "side": "BUY_LIMIT",
                "quantity": "4",
                "limitPrice": "50"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["status"], "PENDING");
        let order_id = id(&order);

        h.oracle.set_price("ACME", dec!(45));
        let (status, summary) = call(&h.app, "POST", "/scheduler/run", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["executed"], 1);

        let (_, order) = call(&h.app, "GET", &format!("/orders/{}", order_id), None).await;
        assert_eq!(order["status"], "EXECUTED");

        let (_, account) = call(&h.app, "GET", &format!("/accounts/{}", account_id), None).await;
        assert_eq!(decimal(&account["cashBalance"]), dec!(820));

        let (_, holdings) =
            call(&h.app, "GET", &format!("/accounts/{}/holdings", account_id), None).await;
        assert_eq!(holdings.as_array().unwrap().len(), 1);
        assert_eq!(decimal(&holdings[0]["quantity"]), dec!(4));

        let (_, transactions) =
            call(&h.app, "GET", &format!("/accounts/{}/transactions", account_id), None).await;
        assert_eq!(transactions[0]["side"], "BUY");

        let (status, body) = call(&h.app, "DELETE", &format!("/orders/{}", order_id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("EXECUTED"));

        let (_, pending) = call(
            &h.app,
            "GET",
            &format!("/accounts/{}/orders?pending=true", account_id),
            None,
        )
        .await;
        assert!(pending.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_direct_trade_rejections_map_to_conflict() {
        let h = harness().await;
        let (_, account) =
            call(&h.app, "POST", "/accounts", Some(json!({ "cashBalance": "100" }))).await;
        let (_, stock) = call(&h.app, "POST", "/stocks", Some(json!({ "symbol": "ACME" }))).await;

        let (status, body) = call(
            &h.app,
            "POST",
            "/trades",
            Some(json!({
                "accountId": id(&account),
                "stockId": id(&stock),
                "side": "BUY",
                "quantity": "10",
                "pricePerShare": "20"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("Insufficient funds"));

        let (status, _) = call(
            &h.app,
            "POST",
            "/trades",
            Some(json!({
                "accountId": id(&account),
                "stockId": id(&stock),
                "side": "SELL",
                "quantity": "1",
                "pricePerShare": "20"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_validation_and_not_found() {
        let h = harness().await;
        let (status, _) =
            call(&h.app, "POST", "/accounts", Some(json!({ "cashBalance": "-1" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = uuid::Uuid::new_v4();
        let (status, body) = call(&h.app, "GET", &format!("/orders/{}", missing), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, _) = call(&h.app, "GET", &format!("/accounts/{}/holdings", missing), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            call(&h.app, "GET", &format!("/dividends/{}/payments", missing), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dividend_announcement_pays_holders() {
        let h = harness().await;
        let (_, account) =
            call(&h.app, "POST", "/accounts", Some(json!({ "cashBalance": "500" }))).await;
        let (_, stock) = call(&h.app, "POST", "/stocks", Some(json!({ "symbol": "ACME" }))).await;
        let (status, _) = call(
            &h.app,
            "POST",
            "/trades",
            Some(json!({
                "accountId": id(&account),
                "stockId": id(&stock),
                "side": "BUY",
                "quantity": "10",
                "pricePerShare": "10"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, announcement) = call(
            &h.app,
            "POST",
            "/dividends",
            Some(json!({
                "stockId": id(&stock),
                "amountPerShare": "0.5",
                "payDate": "2026-12-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(announcement["distribution"]["created"], 1);

        let dividend_id = announcement["dividend"]["id"].as_str().unwrap();
        let (status, payments) =
            call(&h.app, "GET", &format!("/dividends/{}/payments", dividend_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decimal(&payments[0]["totalAmount"]), dec!(5));
        assert_eq!(payments[0]["status"], "PAID");

        let (status, rerun) = call(
            &h.app,
            "POST",
            &format!("/dividends/{}/distribute", dividend_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(rerun["created"], 0);
        assert_eq!(rerun["skipped"], 1);
        assert_eq!(rerun["failed"], 0);

        let missing = uuid::Uuid::new_v4();
        let (status, _) =
            call(&h.app, "POST", &format!("/dividends/{}/distribute", missing), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
