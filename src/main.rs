use std::sync::Arc;
use std::time::Duration;

use stockfolio::api::{router, AppState};
use stockfolio::application::actors::order_scheduler::{spawn_order_scheduler, LimitOrderScheduler};
use stockfolio::application::services::{DividendService, LedgerService, OrderService};
use stockfolio::config::EngineConfig;
use stockfolio::domain::repositories::dividend_repository::DividendRepository;
use stockfolio::domain::repositories::ledger_repository::LedgerRepository;
use stockfolio::domain::repositories::order_repository::OrderRepository;
use stockfolio::domain::services::dividend_distributor::DividendDistributor;
use stockfolio::domain::services::transaction_processor::TransactionProcessor;
use stockfolio::infrastructure::{BroadcastNotifier, HttpPriceOracle};
use stockfolio::persistence::{
    init_database, SqliteDividendRepository, SqliteLedgerRepository, SqliteOrderRepository,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockfolio=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();
    info!("Stockfolio starting with {:?}", config);

    let pool = init_database(&config.database_url).await?;
    let ledger: Arc<dyn LedgerRepository> = Arc::new(SqliteLedgerRepository::new(pool.clone()));
    let orders: Arc<dyn OrderRepository> = Arc::new(SqliteOrderRepository::new(pool.clone()));
    let dividends: Arc<dyn DividendRepository> =
        Arc::new(SqliteDividendRepository::new(pool.clone()));

    let processor = Arc::new(TransactionProcessor::new(
        ledger.clone(),
        config.max_trade_retries,
    ));
    let oracle = Arc::new(HttpPriceOracle::new(
        &config.price_oracle_url,
        Duration::from_millis(config.price_timeout_milliseconds),
    )?);
    let notifier = Arc::new(BroadcastNotifier::new(config.notifier_capacity));

    let scheduler = Arc::new(LimitOrderScheduler::new(
        orders.clone(),
        ledger.clone(),
        processor.clone(),
        oracle,
        notifier.clone(),
        config.scheduler(),
    ));
    let (scheduler_handle, scheduler_task) = spawn_order_scheduler(scheduler);

    let distributor = Arc::new(DividendDistributor::new(
        ledger.clone(),
        dividends.clone(),
        notifier,
    ));
    let state = Arc::new(AppState {
        ledger: LedgerService::new(ledger.clone(), processor),
        orders: OrderService::new(orders, ledger.clone()),
        dividends: DividendService::new(ledger, dividends, distributor),
        scheduler: scheduler_handle.clone(),
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);
    let server = axum::serve(listener, app);

    let shutdown_signal = async move {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C signal"),
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("Received SIGTERM signal");
                }
                Err(e) => error!("Failed to install SIGTERM handler: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    info!("Server started successfully. Press Ctrl+C to stop.");
    server.with_graceful_shutdown(shutdown_signal).await?;

    info!("Server shutting down gracefully...");
    scheduler_handle.shutdown().await;
    if let Err(e) = scheduler_task.await {
        error!("Scheduler task ended abnormally: {}", e);
    }
    pool.close().await;

    info!("Shutdown complete");
    Ok(())
}
