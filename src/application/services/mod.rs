pub mod dividend_service;
pub mod ledger_service;
pub mod order_service;

pub use dividend_service::DividendService;
pub use ledger_service::LedgerService;
pub use order_service::OrderService;
