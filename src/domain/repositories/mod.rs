pub mod dividend_repository;
pub mod ledger_repository;
pub mod notifier;
pub mod order_repository;
pub mod price_oracle;
