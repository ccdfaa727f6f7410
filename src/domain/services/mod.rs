pub mod account_locks;
pub mod dividend_distributor;
pub mod transaction_processor;
