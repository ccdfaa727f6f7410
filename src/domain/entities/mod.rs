pub mod account;
pub mod dividend;
pub mod holding;
pub mod order;
pub mod stock;
pub mod transaction;
