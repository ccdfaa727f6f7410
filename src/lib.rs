//! Stockfolio settlement engine
//!
//! Limit order scheduling, atomic trade settlement against cash and holding
//! ledgers, and idempotent dividend distribution.

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;

#[cfg(test)]
pub mod test_support;
