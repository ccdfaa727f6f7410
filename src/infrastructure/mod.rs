pub mod broadcast_notifier;
pub mod http_price_oracle;

pub use broadcast_notifier::BroadcastNotifier;
pub use http_price_oracle::HttpPriceOracle;
