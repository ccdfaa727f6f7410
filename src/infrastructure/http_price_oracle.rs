//! HTTP price oracle
//!
//! `GET {base_url}/prices/{symbol}` returning `{ "symbol": "ACME", "price": "48.10" }`.
//! The price may be a JSON string or number; it is parsed as an exact decimal.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::PriceError;
use crate::domain::repositories::price_oracle::PriceOracle;
use crate::domain::value_objects::price::Price;

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    symbol: String,
    price: Decimal,
}

pub struct HttpPriceOracle {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpPriceOracle {
    /// `request_timeout` caps the whole HTTP exchange; callers may still
    /// wrap lookups in a shorter deadline.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, PriceError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| PriceError::Unavailable {
                symbol: String::new(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    fn name(&self) -> &str {
        "http"
    }

    async fn current_price(&self, symbol: &str) -> Result<Price, PriceError> {
        let url = format!("{}/prices/{}", self.base_url, symbol);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                PriceError::Timeout {
                    symbol: symbol.to_string(),
                    after_ms: self.request_timeout.as_millis() as u64,
                }
            } else {
                PriceError::Unavailable {
                    symbol: symbol.to_string(),
                    reason: format!("request failed: {}", e),
                }
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PriceError::Unavailable {
                symbol: symbol.to_string(),
                reason: format!("{} - {}", status, error_text),
            });
        }

        let quote: QuoteResponse = response.json().await.map_err(|e| PriceError::InvalidResponse {
            symbol: symbol.to_string(),
            reason: format!("Failed to parse quote: {}", e),
        })?;

        if !quote.symbol.eq_ignore_ascii_case(symbol) {
            return Err(PriceError::InvalidResponse {
                symbol: symbol.to_string(),
                reason: format!("quote is for {}", quote.symbol),
            });
        }

        let price = Price::new(quote.price).map_err(|e| PriceError::InvalidResponse {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;

        debug!(symbol = %symbol, price = %price, "Quote received");
        Ok(price)
    }
}
