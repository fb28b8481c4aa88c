//! Currency normalization for transaction amounts.
//!
//! Every transaction is stored with a USD `converted_amount` next to the
//! entered amount. Rates come from an external USD-based source behind the
//! `RateProvider` trait so the lookup can be faked in tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::domain::errors::{Error, Result};

/// Source of exchange rates, keyed off a base currency.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Mapping of ISO currency code to rate, quoted against `base`.
    async fn get_rates(&self, base: &str) -> anyhow::Result<HashMap<String, f64>>;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Rate provider backed by the exchangerate-api.com JSON endpoint.
pub struct ExchangeRateApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ExchangeRateApiClient {
    /// `base_url` without a trailing slash, e.g.
    /// `https://api.exchangerate-api.com/v4/latest`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RateProvider for ExchangeRateApiClient {
    async fn get_rates(&self, base: &str) -> anyhow::Result<HashMap<String, f64>> {
        let url = format!("{}/{}", self.base_url, base);
        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<RatesResponse>()
            .await?;
        Ok(response.rates)
    }
}

/// Converts entered amounts into canonical USD values.
#[derive(Clone)]
pub struct CurrencyService {
    provider: Arc<dyn RateProvider>,
}

impl CurrencyService {
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        Self { provider }
    }

    /// Normalize `amount` in `currency` to USD.
    ///
    /// USD amounts pass through unchanged without a rate lookup. Other
    /// currencies divide by the USD-base rate for the code; this division
    /// convention is kept for compatibility with historical data. A missing
    /// code or an unreachable source fails with `Error::Conversion` and the
    /// caller must abort its flow rather than defaulting.
    pub async fn to_usd(&self, amount: f64, currency: &str) -> Result<f64> {
        if currency == "USD" {
            return Ok(amount);
        }

        let rates = self
            .provider
            .get_rates("USD")
            .await
            .map_err(|e| Error::Conversion(format!("rate lookup failed: {}", e)))?;

        let rate = rates
            .get(currency)
            .copied()
            .ok_or_else(|| Error::Conversion(format!("no rate for currency code {}", currency)))?;

        if rate <= 0.0 {
            return Err(Error::Conversion(format!(
                "invalid rate {} for currency code {}",
                rate, currency
            )));
        }

        let converted = amount / rate;
        info!(
            "Converted {} {} to {:.2} USD (rate {})",
            amount, currency, converted, rate
        );
        Ok(converted)
    }
}
