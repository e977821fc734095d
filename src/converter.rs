//! Currency conversion collaborators used by the pricing engine.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::models::Currency;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("No exchange rate from {from} to {to}")]
    UnsupportedPair { from: Currency, to: Currency },

    #[error("Rate service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Rate service returned {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Converts an amount between currencies. Implementations may suspend on network I/O
/// and must tolerate several conversions in flight at once.
#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    async fn convert(
        &self,
        amount: Decimal,
        from: Currency,
        to: Currency,
    ) -> Result<Decimal, ConversionError>;
}

#[derive(Serialize)]
struct ConvertRequest {
    amount: Decimal,
    from: Currency,
    to: Currency,
}

#[derive(Deserialize)]
struct ConvertResponse {
    amount: Decimal,
}

/// Converter backed by the external rate service (`POST {base_url}/convert`).
#[derive(Clone)]
pub struct HttpCurrencyConverter {
    client: Client,
    base_url: String,
}

impl HttpCurrencyConverter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConversionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CurrencyConverter for HttpCurrencyConverter {
    async fn convert(
        &self,
        amount: Decimal,
        from: Currency,
        to: Currency,
    ) -> Result<Decimal, ConversionError> {
        if from == to {
            return Ok(amount);
        }

        let response = self
            .client
            .post(format!("{}/convert", self.base_url))
            .json(&ConvertRequest { amount, from, to })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(%from, %to, status = status.as_u16(), "Rate service rejected conversion");
            return Err(ConversionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: ConvertResponse = response.json().await?;
        tracing::debug!(%amount, %from, %to, converted = %body.amount, "Converted amount");
        Ok(body.amount)
    }
}

/// Converter over a fixed rate table, for local development without a rate service.
///
/// Rates are units of `to` per one unit of `from`; a missing direct rate is
/// resolved through the inverse of the opposite pair.
#[derive(Debug, Clone, Default)]
pub struct StaticRateConverter {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl StaticRateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }

    fn rate(&self, from: Currency, to: Currency) -> Option<Decimal> {
        if let Some(rate) = self.rates.get(&(from, to)) {
            return Some(*rate);
        }
        self.rates
            .get(&(to, from))
            .filter(|inverse| !inverse.is_zero())
            .and_then(|inverse| Decimal::ONE.checked_div(*inverse))
    }
}

#[async_trait]
impl CurrencyConverter for StaticRateConverter {
    async fn convert(
        &self,
        amount: Decimal,
        from: Currency,
        to: Currency,
    ) -> Result<Decimal, ConversionError> {
        if from == to {
            return Ok(amount);
        }
        self.rate(from, to)
            .and_then(|rate| amount.checked_mul(rate))
            .ok_or(ConversionError::UnsupportedPair { from, to })
    }
}
