use std::sync::Arc;

use crate::client::{HttpTicketingClient, TicketingApi};
use crate::config::Config;
use crate::converter::{CurrencyConverter, HttpCurrencyConverter, StaticRateConverter};
use crate::models::Currency;
use crate::pricing::PricingEngine;
use crate::utils::error::AppError;

/// Shared collaborators for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn TicketingApi>,
    pub engine: Arc<PricingEngine>,
}

impl AppState {
    pub fn new(api: Arc<dyn TicketingApi>, engine: Arc<PricingEngine>) -> Self {
        Self { api, engine }
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let api = HttpTicketingClient::new(
            config.ticketing_api_url.clone(),
            config.ticketing_api_token.clone(),
            config.http_timeout,
        )?;

        let converter: Arc<dyn CurrencyConverter> = match &config.currency_api_url {
            Some(url) => {
                tracing::info!(url = %url, "Using rate service for currency conversion");
                Arc::new(
                    HttpCurrencyConverter::new(url.clone(), config.http_timeout)
                        .map_err(|e| AppError::InternalServerError(e.to_string()))?,
                )
            }
            None => {
                tracing::warn!(
                    usd_per_sat = %config.usd_per_sat,
                    ars_per_usd = %config.ars_per_usd,
                    "No CURRENCY_API_URL configured, using static development rates"
                );
                Arc::new(
                    StaticRateConverter::new()
                        .with_rate(Currency::Sat, Currency::Usd, config.usd_per_sat)
                        .with_rate(Currency::Usd, Currency::Ars, config.ars_per_usd),
                )
            }
        };

        Ok(Self::new(
            Arc::new(api),
            Arc::new(PricingEngine::new(converter, config.fallback_currency)),
        ))
    }
}
