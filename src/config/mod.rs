use rust_decimal::Decimal;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::models::Currency;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_response_headers_layer;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_TICKETING_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
// Development rates used when no rate service is configured.
const DEFAULT_USD_PER_SAT_MICROS: i64 = 650;
const DEFAULT_ARS_PER_USD: i64 = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub ticketing_api_url: String,
    pub ticketing_api_token: Option<String>,
    /// Rate service base URL. `None` selects the static development rates.
    pub currency_api_url: Option<String>,
    pub usd_per_sat: Decimal,
    pub ars_per_usd: Decimal,
    pub fallback_currency: Currency,
    pub http_timeout: Duration,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_addr: parse_var(
                "CHECKOUT_BIND_ADDR",
                SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            ),
            ticketing_api_url: env::var("TICKETING_API_URL")
                .unwrap_or_else(|_| DEFAULT_TICKETING_API_URL.to_string()),
            ticketing_api_token: non_empty_var("TICKETING_API_TOKEN"),
            currency_api_url: non_empty_var("CURRENCY_API_URL"),
            usd_per_sat: parse_var("USD_PER_SAT", Decimal::new(DEFAULT_USD_PER_SAT_MICROS, 6)),
            ars_per_usd: parse_var("ARS_PER_USD", Decimal::from(DEFAULT_ARS_PER_USD)),
            fallback_currency: parse_var("CHECKOUT_FALLBACK_CURRENCY", Currency::FALLBACK),
            http_timeout: Duration::from_secs(parse_var(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            log_level: env::var("CHECKOUT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Reads `key`, falling back to `default` when it is unset or does not parse.
fn parse_var<T: FromStr>(key: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    let Some(raw) = non_empty_var(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Config: Invalid {} '{}': {}, using default", key, raw, e);
            default
        }
    }
}
