use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A promotional code that takes a percentage off the checkout total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCode {
    pub code: String,
    pub percentage: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_uses: Option<u32>,
    #[serde(default)]
    pub used: u32,
}

fn default_active() -> bool {
    true
}

/// Why a discount code cannot be applied. The message is shown to the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DiscountRejection {
    #[error("This discount code is not valid")]
    NotFound,

    #[error("This discount code is no longer active")]
    Inactive,

    #[error("This discount code has expired")]
    Expired,

    #[error("This discount code has reached its usage limit")]
    Exhausted,

    #[error("This discount code has an invalid percentage")]
    InvalidPercentage,
}

impl DiscountCode {
    pub fn matches(&self, code: &str) -> bool {
        self.code.trim().eq_ignore_ascii_case(code.trim())
    }

    /// Checks that the code is active, unexpired and under its usage cap at `now`.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), DiscountRejection> {
        if !self.active {
            return Err(DiscountRejection::Inactive);
        }
        if self.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Err(DiscountRejection::Expired);
        }
        if self.max_uses.is_some_and(|max_uses| self.used >= max_uses) {
            return Err(DiscountRejection::Exhausted);
        }
        if self.percentage < Decimal::ZERO || self.percentage > Decimal::ONE_HUNDRED {
            return Err(DiscountRejection::InvalidPercentage);
        }
        Ok(())
    }
}
