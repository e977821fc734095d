use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::currency::Currency;

/// Totals shown to the buyer before the order is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub display_total: Decimal,
    pub display_discount: Decimal,
    pub display_currency: Currency,
}

impl CheckoutSummary {
    pub fn zero(display_currency: Currency) -> Self {
        Self {
            display_total: Decimal::ZERO,
            display_discount: Decimal::ZERO,
            display_currency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SummaryState {
    /// A recomputation for the latest inputs has not finished yet.
    Pending,
    Ready(CheckoutSummary),
    /// Totals could not be produced (for example the rate service is down).
    Unavailable { reason: String },
}

impl SummaryState {
    pub fn summary(&self) -> Option<&CheckoutSummary> {
        match self {
            SummaryState::Ready(summary) => Some(summary),
            _ => None,
        }
    }
}

/// A summary state tagged with the input generation it was computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarySnapshot {
    pub generation: u64,
    pub state: SummaryState,
}
