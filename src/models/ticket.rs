use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::currency::Currency;

/// Sentinel `quantity` meaning the ticket type has no capacity limit.
pub const UNLIMITED_QUANTITY: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketTypeId(pub String);

impl TicketTypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One purchasable category of admission, as listed by the ticketing backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub id: TicketTypeId,
    #[serde(default)]
    pub name: String,
    pub price: Decimal,
    pub currency: Currency,
    pub quantity: i32,
    #[serde(default)]
    pub sold_count: i32,
}

impl TicketType {
    pub fn is_unlimited(&self) -> bool {
        self.quantity == UNLIMITED_QUANTITY
    }

    /// Remaining tickets, or `None` when capacity is unlimited.
    pub fn available(&self) -> Option<u32> {
        if self.is_unlimited() {
            return None;
        }
        let remaining = self.quantity.saturating_sub(self.sold_count).max(0);
        Some(u32::try_from(remaining).unwrap_or(0))
    }

    pub fn is_sold_out(&self) -> bool {
        self.available() == Some(0)
    }
}
