use serde::{Deserialize, Serialize};
use std::fmt;

use super::cart::CartSelection;
use super::event::EventId;
use super::ticket::TicketTypeId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub ticket_type_id: TicketTypeId,
    pub quantity: u32,
}

/// Order creation payload for the ticketing backend. Carries no totals: the
/// backend prices the order authoritatively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub event_id: EventId,
    pub ticket_types: Vec<OrderLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
}

impl OrderRequest {
    pub fn from_cart(
        event_id: EventId,
        cart: &CartSelection,
        discount_code: Option<String>,
        payment_method_id: Option<String>,
    ) -> Self {
        let ticket_types = cart
            .lines()
            .map(|(id, quantity)| OrderLine {
                ticket_type_id: id.clone(),
                quantity,
            })
            .collect();

        Self {
            event_id,
            ticket_types,
            discount_code,
            payment_method_id,
        }
    }

    /// Lines with a positive quantity, merged by ticket type.
    pub fn cart(&self) -> CartSelection {
        let mut cart = CartSelection::new();
        for line in &self.ticket_types {
            let quantity = cart.quantity(&line.ticket_type_id).saturating_add(line.quantity);
            cart.set(line.ticket_type_id.clone(), quantity);
        }
        cart
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: OrderId,
    /// Payment request to show the buyer (for example a Lightning invoice).
    pub payment_invoice: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
}
