use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::ticket::{TicketType, TicketTypeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Ticket type '{0}' is sold out")]
    SoldOut(TicketTypeId),

    #[error("Only {available} ticket(s) of '{id}' are available")]
    ExceedsAvailability { id: TicketTypeId, available: u32 },
}

/// The buyer's requested quantity per ticket type for one checkout.
///
/// A zero quantity is never stored, so every entry is a real selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartSelection {
    items: BTreeMap<TicketTypeId, u32>,
}

impl CartSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quantity(&self, id: &TicketTypeId) -> u32 {
        self.items.get(id).copied().unwrap_or(0)
    }

    pub fn set(&mut self, id: TicketTypeId, quantity: u32) {
        if quantity == 0 {
            self.items.remove(&id);
        } else {
            self.items.insert(id, quantity);
        }
    }

    /// Adds one ticket of `ticket_type`, refusing to go past its availability.
    pub fn increment(&mut self, ticket_type: &TicketType) -> Result<u32, CartError> {
        let next = self.quantity(&ticket_type.id).saturating_add(1);
        Self::ensure_available(ticket_type, next)?;
        self.set(ticket_type.id.clone(), next);
        Ok(next)
    }

    pub fn decrement(&mut self, id: &TicketTypeId) -> u32 {
        let next = self.quantity(id).saturating_sub(1);
        self.set(id.clone(), next);
        next
    }

    /// Sets an exact quantity for `ticket_type`, checked against availability.
    pub fn set_checked(&mut self, ticket_type: &TicketType, quantity: u32) -> Result<(), CartError> {
        if quantity > 0 {
            Self::ensure_available(ticket_type, quantity)?;
        }
        self.set(ticket_type.id.clone(), quantity);
        Ok(())
    }

    pub(crate) fn ensure_available(ticket_type: &TicketType, quantity: u32) -> Result<(), CartError> {
        match ticket_type.available() {
            Some(0) => Err(CartError::SoldOut(ticket_type.id.clone())),
            Some(available) if quantity > available => Err(CartError::ExceedsAvailability {
                id: ticket_type.id.clone(),
                available,
            }),
            _ => Ok(()),
        }
    }

    /// Selected lines in ticket type id order. Only positive quantities are yielded.
    pub fn lines(&self) -> impl Iterator<Item = (&TicketTypeId, u32)> {
        self.items
            .iter()
            .filter(|(_, quantity)| **quantity > 0)
            .map(|(id, quantity)| (id, *quantity))
    }

    pub fn is_empty(&self) -> bool {
        self.lines().next().is_none()
    }

    pub fn total_tickets(&self) -> u64 {
        self.lines().map(|(_, quantity)| u64::from(quantity)).sum()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl FromIterator<(TicketTypeId, u32)> for CartSelection {
    fn from_iter<I: IntoIterator<Item = (TicketTypeId, u32)>>(iter: I) -> Self {
        let mut cart = CartSelection::new();
        for (id, quantity) in iter {
            cart.set(id, quantity);
        }
        cart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::currency::Currency;
    use rust_decimal::Decimal;

    fn ticket_type(id: &str, quantity: i32, sold_count: i32) -> TicketType {
        TicketType {
            id: TicketTypeId::new(id),
            name: id.to_string(),
            price: Decimal::from(25),
            currency: Currency::Usd,
            quantity,
            sold_count,
        }
    }

    #[test]
    fn test_zero_quantity_is_absent() {
        let mut cart = CartSelection::new();
        cart.set(TicketTypeId::new("a"), 2);
        cart.set(TicketTypeId::new("a"), 0);
        assert!(cart.is_empty());
        assert_eq!(cart.lines().count(), 0);
    }

    #[test]
    fn test_increment_and_decrement() {
        let general = ticket_type("general", 10, 0);
        let mut cart = CartSelection::new();

        assert_eq!(cart.increment(&general).unwrap(), 1);
        assert_eq!(cart.increment(&general).unwrap(), 2);
        assert_eq!(cart.decrement(&general.id), 1);
        assert_eq!(cart.decrement(&general.id), 0);
        assert_eq!(cart.decrement(&general.id), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_increment_respects_availability() {
        let last_two = ticket_type("vip", 10, 8);
        let mut cart = CartSelection::new();
        cart.increment(&last_two).unwrap();
        cart.increment(&last_two).unwrap();

        let err = cart.increment(&last_two).unwrap_err();
        assert_eq!(
            err,
            CartError::ExceedsAvailability {
                id: TicketTypeId::new("vip"),
                available: 2
            }
        );
        assert_eq!(cart.quantity(&last_two.id), 2);
    }

    #[test]
    fn test_sold_out_ticket_type_cannot_be_added() {
        let sold_out = ticket_type("early", 50, 50);
        let mut cart = CartSelection::new();
        assert_eq!(
            cart.increment(&sold_out).unwrap_err(),
            CartError::SoldOut(TicketTypeId::new("early"))
        );
        // Clearing a sold out line is always allowed.
        assert!(cart.set_checked(&sold_out, 0).is_ok());
    }

    #[test]
    fn test_total_tickets_counts_all_lines() {
        let cart: CartSelection = vec![
            (TicketTypeId::new("a"), 2),
            (TicketTypeId::new("b"), 0),
            (TicketTypeId::new("c"), 3),
        ]
        .into_iter()
        .collect();

        assert_eq!(cart.total_tickets(), 5);
        assert_eq!(cart.lines().count(), 2);
    }

    #[test]
    fn test_deserializes_from_id_quantity_map() {
        let cart: CartSelection = serde_json::from_str(r#"{"a":2,"b":0}"#).unwrap();
        assert_eq!(cart.quantity(&TicketTypeId::new("a")), 2);
        assert_eq!(cart.total_tickets(), 2);
    }
}
