use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::currency::Currency;
use super::ticket::{TicketType, TicketTypeId};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ticket types on sale for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCatalog {
    pub event_id: EventId,
    pub ticket_types: Vec<TicketType>,
}

impl EventCatalog {
    pub fn new(event_id: EventId, ticket_types: Vec<TicketType>) -> Self {
        Self {
            event_id,
            ticket_types,
        }
    }

    pub fn find(&self, id: &TicketTypeId) -> Option<&TicketType> {
        self.ticket_types.iter().find(|tt| &tt.id == id)
    }

    pub fn currencies(&self) -> BTreeSet<Currency> {
        self.ticket_types.iter().map(|tt| tt.currency).collect()
    }

    /// The event's only ticket currency, or `fallback` when there is not exactly one.
    pub fn display_currency(&self, fallback: Currency) -> Currency {
        let currencies = self.currencies();
        match (currencies.len(), currencies.first()) {
            (1, Some(only)) => *only,
            _ => fallback,
        }
    }
}
