pub mod cart;
pub mod currency;
pub mod discount;
pub mod event;
pub mod order;
pub mod summary;
pub mod ticket;

pub use cart::{CartError, CartSelection};
pub use currency::Currency;
pub use discount::{DiscountCode, DiscountRejection};
pub use event::{EventCatalog, EventId};
pub use order::{OrderId, OrderLine, OrderRequest, OrderResponse, PaymentStatus};
pub use summary::{CheckoutSummary, SummarySnapshot, SummaryState};
pub use ticket::{TicketType, TicketTypeId, UNLIMITED_QUANTITY};
