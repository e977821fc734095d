//! A buyer's checkout session: cart editing, discount code, order submission
//! and payment confirmation.
//!
//! The session moves `Form -> Payment -> Success`. It only leaves `Form` once
//! the backend has created the order, and only reaches `Success` once the
//! payment has been confirmed externally.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::client::{ClientError, TicketingApi};
use crate::models::{
    CartError, CartSelection, Currency, DiscountCode, DiscountRejection, EventCatalog, EventId,
    OrderId, OrderRequest, OrderResponse, PaymentStatus, TicketTypeId,
};
use crate::pricing::{LiveSummary, PricingEngine, PricingInputs};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum CheckoutStep {
    Form,
    #[serde(rename_all = "camelCase")]
    Payment {
        order_id: OrderId,
        payment_invoice: String,
    },
    #[serde(rename_all = "camelCase")]
    Success { order_id: OrderId },
}

impl CheckoutStep {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutStep::Form => "form",
            CheckoutStep::Payment { .. } => "payment",
            CheckoutStep::Success { .. } => "success",
        }
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Ticket type '{0}' is not on sale for this event")]
    UnknownTicketType(TicketTypeId),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Discount(#[from] DiscountRejection),

    #[error("Select at least one ticket before checking out")]
    EmptyCart,

    #[error("Not allowed during the {0} step")]
    WrongStep(&'static str),

    #[error("{0}")]
    OrderRejected(String),

    #[error("Payment for order {0} expired")]
    PaymentExpired(OrderId),

    #[error("Timed out waiting for payment of order {0}")]
    PaymentTimeout(OrderId),

    #[error(transparent)]
    Backend(ClientError),
}

pub struct CheckoutSession {
    id: Uuid,
    api: Arc<dyn TicketingApi>,
    catalog: Arc<EventCatalog>,
    cart: CartSelection,
    discount: Option<DiscountCode>,
    display_currency: Option<Currency>,
    step: CheckoutStep,
    summary: LiveSummary,
}

impl CheckoutSession {
    /// Opens a session for `event_id`, loading its ticket types from the backend.
    pub async fn start(
        api: Arc<dyn TicketingApi>,
        engine: Arc<PricingEngine>,
        event_id: &EventId,
    ) -> Result<Self, CheckoutError> {
        let catalog = api
            .fetch_catalog(event_id)
            .await
            .map_err(CheckoutError::Backend)?;
        Ok(Self::new(api, engine, Arc::new(catalog)))
    }

    /// Must be called from within a Tokio runtime: the initial summary is computed on a task.
    pub fn new(
        api: Arc<dyn TicketingApi>,
        engine: Arc<PricingEngine>,
        catalog: Arc<EventCatalog>,
    ) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            api,
            catalog,
            cart: CartSelection::new(),
            discount: None,
            display_currency: None,
            step: CheckoutStep::Form,
            summary: LiveSummary::new(engine),
        };
        tracing::debug!(session_id = %session.id, event_id = %session.catalog.event_id, "Checkout session opened");
        session.refresh();
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn step(&self) -> &CheckoutStep {
        &self.step
    }

    pub fn cart(&self) -> &CartSelection {
        &self.cart
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn discount(&self) -> Option<&DiscountCode> {
        self.discount.as_ref()
    }

    pub fn summary(&self) -> &LiveSummary {
        &self.summary
    }

    pub fn add_ticket(&mut self, id: &TicketTypeId) -> Result<u32, CheckoutError> {
        self.ensure_form()?;
        let ticket_type = self
            .catalog
            .find(id)
            .ok_or_else(|| CheckoutError::UnknownTicketType(id.clone()))?;
        let quantity = self.cart.increment(ticket_type)?;
        self.refresh();
        Ok(quantity)
    }

    pub fn remove_ticket(&mut self, id: &TicketTypeId) -> Result<u32, CheckoutError> {
        self.ensure_form()?;
        let quantity = self.cart.decrement(id);
        self.refresh();
        Ok(quantity)
    }

    pub fn set_quantity(&mut self, id: &TicketTypeId, quantity: u32) -> Result<(), CheckoutError> {
        self.ensure_form()?;
        match self.catalog.find(id) {
            Some(ticket_type) => self.cart.set_checked(ticket_type, quantity)?,
            // Stale entries can always be dropped.
            None if quantity == 0 => self.cart.set(id.clone(), 0),
            None => return Err(CheckoutError::UnknownTicketType(id.clone())),
        }
        self.refresh();
        Ok(())
    }

    pub fn set_display_currency(&mut self, currency: Option<Currency>) {
        self.display_currency = currency;
        self.refresh();
    }

    /// Looks up and applies `code`, replacing any code applied before.
    ///
    /// A rejected code leaves the session without a discount.
    pub async fn apply_discount(&mut self, code: &str) -> Result<DiscountCode, CheckoutError> {
        self.ensure_form()?;

        let found = self
            .api
            .fetch_discount(&self.catalog.event_id, code)
            .await
            .map_err(CheckoutError::Backend)?;

        let checked = found
            .ok_or(DiscountRejection::NotFound)
            .and_then(|discount| discount.check(Utc::now()).map(|()| discount));

        match checked {
            Ok(discount) => {
                tracing::info!(session_id = %self.id, code = %discount.code, percentage = %discount.percentage, "Discount code applied");
                self.discount = Some(discount.clone());
                self.refresh();
                Ok(discount)
            }
            Err(reason) => {
                tracing::info!(session_id = %self.id, code = %code.trim(), %reason, "Discount code rejected");
                if self.discount.take().is_some() {
                    self.refresh();
                }
                Err(reason.into())
            }
        }
    }

    pub fn clear_discount(&mut self) {
        if self.discount.take().is_some() {
            self.refresh();
        }
    }

    /// Creates the order on the backend and moves to the payment step.
    ///
    /// On failure the session stays in the form step with its cart intact.
    pub async fn submit(
        &mut self,
        payment_method_id: Option<String>,
    ) -> Result<OrderResponse, CheckoutError> {
        self.ensure_form()?;

        let request = self.order_request(payment_method_id);
        if request.ticket_types.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let order = self.api.create_order(&request).await.map_err(|e| match e {
            ClientError::Rejected { reason, .. } => CheckoutError::OrderRejected(reason),
            other => CheckoutError::Backend(other),
        })?;

        tracing::info!(session_id = %self.id, order_id = %order.order_id, "Checkout moved to payment");
        self.step = CheckoutStep::Payment {
            order_id: order.order_id.clone(),
            payment_invoice: order.payment_invoice.clone(),
        };
        Ok(order)
    }

    /// Order payload for the current cart. Unknown ticket types are left out.
    pub fn order_request(&self, payment_method_id: Option<String>) -> OrderRequest {
        let known: CartSelection = self
            .cart
            .lines()
            .filter(|(id, _)| self.catalog.find(id).is_some())
            .map(|(id, quantity)| (id.clone(), quantity))
            .collect();

        OrderRequest::from_cart(
            self.catalog.event_id.clone(),
            &known,
            self.discount.as_ref().map(|discount| discount.code.clone()),
            payment_method_id,
        )
    }

    /// Marks the pending order as paid. The cart is discarded.
    pub fn confirm_payment(&mut self) -> Result<OrderId, CheckoutError> {
        let CheckoutStep::Payment { order_id, .. } = &self.step else {
            return Err(CheckoutError::WrongStep(self.step.name()));
        };
        let order_id = order_id.clone();

        tracing::info!(session_id = %self.id, %order_id, "Payment confirmed");
        self.step = CheckoutStep::Success {
            order_id: order_id.clone(),
        };
        self.cart.clear();
        self.discount = None;
        self.refresh();
        Ok(order_id)
    }

    /// Polls the backend until the pending order is paid, expires, or `timeout` elapses.
    pub async fn await_payment(
        &mut self,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<OrderId, CheckoutError> {
        let CheckoutStep::Payment { order_id, .. } = &self.step else {
            return Err(CheckoutError::WrongStep(self.step.name()));
        };
        let order_id = order_id.clone();

        let api = Arc::clone(&self.api);
        let poll = async {
            let mut interval = tokio::time::interval(poll_interval);
            loop {
                interval.tick().await;
                match api.payment_status(&order_id).await {
                    Ok(PaymentStatus::Paid) => return Ok(()),
                    Ok(PaymentStatus::Expired) => {
                        return Err(CheckoutError::PaymentExpired(order_id.clone()))
                    }
                    Ok(PaymentStatus::Pending) => {}
                    Err(e) => {
                        tracing::warn!(%order_id, error = %e, "Payment status check failed, retrying");
                    }
                }
            }
        };

        let outcome = tokio::time::timeout(timeout, poll).await;
        match outcome {
            Ok(Ok(())) => self.confirm_payment(),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CheckoutError::PaymentTimeout(order_id)),
        }
    }

    fn ensure_form(&self) -> Result<(), CheckoutError> {
        match self.step {
            CheckoutStep::Form => Ok(()),
            ref other => Err(CheckoutError::WrongStep(other.name())),
        }
    }

    fn refresh(&self) {
        let inputs = PricingInputs::new(Arc::clone(&self.catalog), self.cart.clone())
            .with_discount(self.discount.clone())
            .with_display_currency(self.display_currency);
        // The handle is not awaited; results surface through the live summary.
        drop(self.summary.recompute(inputs));
    }
}
