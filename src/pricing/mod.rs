//! Checkout pricing: turns a cart, an optional discount and the event's
//! ticket types into the totals shown to the buyer.
//!
//! Subtotals are kept in their native currency until the end: only subtotals
//! priced in a currency other than the display currency go through the
//! converter, all conversions for one computation run concurrently, and
//! rounding to two decimals happens once, on the final discount and total.

mod live;

pub use live::LiveSummary;

use chrono::Utc;
use futures::future::try_join_all;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use thiserror::Error;

use crate::converter::{ConversionError, CurrencyConverter};
use crate::models::{CartSelection, CheckoutSummary, Currency, DiscountCode, EventCatalog};

/// Decimal places of every displayed amount.
pub const DISPLAY_SCALE: u32 = 2;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Currency conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Checkout total overflowed")]
    Overflow,
}

/// Everything a summary depends on. A change to any field requires a recomputation.
#[derive(Debug, Clone)]
pub struct PricingInputs {
    pub catalog: Arc<EventCatalog>,
    pub cart: CartSelection,
    pub discount: Option<DiscountCode>,
    /// Overrides the display currency derived from the catalog.
    pub display_currency: Option<Currency>,
}

impl PricingInputs {
    pub fn new(catalog: Arc<EventCatalog>, cart: CartSelection) -> Self {
        Self {
            catalog,
            cart,
            discount: None,
            display_currency: None,
        }
    }

    pub fn with_discount(mut self, discount: Option<DiscountCode>) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_display_currency(mut self, currency: Option<Currency>) -> Self {
        self.display_currency = currency;
        self
    }
}

pub fn round_for_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub struct PricingEngine {
    converter: Arc<dyn CurrencyConverter>,
    fallback_currency: Currency,
}

impl PricingEngine {
    pub fn new(converter: Arc<dyn CurrencyConverter>, fallback_currency: Currency) -> Self {
        Self {
            converter,
            fallback_currency,
        }
    }

    pub fn fallback_currency(&self) -> Currency {
        self.fallback_currency
    }

    pub fn display_currency(&self, inputs: &PricingInputs) -> Currency {
        inputs
            .display_currency
            .unwrap_or_else(|| inputs.catalog.display_currency(self.fallback_currency))
    }

    pub async fn summarize(&self, inputs: &PricingInputs) -> Result<CheckoutSummary, PricingError> {
        let display_currency = self.display_currency(inputs);

        let mut subtotals = Vec::new();
        for (id, quantity) in inputs.cart.lines() {
            let Some(ticket_type) = inputs.catalog.find(id) else {
                tracing::debug!(ticket_type_id = %id, "Skipping cart entry for unknown ticket type");
                continue;
            };
            let subtotal = ticket_type
                .price
                .checked_mul(Decimal::from(quantity))
                .ok_or(PricingError::Overflow)?;
            subtotals.push((subtotal, ticket_type.currency));
        }

        if subtotals.is_empty() {
            return Ok(CheckoutSummary::zero(display_currency));
        }

        let conversions = subtotals.into_iter().map(|(subtotal, currency)| {
            let converter = Arc::clone(&self.converter);
            async move {
                if currency == display_currency {
                    Ok(subtotal)
                } else {
                    converter.convert(subtotal, currency, display_currency).await
                }
            }
        });
        let converted = try_join_all(conversions).await?;

        let total = converted
            .into_iter()
            .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
            .ok_or(PricingError::Overflow)?;

        let percentage = self.applicable_percentage(inputs.discount.as_ref());
        let discount_amount = total
            .checked_mul(percentage)
            .and_then(|amount| amount.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(PricingError::Overflow)?;

        Ok(CheckoutSummary {
            display_total: round_for_display(total - discount_amount),
            display_discount: round_for_display(discount_amount),
            display_currency,
        })
    }

    fn applicable_percentage(&self, discount: Option<&DiscountCode>) -> Decimal {
        let Some(discount) = discount else {
            return Decimal::ZERO;
        };
        match discount.check(Utc::now()) {
            Ok(()) => discount.percentage,
            Err(reason) => {
                tracing::warn!(code = %discount.code, %reason, "Ignoring inapplicable discount code");
                Decimal::ZERO
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::{EventId, TicketType, TicketTypeId};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Converter with fixed rates that records every call it receives.
    pub struct RecordingConverter {
        rates: Vec<((Currency, Currency), Decimal)>,
        delay: Mutex<Vec<Duration>>,
        pub calls: Mutex<Vec<(Decimal, Currency, Currency)>>,
        pub fail: bool,
    }

    impl RecordingConverter {
        pub fn new() -> Self {
            Self {
                rates: Vec::new(),
                delay: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub fn with_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
            self.rates.push(((from, to), rate));
            self
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        /// Delays applied to successive calls, in call order.
        pub fn with_delays(self, delays: Vec<Duration>) -> Self {
            *self.delay.lock().unwrap() = delays;
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CurrencyConverter for RecordingConverter {
        async fn convert(
            &self,
            amount: Decimal,
            from: Currency,
            to: Currency,
        ) -> Result<Decimal, ConversionError> {
            self.calls.lock().unwrap().push((amount, from, to));
            let delay = {
                let mut delays = self.delay.lock().unwrap();
                if delays.is_empty() {
                    None
                } else {
                    Some(delays.remove(0))
                }
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(ConversionError::Rejected {
                    status: 503,
                    message: "rate service unavailable".to_string(),
                });
            }
            self.rates
                .iter()
                .find(|(pair, _)| *pair == (from, to))
                .map(|(_, rate)| amount * *rate)
                .ok_or(ConversionError::UnsupportedPair { from, to })
        }
    }

    pub fn ticket_type(id: &str, price: Decimal, currency: Currency) -> TicketType {
        TicketType {
            id: TicketTypeId::new(id),
            name: id.to_uppercase(),
            price,
            currency,
            quantity: 100,
            sold_count: 0,
        }
    }

    pub fn catalog(ticket_types: Vec<TicketType>) -> Arc<EventCatalog> {
        Arc::new(EventCatalog::new(EventId::new("event-1"), ticket_types))
    }

    pub fn cart(lines: &[(&str, u32)]) -> CartSelection {
        lines
            .iter()
            .map(|(id, quantity)| (TicketTypeId::new(*id), *quantity))
            .collect()
    }

    pub fn discount(percentage: Decimal) -> DiscountCode {
        DiscountCode {
            code: "PROMO".to_string(),
            percentage,
            active: true,
            expires_at: None,
            max_uses: None,
            used: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn usd_catalog() -> Arc<EventCatalog> {
        catalog(vec![
            ticket_type("A", Decimal::from(100), Currency::Usd),
            ticket_type("B", Decimal::from(50), Currency::Usd),
        ])
    }

    fn engine(converter: Arc<RecordingConverter>) -> PricingEngine {
        PricingEngine::new(converter, Currency::Usd)
    }

    #[tokio::test]
    async fn test_single_currency_cart_needs_no_conversion() {
        let converter = Arc::new(RecordingConverter::new());
        let engine = engine(converter.clone());

        let inputs = PricingInputs::new(usd_catalog(), cart(&[("A", 2), ("B", 1)]));
        let summary = engine.summarize(&inputs).await.unwrap();

        assert_eq!(summary.display_total, Decimal::from(250));
        assert_eq!(summary.display_discount, Decimal::ZERO);
        assert_eq!(summary.display_currency, Currency::Usd);
        assert_eq!(converter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_percentage_discount_is_applied() {
        let converter = Arc::new(RecordingConverter::new());
        let engine = engine(converter);

        let inputs = PricingInputs::new(usd_catalog(), cart(&[("A", 2), ("B", 1)]))
            .with_discount(Some(discount(Decimal::from(20))));
        let summary = engine.summarize(&inputs).await.unwrap();

        assert_eq!(summary.display_discount, Decimal::from(50));
        assert_eq!(summary.display_total, Decimal::from(200));
    }

    #[tokio::test]
    async fn test_mixed_currencies_convert_only_foreign_subtotals() {
        let converter = Arc::new(
            RecordingConverter::new().with_rate(Currency::Sat, Currency::Usd, Decimal::new(65, 5)),
        );
        let engine = engine(converter.clone());

        let inputs = PricingInputs::new(
            catalog(vec![
                ticket_type("C", Decimal::from(1000), Currency::Sat),
                ticket_type("D", Decimal::from(10), Currency::Usd),
            ]),
            cart(&[("C", 1), ("D", 1)]),
        );
        let summary = engine.summarize(&inputs).await.unwrap();

        // 1000 SAT * 0.00065 = 0.65 USD
        assert_eq!(summary.display_currency, Currency::Usd);
        assert_eq!(summary.display_total, Decimal::new(1065, 2));
        let calls = converter.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(Decimal::from(1000), Currency::Sat, Currency::Usd)]);
    }

    #[tokio::test]
    async fn test_empty_cart_short_circuits() {
        let converter = Arc::new(RecordingConverter::failing());
        let engine = engine(converter.clone());

        let inputs = PricingInputs::new(
            catalog(vec![ticket_type("C", Decimal::from(1000), Currency::Sat)]),
            cart(&[("C", 0)]),
        )
        .with_discount(Some(discount(Decimal::from(50))));
        let summary = engine.summarize(&inputs).await.unwrap();

        assert_eq!(summary.display_total, Decimal::ZERO);
        assert_eq!(summary.display_discount, Decimal::ZERO);
        assert_eq!(converter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_ticket_types_are_skipped() {
        let engine = engine(Arc::new(RecordingConverter::new()));

        let inputs = PricingInputs::new(usd_catalog(), cart(&[("A", 1), ("gone", 4)]));
        let summary = engine.summarize(&inputs).await.unwrap();

        assert_eq!(summary.display_total, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_conversion_failure_yields_no_total() {
        let engine = engine(Arc::new(RecordingConverter::failing()));

        let inputs = PricingInputs::new(
            catalog(vec![
                ticket_type("C", Decimal::from(1000), Currency::Sat),
                ticket_type("D", Decimal::from(10), Currency::Usd),
            ]),
            cart(&[("C", 1), ("D", 1)]),
        );
        let err = engine.summarize(&inputs).await.unwrap_err();

        assert!(matches!(err, PricingError::Conversion(_)));
    }

    #[tokio::test]
    async fn test_rounding_happens_once_on_final_amounts() {
        let engine = engine(Arc::new(RecordingConverter::new()));

        // 3 x 0.335 = 1.005, a subtotal rounded first would drift to 1.02.
        let inputs = PricingInputs::new(
            catalog(vec![
                ticket_type("A", Decimal::new(335, 3), Currency::Usd),
                ticket_type("B", Decimal::new(335, 3), Currency::Usd),
            ]),
            cart(&[("A", 1), ("B", 2)]),
        )
        .with_discount(Some(discount(Decimal::from(15))));
        let summary = engine.summarize(&inputs).await.unwrap();

        // discount = 1.005 * 0.15 = 0.15075, total = 0.85425
        assert_eq!(summary.display_discount, Decimal::new(15, 2));
        assert_eq!(summary.display_total, Decimal::new(85, 2));
    }

    #[tokio::test]
    async fn test_expired_discount_is_not_applied() {
        let engine = engine(Arc::new(RecordingConverter::new()));

        let mut expired = discount(Decimal::from(20));
        expired.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        let inputs = PricingInputs::new(usd_catalog(), cart(&[("A", 1)])).with_discount(Some(expired));
        let summary = engine.summarize(&inputs).await.unwrap();

        assert_eq!(summary.display_discount, Decimal::ZERO);
        assert_eq!(summary.display_total, Decimal::from(100));
    }

    #[tokio::test]
    async fn test_display_currency_override_converts_everything_else() {
        let converter = Arc::new(
            RecordingConverter::new().with_rate(Currency::Usd, Currency::Ars, Decimal::from(1000)),
        );
        let engine = engine(converter.clone());

        let inputs = PricingInputs::new(usd_catalog(), cart(&[("A", 1), ("B", 1)]))
            .with_display_currency(Some(Currency::Ars));
        let summary = engine.summarize(&inputs).await.unwrap();

        assert_eq!(summary.display_currency, Currency::Ars);
        assert_eq!(summary.display_total, Decimal::from(150_000));
        assert_eq!(converter.call_count(), 2);
    }

    #[tokio::test]
    async fn test_recomputing_same_inputs_is_idempotent() {
        let converter = Arc::new(
            RecordingConverter::new().with_rate(Currency::Sat, Currency::Usd, Decimal::new(65, 5)),
        );
        let engine = engine(converter);

        let inputs = PricingInputs::new(
            catalog(vec![
                ticket_type("C", Decimal::from(777), Currency::Sat),
                ticket_type("D", Decimal::new(999, 2), Currency::Usd),
            ]),
            cart(&[("C", 3), ("D", 2)]),
        )
        .with_discount(Some(discount(Decimal::new(125, 1))));

        let first = engine.summarize(&inputs).await.unwrap();
        let second = engine.summarize(&inputs).await.unwrap();
        assert_eq!(first, second);
    }
}
