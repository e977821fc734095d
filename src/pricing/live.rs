use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{PricingEngine, PricingInputs};
use crate::models::{SummarySnapshot, SummaryState};

/// A checkout summary that is recomputed whenever its inputs change.
///
/// Every call to [`LiveSummary::recompute`] starts a new input generation.
/// A computation only publishes its result while its generation is still the
/// latest one, so a slow computation for an older cart can never overwrite
/// the summary of a newer cart.
pub struct LiveSummary {
    engine: Arc<PricingEngine>,
    generation: Arc<AtomicU64>,
    tx: Arc<watch::Sender<SummarySnapshot>>,
}

impl LiveSummary {
    pub fn new(engine: Arc<PricingEngine>) -> Self {
        let (tx, _rx) = watch::channel(SummarySnapshot {
            generation: 0,
            state: SummaryState::Pending,
        });
        Self {
            engine,
            generation: Arc::new(AtomicU64::new(0)),
            tx: Arc::new(tx),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SummarySnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SummarySnapshot {
        self.tx.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Starts a recomputation for `inputs`, superseding any computation in flight.
    ///
    /// The returned handle resolves to `true` if the result was published and
    /// `false` if newer inputs arrived first.
    pub fn recompute(&self, inputs: PricingInputs) -> JoinHandle<bool> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        publish_if_current(&self.tx, &self.generation, generation, SummaryState::Pending);

        let engine = Arc::clone(&self.engine);
        let current = Arc::clone(&self.generation);
        let tx = Arc::clone(&self.tx);

        tokio::spawn(async move {
            let state = match engine.summarize(&inputs).await {
                Ok(summary) => SummaryState::Ready(summary),
                Err(e) => {
                    tracing::warn!(generation, error = %e, "Checkout summary unavailable");
                    SummaryState::Unavailable {
                        reason: e.to_string(),
                    }
                }
            };

            let published = publish_if_current(&tx, &current, generation, state);
            if !published {
                tracing::debug!(
                    generation,
                    latest = current.load(Ordering::SeqCst),
                    "Discarding superseded checkout summary"
                );
            }
            published
        })
    }

    /// Waits until the summary for the latest generation is no longer pending.
    pub async fn settled(&self) -> SummarySnapshot {
        let mut rx = self.subscribe();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if snapshot.generation == self.generation()
                    && snapshot.state != SummaryState::Pending
                {
                    return snapshot.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.current();
            }
        }
    }
}

// The generation check runs under the channel's write lock, so a stale result
// cannot be written after a newer one has been published.
fn publish_if_current(
    tx: &watch::Sender<SummarySnapshot>,
    current: &AtomicU64,
    generation: u64,
    state: SummaryState,
) -> bool {
    tx.send_if_modified(|snapshot| {
        if current.load(Ordering::SeqCst) != generation || snapshot.generation > generation {
            return false;
        }
        *snapshot = SummarySnapshot { generation, state };
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use crate::pricing::test_support::*;
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn live(converter: Arc<RecordingConverter>) -> LiveSummary {
        LiveSummary::new(Arc::new(PricingEngine::new(converter, Currency::Usd)))
    }

    #[tokio::test]
    async fn test_recompute_publishes_ready_summary() {
        let summary = live(Arc::new(RecordingConverter::new()));
        let catalog = catalog(vec![ticket_type("A", Decimal::from(100), Currency::Usd)]);

        let handle = summary.recompute(PricingInputs::new(catalog, cart(&[("A", 2)])));
        assert!(handle.await.unwrap());

        let snapshot = summary.current();
        assert_eq!(snapshot.generation, 1);
        let ready = snapshot.state.summary().unwrap();
        assert_eq!(ready.display_total, Decimal::from(200));
    }

    #[tokio::test]
    async fn test_superseded_result_is_discarded() {
        // First computation converts slowly, the second one needs no conversion.
        let converter = Arc::new(
            RecordingConverter::new()
                .with_rate(Currency::Sat, Currency::Usd, Decimal::new(65, 5))
                .with_delays(vec![Duration::from_millis(200)]),
        );
        let summary = live(converter);
        let catalog = catalog(vec![
            ticket_type("C", Decimal::from(1000), Currency::Sat),
            ticket_type("D", Decimal::from(10), Currency::Usd),
        ]);

        let stale = summary.recompute(PricingInputs::new(catalog.clone(), cart(&[("C", 1), ("D", 1)])));
        let fresh = summary.recompute(PricingInputs::new(catalog, cart(&[("D", 3)])));

        assert!(fresh.await.unwrap());
        assert!(!stale.await.unwrap());

        let snapshot = summary.current();
        assert_eq!(snapshot.generation, 2);
        let ready = snapshot.state.summary().unwrap();
        assert_eq!(ready.display_total, Decimal::from(30));
    }

    #[tokio::test]
    async fn test_conversion_failure_publishes_unavailable() {
        let summary = live(Arc::new(RecordingConverter::failing()));
        let catalog = catalog(vec![
            ticket_type("C", Decimal::from(1000), Currency::Sat),
            ticket_type("D", Decimal::from(10), Currency::Usd),
        ]);

        summary
            .recompute(PricingInputs::new(catalog, cart(&[("C", 1), ("D", 1)])))
            .await
            .unwrap();

        assert!(matches!(
            summary.current().state,
            SummaryState::Unavailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_settled_waits_for_latest_generation() {
        let converter = Arc::new(
            RecordingConverter::new()
                .with_rate(Currency::Sat, Currency::Usd, Decimal::new(65, 5))
                .with_delays(vec![Duration::from_millis(50)]),
        );
        let summary = live(converter);
        let catalog = catalog(vec![
            ticket_type("C", Decimal::from(1000), Currency::Sat),
            ticket_type("D", Decimal::from(10), Currency::Usd),
        ]);

        let _handle = summary.recompute(PricingInputs::new(catalog, cart(&[("C", 2), ("D", 1)])));
        assert_eq!(summary.current().state, SummaryState::Pending);

        let snapshot = summary.settled().await;
        assert_eq!(snapshot.generation, 1);
        assert_eq!(
            snapshot.state.summary().unwrap().display_total,
            Decimal::new(1130, 2)
        );
    }
}
