//! Event router: concurrent fan-out of one event to every matched subscriber.
//!
//! Matched bindings are queued on a crossbeam work queue and drained by at
//! most `max_concurrency` delivery workers spawned for the route. Results come
//! back over a bounded channel sized to the match count, so a worker never
//! blocks on send. The router waits until every delivery has reported or the
//! deadline passes. Deliveries still running at the deadline are reported as
//! timed out and abandoned; queued ones that no worker started are never
//! attempted, and late results are discarded.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DeliveryError;

use super::binding::{BindingId, Subscriber};
use super::envelope::EventEnvelope;
use super::table::RoutingTable;

/// Performs one delivery attempt of an envelope to a subscriber.
///
/// Implementations see only the subscriber and the envelope, never the
/// binding set. Any closure `Fn(&Subscriber, &EventEnvelope) -> Result<(), String>`
/// is a deliverer; its error string becomes [`DeliveryError::Rejected`].
pub trait Deliverer: Send + Sync {
    /// Delivers `envelope` to `subscriber`.
    ///
    /// # Errors
    /// Any [`DeliveryError`]; it is recorded for this subscriber only.
    fn deliver(&self, subscriber: &Subscriber, envelope: &EventEnvelope) -> Result<(), DeliveryError>;
}

impl<F> Deliverer for F
where
    F: Fn(&Subscriber, &EventEnvelope) -> Result<(), String> + Send + Sync,
{
    fn deliver(&self, subscriber: &Subscriber, envelope: &EventEnvelope) -> Result<(), DeliveryError> {
        self(subscriber, envelope).map_err(DeliveryError::rejected)
    }
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    /// The deliverer returned success.
    Delivered,
    /// The deliverer failed, panicked, could not be started or ran past the deadline.
    Failed(DeliveryError),
}

impl DeliveryResult {
    /// Returns true for `Delivered`.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// The failure, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&DeliveryError> {
        match self {
            Self::Delivered => None,
            Self::Failed(e) => Some(e),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub binding_id: BindingId,
    pub subscriber: Subscriber,
    pub result: DeliveryResult,
}

/// Per-subscriber outcomes of routing one event, in match order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReport {
    /// Id of the routed envelope.
    pub event_id: Uuid,
    /// One entry per matched binding.
    pub outcomes: Vec<DeliveryOutcome>,
}

impl RouteReport {
    /// Number of successful deliveries.
    #[must_use]
    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_delivered()).count()
    }

    /// Outcomes that failed, in match order.
    pub fn failed(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.outcomes.iter().filter(|o| !o.result.is_delivered())
    }

    /// True when every matched subscriber was delivered to. Trivially true
    /// when nothing matched.
    #[must_use]
    pub fn all_delivered(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_delivered())
    }
}

/// Router configuration.
///
/// Deliveries are not cancellable. A worker stuck inside a deliverer past the
/// deadline keeps its thread until the deliverer returns, so a subscriber that
/// always hangs costs up to `max_concurrency` threads per route. Deliverers
/// should enforce their own I/O timeouts.
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Budget for one `route` call, measured from its start. A budget too large
    /// to represent as an `Instant` waits for every delivery.
    pub delivery_timeout: Duration,
    /// Upper bound on delivery workers per route.
    pub max_concurrency: usize,
    /// Name prefix for delivery threads.
    pub thread_name: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(10),
            max_concurrency: 64,
            thread_name: "kroute-delivery".to_string(),
        }
    }
}

/// Routes events through a [`RoutingTable`] to a [`Deliverer`].
pub struct Router {
    table: Arc<RoutingTable>,
    deliverer: Arc<dyn Deliverer>,
    cfg: RouterConfig,
}

impl Router {
    /// Creates a router over a shared table.
    #[must_use]
    pub fn new(table: Arc<RoutingTable>, deliverer: Arc<dyn Deliverer>, cfg: RouterConfig) -> Self {
        Self { table, deliverer, cfg }
    }

    /// The table this router reads.
    #[must_use]
    pub fn table(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.cfg
    }

    /// Routes `envelope` with the configured delivery timeout.
    #[must_use]
    pub fn route(&self, envelope: &EventEnvelope) -> RouteReport {
        self.dispatch(envelope, Instant::now().checked_add(self.cfg.delivery_timeout))
    }

    /// Routes `envelope`, waiting for deliveries no later than `deadline`.
    ///
    /// The binding set is read once. A failure for one subscriber never
    /// prevents attempts to the others.
    #[must_use]
    pub fn route_until(&self, envelope: &EventEnvelope, deadline: Instant) -> RouteReport {
        self.dispatch(envelope, Some(deadline))
    }

    /// `deadline == None` waits until every delivery reports.
    fn dispatch(&self, envelope: &EventEnvelope, deadline: Option<Instant>) -> RouteReport {
        let started = Instant::now();
        let matches = self.table.match_bindings(envelope);
        debug!(
            event_id = %envelope.id(),
            event_type = envelope.event_type(),
            source = envelope.source(),
            matches = matches.len(),
            "route"
        );

        if matches.is_empty() {
            return RouteReport {
                event_id: envelope.id(),
                outcomes: Vec::new(),
            };
        }

        let count = matches.len();
        let (job_tx, job_rx) = bounded::<(usize, Subscriber)>(count);
        for (idx, binding) in matches.iter().enumerate() {
            // Capacity equals the match count.
            let _ = job_tx.send((idx, binding.subscriber.clone()));
        }
        drop(job_tx);

        let shared = Arc::new(envelope.clone());
        let expired = Arc::new(AtomicBool::new(false));
        let (tx, rx) = bounded::<(usize, DeliveryResult)>(count);
        let mut results: Vec<Option<DeliveryResult>> = (0..count).map(|_| None).collect();

        let workers = self.cfg.max_concurrency.clamp(1, count);
        let mut spawned = 0usize;
        let mut spawn_error = None;
        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let tx = tx.clone();
            let deliverer = Arc::clone(&self.deliverer);
            let envelope = Arc::clone(&shared);
            let expired = Arc::clone(&expired);

            let handle = thread::Builder::new()
                .name(format!("{}-{worker}", self.cfg.thread_name))
                .spawn(move || {
                    while let Ok((idx, subscriber)) = job_rx.recv() {
                        if expired.load(Ordering::Acquire) {
                            break;
                        }
                        let result = deliver_guarded(deliverer.as_ref(), &subscriber, &envelope);
                        // The router stops listening after the deadline.
                        if tx.send((idx, result)).is_err() {
                            break;
                        }
                    }
                });

            match handle {
                Ok(_) => spawned += 1,
                Err(e) => {
                    warn!(worker, error = %e, "failed to spawn delivery worker");
                    spawn_error = Some(e.to_string());
                }
            }
        }
        drop(tx);
        drop(job_rx);

        if spawned == 0 {
            let message = spawn_error.unwrap_or_default();
            for slot in &mut results {
                *slot = Some(DeliveryResult::Failed(DeliveryError::Spawn {
                    message: message.clone(),
                }));
            }
        }

        let mut pending = results.iter().filter(|r| r.is_none()).count();
        while pending > 0 {
            let received = match deadline {
                Some(deadline) => rx.recv_deadline(deadline),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((idx, result)) => {
                    if results[idx].replace(result).is_none() {
                        pending -= 1;
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }
        expired.store(true, Ordering::Release);

        let duration_ms = deadline.map_or(u64::MAX, |deadline| {
            u64::try_from(deadline.saturating_duration_since(started).as_millis()).unwrap_or(u64::MAX)
        });
        let outcomes: Vec<DeliveryOutcome> = matches
            .iter()
            .zip(results)
            .map(|(binding, result)| DeliveryOutcome {
                binding_id: binding.id,
                subscriber: binding.subscriber.clone(),
                result: result.unwrap_or(DeliveryResult::Failed(DeliveryError::Timeout { duration_ms })),
            })
            .collect();

        for outcome in &outcomes {
            if let DeliveryResult::Failed(error) = &outcome.result {
                warn!(
                    event_id = %envelope.id(),
                    binding_id = %outcome.binding_id,
                    subscriber = outcome.subscriber.name(),
                    error = %error,
                    "delivery failed"
                );
            }
        }

        RouteReport {
            event_id: envelope.id(),
            outcomes,
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("table", &self.table)
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

fn deliver_guarded(deliverer: &dyn Deliverer, subscriber: &Subscriber, envelope: &EventEnvelope) -> DeliveryResult {
    match panic::catch_unwind(AssertUnwindSafe(|| deliverer.deliver(subscriber, envelope))) {
        Ok(Ok(())) => DeliveryResult::Delivered,
        Ok(Err(e)) => DeliveryResult::Failed(e),
        Err(payload) => DeliveryResult::Failed(DeliveryError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
