//! Subscription routing: filter predicates, the binding table and the router.

/// Subscribers and binding ids.
pub mod binding;
/// The routed event.
pub mod envelope;
/// (type, source) predicates with per-side wildcards.
pub mod filter;
/// Concurrent fan-out to matched subscribers.
pub mod router;
/// The live binding set and `match_all`.
pub mod table;

pub use binding::{Binding, BindingId, Subscriber};
pub use envelope::EventEnvelope;
pub use filter::{FilterPredicate, Matcher, ANY_FILTER};
pub use router::{Deliverer, DeliveryOutcome, DeliveryResult, RouteReport, Router, RouterConfig};
pub use table::RoutingTable;
