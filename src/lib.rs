//! # kroute - routing and dispatch core for a Kubernetes-native event broker
//!
//! kroute resolves resource kinds to watch/list capabilities at runtime and
//! routes events to the subscribers whose filters they match.
//!
//! ## Core Concepts
//!
//! - **ResourceDescriptor**: (group, version, resource) naming a resource kind
//! - **CapabilityRegistry**: maps descriptors to watcher/lister capabilities
//! - **FilterPredicate**: (type, source) matcher pair with per-side wildcards
//! - **RoutingTable**: the live bindings of predicates to subscribers
//! - **Router**: concurrent fan-out of one event to every matched subscriber
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kroute::{EventEnvelope, FilterPredicate, Router, RouterConfig, RoutingTable, Subscriber};
//!
//! let table = Arc::new(RoutingTable::new());
//! table.bind(
//!     FilterPredicate::from_filter_values("dev.knative.type1", ""),
//!     Subscriber::new("dumper", "http://dumper.default.svc")?,
//! );
//!
//! let router = Router::new(table, Arc::new(http_deliverer), RouterConfig::default());
//! let report = router.route(&EventEnvelope::new("dev.knative.type1", "/source1", body)?);
//! for failed in report.failed() {
//!     // retry is up to the caller
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod descriptor;
pub mod error;
pub mod labels;
pub mod routing;

pub use capability::{
    Capability, CapabilityFactory, CapabilityRegistry, InMemoryResourceStore, InMemoryStoreConfig, LabelSelector,
    Lister, ResourceObject, WatchEvent, WatchStream, Watcher,
};
pub use descriptor::{eventing_descriptors, ResourceDescriptor};
pub use error::{
    BindingError, BrokerError, BrokerResult, DeliveryError, ExecutionError, RegistryError, ValidationError,
};
pub use routing::{
    Binding, BindingId, Deliverer, DeliveryOutcome, DeliveryResult, EventEnvelope, FilterPredicate, Matcher,
    RouteReport, Router, RouterConfig, RoutingTable, Subscriber, ANY_FILTER,
};
