//! Capability subsystem: resolving resource kinds to watch/list capabilities.
//!
//! A caller holding only a [`ResourceDescriptor`](crate::ResourceDescriptor)
//! obtains a typed [`Capability`] from the [`CapabilityRegistry`] without
//! knowing the concrete resource kind at compile time.

/// In-memory reference backend.
pub mod memory;
/// Resource objects, watch events and label selectors.
pub mod object;
/// Descriptor to capability registry.
pub mod registry;
/// Watch stream handle.
pub mod stream;
/// Watcher and lister contracts.
pub mod traits;

pub use memory::{InMemoryResourceStore, InMemoryStoreConfig};
pub use object::{LabelSelector, ResourceObject, WatchEvent};
pub use registry::{CapabilityFactory, CapabilityRegistry};
pub use stream::WatchStream;
pub use traits::{Capability, Lister, Watcher};
