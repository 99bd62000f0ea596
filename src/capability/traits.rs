//! Watch and list capability contracts.
//!
//! The transport behind a capability (API server informer, cache, fake) is an
//! external collaborator. These traits are the only surface the registry and
//! its callers rely on.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::ResourceDescriptor;
use crate::error::BrokerResult;

use super::object::{LabelSelector, ResourceObject};
use super::stream::WatchStream;

/// Produces change notifications for one resource kind.
pub trait Watcher: Send + Sync {
    /// Opens a new watch. Each call returns an independent stream.
    fn watch(&self) -> BrokerResult<WatchStream>;
}

/// Reads the current state of one resource kind.
pub trait Lister: Send + Sync {
    /// Lists objects matching `selector`, restricted to `namespace` when given.
    fn list(&self, namespace: Option<&str>, selector: &LabelSelector) -> BrokerResult<Vec<ResourceObject>>;

    /// Gets a single object by name.
    fn get(&self, namespace: Option<&str>, name: &str) -> BrokerResult<Option<ResourceObject>>;
}

/// The {watcher, lister} pair bound to one resource kind.
#[derive(Clone)]
pub struct Capability {
    descriptor: ResourceDescriptor,
    watcher: Arc<dyn Watcher>,
    lister: Arc<dyn Lister>,
}

impl Capability {
    /// Binds a watcher and lister to `descriptor`.
    #[must_use]
    pub fn new(descriptor: ResourceDescriptor, watcher: Arc<dyn Watcher>, lister: Arc<dyn Lister>) -> Self {
        Self {
            descriptor,
            watcher,
            lister,
        }
    }

    /// The resource kind this capability serves.
    #[must_use]
    pub const fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Watch half of the pair.
    #[must_use]
    pub fn watcher(&self) -> &dyn Watcher {
        self.watcher.as_ref()
    }

    /// List half of the pair.
    #[must_use]
    pub fn lister(&self) -> &dyn Lister {
        self.lister.as_ref()
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
