//! In-memory watch/list backend.
//!
//! This module provides a thread-safe in-memory implementation of the
//! capability traits. It is intended for embedded usage, tests, and as a
//! reference implementation for real informer-backed capabilities.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crossbeam_channel::{bounded, Sender, TrySendError};
use tracing::{debug, warn};

use crate::descriptor::ResourceDescriptor;
use crate::error::{lock_err, BrokerResult};

use super::object::{LabelSelector, ResourceObject, WatchEvent};
use super::stream::WatchStream;
use super::traits::{Capability, Lister, Watcher};

/// Configuration for [`InMemoryResourceStore`].
#[derive(Debug, Clone)]
pub struct InMemoryStoreConfig {
    /// Per-watch buffer capacity, on top of the initial listing.
    pub stream_capacity: usize,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self { stream_capacity: 1024 }
    }
}

type ObjectKey = (Option<String>, String);

#[derive(Debug, Default)]
struct StoreState {
    objects: BTreeMap<ObjectKey, ResourceObject>,
    watchers: Vec<Sender<WatchEvent>>,
}

/// Objects of a single resource kind held in memory, with watch fan-out.
///
/// Writers never block on slow watchers: a full watch buffer drops the event
/// and counts it in [`dropped_events`](Self::dropped_events). A new watch
/// first receives an `Added` event for every object already stored.
#[derive(Debug)]
pub struct InMemoryResourceStore {
    descriptor: ResourceDescriptor,
    cfg: InMemoryStoreConfig,
    state: RwLock<StoreState>,
    dropped_events: AtomicU64,
}

impl InMemoryResourceStore {
    /// Creates an empty store with default configuration.
    #[must_use]
    pub fn new(descriptor: ResourceDescriptor) -> Self {
        Self::with_config(descriptor, InMemoryStoreConfig::default())
    }

    /// Creates an empty store.
    #[must_use]
    pub fn with_config(descriptor: ResourceDescriptor, cfg: InMemoryStoreConfig) -> Self {
        Self {
            descriptor,
            cfg,
            state: RwLock::new(StoreState::default()),
            dropped_events: AtomicU64::new(0),
        }
    }

    /// The resource kind held by this store.
    #[must_use]
    pub const fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// A factory yielding capabilities backed by `store`, suitable for
    /// [`CapabilityRegistry::register`](super::CapabilityRegistry::register).
    pub fn capability_factory(store: &Arc<Self>) -> impl Fn() -> Capability + Send + Sync + 'static {
        let store = Arc::clone(store);
        move || {
            Capability::new(
                store.descriptor.clone(),
                Arc::clone(&store) as Arc<dyn Watcher>,
                Arc::clone(&store) as Arc<dyn Lister>,
            )
        }
    }

    /// Inserts or updates an object, notifying watchers with `Added` or `Modified`.
    pub fn apply(&self, object: ResourceObject) -> BrokerResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("in-memory store"))?;
        let key = (object.namespace.clone(), object.name.clone());
        let event = if state.objects.insert(key, object.clone()).is_some() {
            WatchEvent::Modified(object)
        } else {
            WatchEvent::Added(object)
        };
        self.broadcast(&mut state, &event);
        Ok(())
    }

    /// Removes an object, notifying watchers with `Deleted`.
    ///
    /// Returns the removed object, or `None` if it was not stored.
    pub fn delete(&self, namespace: Option<&str>, name: &str) -> BrokerResult<Option<ResourceObject>> {
        let mut state = self.state.write().map_err(|_| lock_err("in-memory store"))?;
        let key = (namespace.map(str::to_string), name.to_string());
        let removed = state.objects.remove(&key);
        if let Some(obj) = &removed {
            self.broadcast(&mut state, &WatchEvent::Deleted(obj.clone()));
        }
        Ok(removed)
    }

    /// Number of events dropped because a watch buffer was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Number of watches still attached.
    pub fn watcher_count(&self) -> BrokerResult<usize> {
        let state = self.state.read().map_err(|_| lock_err("in-memory store"))?;
        Ok(state.watchers.len())
    }

    fn broadcast(&self, state: &mut StoreState, event: &WatchEvent) {
        state.watchers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                warn!(resource = %self.descriptor, "watch buffer full, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl Watcher for InMemoryResourceStore {
    fn watch(&self) -> BrokerResult<WatchStream> {
        let mut state = self.state.write().map_err(|_| lock_err("in-memory store"))?;

        let capacity = self.cfg.stream_capacity.max(1) + state.objects.len();
        let (tx, rx) = bounded::<WatchEvent>(capacity);
        for obj in state.objects.values() {
            // Capacity covers the initial listing.
            let _ = tx.try_send(WatchEvent::Added(obj.clone()));
        }
        state.watchers.push(tx);

        debug!(resource = %self.descriptor, watchers = state.watchers.len(), "watch opened");
        Ok(WatchStream::new(self.descriptor.clone(), rx))
    }
}

impl Lister for InMemoryResourceStore {
    fn list(&self, namespace: Option<&str>, selector: &LabelSelector) -> BrokerResult<Vec<ResourceObject>> {
        let state = self.state.read().map_err(|_| lock_err("in-memory store"))?;
        Ok(state
            .objects
            .values()
            .filter(|o| namespace.map_or(true, |ns| o.namespace.as_deref() == Some(ns)))
            .filter(|o| selector.matches(&o.labels))
            .cloned()
            .collect())
    }

    fn get(&self, namespace: Option<&str>, name: &str) -> BrokerResult<Option<ResourceObject>> {
        let state = self.state.read().map_err(|_| lock_err("in-memory store"))?;
        let key = (namespace.map(str::to_string), name.to_string());
        Ok(state.objects.get(&key).cloned())
    }
}
