//! Capability registry: resolves a resource descriptor to its capability.
//!
//! The key space is open. Any kind can be registered at any time up to its
//! first use, and resolving a kind nobody registered is an ordinary
//! `NotFound`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use crate::descriptor::ResourceDescriptor;
use crate::error::{lock_err, BrokerResult, RegistryError};

use super::traits::Capability;

/// Zero-argument constructor for a [`Capability`].
pub type CapabilityFactory = Arc<dyn Fn() -> Capability + Send + Sync>;

struct RegistryEntry {
    factory: CapabilityFactory,
    instance: OnceLock<Arc<Capability>>,
}

impl RegistryEntry {
    fn new(factory: CapabilityFactory) -> Self {
        Self {
            factory,
            instance: OnceLock::new(),
        }
    }

    fn capability(&self) -> Arc<Capability> {
        Arc::clone(self.instance.get_or_init(|| Arc::new((self.factory)())))
    }
}

/// Maps resource descriptors to lazily constructed capabilities.
///
/// Each entry's factory runs at most once, on first [`resolve`](Self::resolve);
/// later resolves share the same instance. Duplicate registration is rejected
/// unless [`register_or_replace`](Self::register_or_replace) is used.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: RwLock<HashMap<ResourceDescriptor, Arc<RegistryEntry>>>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `descriptor` to `factory`.
    ///
    /// # Errors
    /// - `InvalidDescriptor` if the descriptor breaks Kubernetes naming rules
    /// - `DuplicateRegistration` if the descriptor is already bound
    pub fn register<F>(&self, descriptor: ResourceDescriptor, factory: F) -> BrokerResult<()>
    where
        F: Fn() -> Capability + Send + Sync + 'static,
    {
        descriptor.validate()?;

        let mut entries = self.entries.write().map_err(|_| lock_err("capability registry"))?;
        if entries.contains_key(&descriptor) {
            debug!(resource = %descriptor, "rejecting duplicate registration");
            return Err(RegistryError::DuplicateRegistration { descriptor }.into());
        }

        debug!(resource = %descriptor, "registered capability");
        entries.insert(descriptor, Arc::new(RegistryEntry::new(Arc::new(factory))));
        Ok(())
    }

    /// Binds `descriptor` to `factory`, discarding any previous entry and its
    /// cached capability. Returns true if an entry was replaced.
    pub fn register_or_replace<F>(&self, descriptor: ResourceDescriptor, factory: F) -> BrokerResult<bool>
    where
        F: Fn() -> Capability + Send + Sync + 'static,
    {
        descriptor.validate()?;

        let mut entries = self.entries.write().map_err(|_| lock_err("capability registry"))?;
        let replaced = entries
            .insert(descriptor.clone(), Arc::new(RegistryEntry::new(Arc::new(factory))))
            .is_some();

        debug!(resource = %descriptor, replaced, "registered capability");
        Ok(replaced)
    }

    /// Registers each pair in order, stopping at the first failure.
    ///
    /// Pairs registered before the failure stay registered.
    pub fn register_all<I>(&self, pairs: I) -> BrokerResult<()>
    where
        I: IntoIterator<Item = (ResourceDescriptor, CapabilityFactory)>,
    {
        for (descriptor, factory) in pairs {
            self.register(descriptor, move || factory())?;
        }
        Ok(())
    }

    /// Resolves `descriptor` by exact (group, version, resource) equality.
    ///
    /// # Errors
    /// `NotFound` naming the descriptor when nothing is registered for it.
    pub fn resolve(&self, descriptor: &ResourceDescriptor) -> BrokerResult<Arc<Capability>> {
        let entry = {
            let entries = self.entries.read().map_err(|_| lock_err("capability registry"))?;
            entries.get(descriptor).cloned()
        };

        match entry {
            // The factory runs outside the map lock.
            Some(entry) => Ok(entry.capability()),
            None => {
                debug!(resource = %descriptor, "no capability registered");
                Err(RegistryError::NotFound {
                    descriptor: descriptor.clone(),
                }
                .into())
            }
        }
    }

    /// Returns true if `descriptor` is registered.
    pub fn contains(&self, descriptor: &ResourceDescriptor) -> BrokerResult<bool> {
        let entries = self.entries.read().map_err(|_| lock_err("capability registry"))?;
        Ok(entries.contains_key(descriptor))
    }

    /// Registered descriptors, sorted.
    pub fn descriptors(&self) -> BrokerResult<Vec<ResourceDescriptor>> {
        let entries = self.entries.read().map_err(|_| lock_err("capability registry"))?;
        let mut out: Vec<ResourceDescriptor> = entries.keys().cloned().collect();
        out.sort();
        Ok(out)
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> BrokerResult<usize> {
        let entries = self.entries.read().map_err(|_| lock_err("capability registry"))?;
        Ok(entries.len())
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> BrokerResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.entries.read().map(|e| e.len()).ok();
        f.debug_struct("CapabilityRegistry")
            .field("entries", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::capability::InMemoryResourceStore;
    use crate::error::{BrokerError, ValidationError};

    fn triggers() -> ResourceDescriptor {
        ResourceDescriptor::new("eventing.knative.dev", "v1alpha1", "triggers")
    }

    fn store_factory(d: &ResourceDescriptor) -> impl Fn() -> Capability + Send + Sync + 'static {
        InMemoryResourceStore::capability_factory(&Arc::new(InMemoryResourceStore::new(d.clone())))
    }

    #[test]
    fn resolve_returns_registered_capability() {
        let reg = CapabilityRegistry::new();
        reg.register(triggers(), store_factory(&triggers())).unwrap();

        let cap = reg.resolve(&triggers()).unwrap();
        assert_eq!(cap.descriptor(), &triggers());
    }

    #[test]
    fn resolve_unknown_is_not_found() {
        let reg = CapabilityRegistry::new();
        let err = reg.resolve(&triggers()).unwrap_err();
        match err {
            BrokerError::Registry(RegistryError::NotFound { descriptor }) => {
                assert_eq!(descriptor, triggers());
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn resolve_does_not_fall_back_across_versions() {
        let reg = CapabilityRegistry::new();
        reg.register(triggers(), store_factory(&triggers())).unwrap();

        let v1 = ResourceDescriptor::new("eventing.knative.dev", "v1", "triggers");
        assert!(reg.resolve(&v1).unwrap_err().is_not_found());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let reg = CapabilityRegistry::new();
        reg.register(triggers(), store_factory(&triggers())).unwrap();
        let err = reg.register(triggers(), store_factory(&triggers())).unwrap_err();
        assert!(matches!(
            err,
            BrokerError::Registry(RegistryError::DuplicateRegistration { .. })
        ));
        assert_eq!(reg.len().unwrap(), 1);
    }

    #[test]
    fn invalid_descriptor_is_rejected() {
        let reg = CapabilityRegistry::new();
        let bad = ResourceDescriptor::new("eventing.knative.dev", "alpha", "triggers");
        let err = reg.register(bad.clone(), store_factory(&bad)).unwrap_err();
        assert!(matches!(
            err,
            BrokerError::Validation(ValidationError::InvalidDescriptor { .. })
        ));
        assert!(reg.is_empty().unwrap());
    }

    #[test]
    fn factory_runs_once_and_is_shared() {
        let reg = CapabilityRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = store_factory(&triggers());
        let counted = Arc::clone(&calls);
        reg.register(triggers(), move || {
            counted.fetch_add(1, Ordering::SeqCst);
            inner()
        })
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let a = reg.resolve(&triggers()).unwrap();
        let b = reg.resolve(&triggers()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn replace_discards_cached_capability() {
        let reg = CapabilityRegistry::new();
        assert!(!reg.register_or_replace(triggers(), store_factory(&triggers())).unwrap());
        let before = reg.resolve(&triggers()).unwrap();

        assert!(reg.register_or_replace(triggers(), store_factory(&triggers())).unwrap());
        let after = reg.resolve(&triggers()).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn register_all_stops_at_first_error() {
        let reg = CapabilityRegistry::new();
        let brokers = ResourceDescriptor::new("eventing.knative.dev", "v1alpha1", "brokers");
        let pairs: Vec<(ResourceDescriptor, CapabilityFactory)> = vec![
            (triggers(), Arc::new(store_factory(&triggers()))),
            (triggers(), Arc::new(store_factory(&triggers()))),
            (brokers.clone(), Arc::new(store_factory(&brokers))),
        ];
        assert!(reg.register_all(pairs).is_err());
        assert!(reg.contains(&triggers()).unwrap());
        assert!(!reg.contains(&brokers).unwrap());
    }

    #[test]
    fn descriptors_are_sorted() {
        let reg = CapabilityRegistry::new();
        let brokers = ResourceDescriptor::new("eventing.knative.dev", "v1alpha1", "brokers");
        reg.register(triggers(), store_factory(&triggers())).unwrap();
        reg.register(brokers.clone(), store_factory(&brokers)).unwrap();
        assert_eq!(reg.descriptors().unwrap(), vec![brokers, triggers()]);
    }
}
