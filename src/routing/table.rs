//! Routing table: the live binding set and the matching engine.
//!
//! Readers load an immutable snapshot through `ArcSwap`, so `match_all` never
//! observes a half-applied mutation and never takes a lock. Writers serialize
//! on a mutex, copy the snapshot, apply the change and swap the new snapshot in.
//!
//! Lookups go through secondary indices keyed by exact type and exact source.
//! Wildcard sides live in separate buckets that every lookup includes. A
//! lookup walks the smaller of the two candidate sets, checks each candidate
//! against its full predicate and returns hits in binding insertion order,
//! which is exactly what [`RoutingTable::match_all_scan`] produces.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tracing::debug;

use crate::error::{BindingError, BrokerResult};

use super::binding::{Binding, BindingId, Subscriber};
use super::envelope::EventEnvelope;
use super::filter::{FilterPredicate, Matcher};

/// Index over one attribute: exact values plus the wildcard bucket.
#[derive(Debug, Clone, Default)]
struct AttributeIndex {
    exact: HashMap<String, BTreeSet<u64>>,
    any: BTreeSet<u64>,
}

impl AttributeIndex {
    fn insert(&mut self, matcher: &Matcher, seq: u64) {
        match matcher {
            Matcher::Any => {
                self.any.insert(seq);
            }
            Matcher::Exact(v) => {
                self.exact.entry(v.clone()).or_default().insert(seq);
            }
        }
    }

    fn remove(&mut self, matcher: &Matcher, seq: u64) {
        match matcher {
            Matcher::Any => {
                self.any.remove(&seq);
            }
            Matcher::Exact(v) => {
                if let Some(set) = self.exact.get_mut(v) {
                    set.remove(&seq);
                    if set.is_empty() {
                        self.exact.remove(v);
                    }
                }
            }
        }
    }

    fn candidate_count(&self, value: &str) -> usize {
        self.exact.get(value).map_or(0, BTreeSet::len) + self.any.len()
    }

    /// Sequence numbers of every binding whose matcher on this side accepts
    /// `value`, ascending.
    fn candidates(&self, value: &str) -> Vec<u64> {
        let mut seqs: Vec<u64> = self
            .exact
            .get(value)
            .into_iter()
            .flatten()
            .chain(self.any.iter())
            .copied()
            .collect();
        seqs.sort_unstable();
        seqs
    }
}

#[derive(Debug, Clone, Default)]
struct TableState {
    next_seq: u64,
    bindings: BTreeMap<u64, Arc<Binding>>,
    seq_by_id: HashMap<BindingId, u64>,
    by_type: AttributeIndex,
    by_source: AttributeIndex,
}

impl TableState {
    fn insert(&mut self, binding: Binding) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.by_type.insert(&binding.predicate.event_type, seq);
        self.by_source.insert(&binding.predicate.source, seq);
        self.seq_by_id.insert(binding.id, seq);
        self.bindings.insert(seq, Arc::new(binding));
    }

    fn remove(&mut self, id: BindingId) -> Option<Arc<Binding>> {
        let seq = self.seq_by_id.remove(&id)?;
        let binding = self.bindings.remove(&seq)?;
        self.by_type.remove(&binding.predicate.event_type, seq);
        self.by_source.remove(&binding.predicate.source, seq);
        Some(binding)
    }

    fn matching(&self, event_type: &str, source: &str) -> Vec<Arc<Binding>> {
        let candidates = if self.by_type.candidate_count(event_type) <= self.by_source.candidate_count(source) {
            self.by_type.candidates(event_type)
        } else {
            self.by_source.candidates(source)
        };

        candidates
            .into_iter()
            .filter_map(|seq| self.bindings.get(&seq))
            .filter(|b| b.predicate.matches_attributes(event_type, source))
            .cloned()
            .collect()
    }

    fn scan(&self, event_type: &str, source: &str) -> Vec<Arc<Binding>> {
        self.bindings
            .values()
            .filter(|b| b.predicate.matches_attributes(event_type, source))
            .cloned()
            .collect()
    }
}

/// The set of live bindings and the event matching engine.
pub struct RoutingTable {
    state: ArcSwap<TableState>,
    writer: Mutex<()>,
}

impl RoutingTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(TableState::default()),
            writer: Mutex::new(()),
        }
    }

    /// Adds a binding and returns its id. Identical predicates are allowed;
    /// each binding is matched and delivered independently.
    pub fn bind(&self, predicate: FilterPredicate, subscriber: Subscriber) -> BindingId {
        let id = BindingId::new();
        debug!(binding_id = %id, filter = %predicate, subscriber = subscriber.name(), "bind");

        self.update(|state| {
            state.insert(Binding {
                id,
                predicate,
                subscriber,
            });
        });
        id
    }

    /// Adds every `(predicate, subscriber)` pair under a single snapshot swap,
    /// in iteration order. Readers see either none or all of them.
    pub fn bind_all<I>(&self, pairs: I) -> Vec<BindingId>
    where
        I: IntoIterator<Item = (FilterPredicate, Subscriber)>,
    {
        let ids = self.update(|state| {
            pairs
                .into_iter()
                .map(|(predicate, subscriber)| {
                    let id = BindingId::new();
                    state.insert(Binding {
                        id,
                        predicate,
                        subscriber,
                    });
                    id
                })
                .collect::<Vec<_>>()
        });
        debug!(bindings = ids.len(), "bind_all");
        ids
    }

    /// Removes exactly the binding `id` and returns it.
    ///
    /// # Errors
    /// `BindingError::NotFound` if no live binding has this id.
    pub fn unbind(&self, id: BindingId) -> BrokerResult<Binding> {
        let removed = self.update(|state| state.remove(id));
        match removed {
            Some(binding) => {
                debug!(binding_id = %id, subscriber = binding.subscriber.name(), "unbind");
                Ok(Arc::unwrap_or_clone(binding))
            }
            None => Err(BindingError::NotFound { id }.into()),
        }
    }

    /// Subscribers of every binding matching `envelope`, in insertion order.
    ///
    /// A subscriber bound several times appears once per matching binding.
    #[must_use]
    pub fn match_all(&self, envelope: &EventEnvelope) -> Vec<Subscriber> {
        self.match_bindings(envelope)
            .into_iter()
            .map(|b| b.subscriber.clone())
            .collect()
    }

    /// Every binding matching `envelope`, in insertion order.
    #[must_use]
    pub fn match_bindings(&self, envelope: &EventEnvelope) -> Vec<Arc<Binding>> {
        self.state.load().matching(envelope.event_type(), envelope.source())
    }

    /// Reference matcher: checks every binding without the indices.
    /// Always returns the same list as [`match_all`](Self::match_all).
    #[must_use]
    pub fn match_all_scan(&self, envelope: &EventEnvelope) -> Vec<Subscriber> {
        self.state
            .load()
            .scan(envelope.event_type(), envelope.source())
            .into_iter()
            .map(|b| b.subscriber.clone())
            .collect()
    }

    /// Looks up a live binding.
    #[must_use]
    pub fn get(&self, id: BindingId) -> Option<Arc<Binding>> {
        let state = self.state.load();
        let seq = state.seq_by_id.get(&id)?;
        state.bindings.get(seq).cloned()
    }

    /// All live bindings, in insertion order.
    #[must_use]
    pub fn bindings(&self) -> Vec<Arc<Binding>> {
        self.state.load().bindings.values().cloned().collect()
    }

    /// Number of live bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.load().bindings.len()
    }

    /// Returns true if there are no live bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update<R>(&self, f: impl FnOnce(&mut TableState) -> R) -> R {
        // The guard protects no data, so a poisoned lock is still usable.
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = TableState::clone(&self.state.load());
        let out = f(&mut next);
        self.state.store(Arc::new(next));
        out
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTable")
            .field("bindings", &self.len())
            .finish()
    }
}
