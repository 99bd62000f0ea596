//! Resource objects, watch notifications and label selectors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A resource instance as seen through a [`Lister`](super::Lister) or
/// [`Watcher`](super::Watcher).
///
/// The body is kept as opaque JSON; typed decoding is the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceObject {
    /// Namespace, or `None` for cluster-scoped resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Object name, unique within its namespace.
    pub name: String,
    /// Object labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Object body.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ResourceObject {
    /// Creates a namespaced object with no labels and a null body.
    #[must_use]
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
            labels: BTreeMap::new(),
            data: serde_json::Value::Null,
        }
    }

    /// Creates a cluster-scoped object with no labels and a null body.
    #[must_use]
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            labels: BTreeMap::new(),
            data: serde_json::Value::Null,
        }
    }

    /// Replaces the label set.
    #[must_use]
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// `namespace/name`, or just `name` when cluster-scoped.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A change notification delivered by a watch.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "object", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchEvent {
    Added(ResourceObject),
    Modified(ResourceObject),
    Deleted(ResourceObject),
}

impl WatchEvent {
    /// The object carried by the event.
    #[must_use]
    pub const fn object(&self) -> &ResourceObject {
        match self {
            Self::Added(o) | Self::Modified(o) | Self::Deleted(o) => o,
        }
    }
}

/// Equality-based label selector. The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSelector {
    requirements: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Selector matching every object.
    #[must_use]
    pub fn everything() -> Self {
        Self::default()
    }

    /// Selector requiring every given key/value pair.
    #[must_use]
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        Self {
            requirements: labels.clone(),
        }
    }

    /// Adds a `key=value` requirement.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.insert(key.into(), value.into());
        self
    }

    /// Returns true if the selector has no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Returns true if `labels` satisfies every requirement.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn empty_selector_matches_everything() {
        let sel = LabelSelector::everything();
        assert!(sel.matches(&BTreeMap::new()));
        assert!(sel.matches(&labels(&[("a", "b")])));
    }

    #[test]
    fn selector_requires_all_pairs() {
        let sel = LabelSelector::everything().with("app", "dumper").with("tier", "test");
        assert!(sel.matches(&labels(&[("app", "dumper"), ("tier", "test"), ("x", "y")])));
        assert!(!sel.matches(&labels(&[("app", "dumper")])));
        assert!(!sel.matches(&labels(&[("app", "sender"), ("tier", "test")])));
    }

    #[test]
    fn object_key_includes_namespace() {
        assert_eq!(ResourceObject::namespaced("default", "b").key(), "default/b");
        assert_eq!(ResourceObject::cluster_scoped("ccp").key(), "ccp");
    }

    #[test]
    fn watch_event_serializes_with_type_tag() {
        let ev = WatchEvent::Deleted(ResourceObject::namespaced("ns", "t1"));
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "DELETED");
        assert_eq!(json["object"]["name"], "t1");
    }
}
