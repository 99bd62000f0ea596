//! Label sets attached to resources owned by an event source.
//!
//! These are pure functions of the varying parameter; pair them with
//! [`LabelSelector::from_labels`](crate::capability::LabelSelector::from_labels)
//! to find the resources again through a lister.

use std::collections::BTreeMap;

use crate::descriptor::SOURCES_GROUP;

/// Prefix of the per-kind ownership label.
pub const SOURCE_LABEL_PREFIX: &str = SOURCES_GROUP;

/// Legacy label naming the controller that created a resource.
pub const LEGACY_SOURCE_LABEL: &str = "knative-eventing-source";
/// Legacy label naming the owning source object.
pub const LEGACY_SOURCE_NAME_LABEL: &str = "knative-eventing-source-name";

/// Labels attached to every resource created for the source `name` of kind
/// `kind`, e.g. `sources.eventing.knative.dev/cronJobSource: nightly`.
#[must_use]
pub fn source_labels(kind: &str, name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(format!("{SOURCE_LABEL_PREFIX}/{kind}"), name.to_string());
    labels
}

/// Labels used by controllers before the per-kind label existed.
#[must_use]
pub fn legacy_source_labels(controller_agent: &str, name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(LEGACY_SOURCE_LABEL.to_string(), controller_agent.to_string());
    labels.insert(LEGACY_SOURCE_NAME_LABEL.to_string(), name.to_string());
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_labels_key_on_kind() {
        let labels = source_labels("cronJobSource", "nightly");
        assert_eq!(labels.len(), 1);
        assert_eq!(
            labels.get("sources.eventing.knative.dev/cronJobSource").map(String::as_str),
            Some("nightly")
        );
    }

    #[test]
    fn legacy_labels_name_controller_and_source() {
        let labels = legacy_source_labels("cronjob-source-controller", "nightly");
        assert_eq!(labels[LEGACY_SOURCE_LABEL], "cronjob-source-controller");
        assert_eq!(labels[LEGACY_SOURCE_NAME_LABEL], "nightly");
    }

    #[test]
    fn prefix_is_the_sources_api_group() {
        assert_eq!(SOURCE_LABEL_PREFIX, crate::descriptor::SOURCES_GROUP);
        assert!(source_labels("containerSource", "x")
            .keys()
            .all(|k| k.starts_with("sources.eventing.knative.dev/")));
    }

    #[test]
    fn calls_are_independent() {
        let mut a = source_labels("cronJobSource", "a");
        a.insert("extra".to_string(), "x".to_string());
        assert_eq!(source_labels("cronJobSource", "a").len(), 1);
    }
}
