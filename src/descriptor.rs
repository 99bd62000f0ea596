//! Resource identity used as the registry lookup key.
//!
//! A [`ResourceDescriptor`] is the (group, version, resource) triple that names
//! a Kubernetes resource type, e.g. `triggers.v1alpha1.eventing.knative.dev`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// API group for broker, trigger and event type resources.
pub const EVENTING_GROUP: &str = "eventing.knative.dev";
/// API group for channel, sequence and choice resources.
pub const MESSAGING_GROUP: &str = "messaging.knative.dev";
/// API group for event source resources.
pub const SOURCES_GROUP: &str = "sources.eventing.knative.dev";

const MAX_GROUP_LEN: usize = 253;
const MAX_RESOURCE_LEN: usize = 63;

static SUBDOMAIN_RE: OnceLock<Regex> = OnceLock::new();
static LABEL_RE: OnceLock<Regex> = OnceLock::new();
static VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn subdomain_re() -> &'static Regex {
    SUBDOMAIN_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
            .expect("static subdomain regex")
    })
}

fn label_re() -> &'static Regex {
    LABEL_RE.get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("static label regex"))
}

fn version_re() -> &'static Regex {
    VERSION_RE.get_or_init(|| {
        Regex::new(r"^v[1-9][0-9]*((alpha|beta)[1-9][0-9]*)?$").expect("static version regex")
    })
}

/// Identity of a resource type: group, version and plural resource name.
///
/// Equality is structural over all three fields. The core API group is the
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    group: String,
    version: String,
    resource: String,
}

impl ResourceDescriptor {
    /// Creates a descriptor without validating it.
    #[must_use]
    pub fn new(group: impl Into<String>, version: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// API group (empty for the core group).
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// API version, e.g. `v1alpha1`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Plural, lowercase resource name, e.g. `triggers`.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// `resource.group`, the version-independent part of the identity.
    #[must_use]
    pub fn group_resource(&self) -> String {
        if self.group.is_empty() {
            self.resource.clone()
        } else {
            format!("{}.{}", self.resource, self.group)
        }
    }

    /// Checks the fields against Kubernetes naming rules.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidDescriptor`] naming the offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidDescriptor {
            descriptor: self.to_string(),
            reason,
        };

        if !self.group.is_empty()
            && (self.group.len() > MAX_GROUP_LEN || !subdomain_re().is_match(&self.group))
        {
            return Err(invalid(format!("group '{}' is not a DNS-1123 subdomain", self.group)));
        }
        if !version_re().is_match(&self.version) {
            return Err(invalid(format!("version '{}' is not a valid API version", self.version)));
        }
        if self.resource.len() > MAX_RESOURCE_LEN || !label_re().is_match(&self.resource) {
            return Err(invalid(format!("resource '{}' is not a DNS-1123 label", self.resource)));
        }
        Ok(())
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}.{}", self.resource, self.version)
        } else {
            write!(f, "{}.{}.{}", self.resource, self.version, self.group)
        }
    }
}

/// Parses the `resource.version[.group]` form produced by `Display`.
impl FromStr for ResourceDescriptor {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '.');
        let resource = parts.next().unwrap_or_default();
        let Some(version) = parts.next() else {
            return Err(ValidationError::InvalidDescriptor {
                descriptor: s.to_string(),
                reason: "expected resource.version[.group]".to_string(),
            });
        };
        let group = parts.next().unwrap_or_default();

        let descriptor = Self::new(group, version, resource);
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// The resource kinds an eventing broker installation serves.
#[must_use]
pub fn eventing_descriptors() -> Vec<ResourceDescriptor> {
    const V1ALPHA1: &str = "v1alpha1";

    let eventing = [
        "brokers",
        "channels",
        "clusterchannelprovisioners",
        "eventtypes",
        "subscriptions",
        "triggers",
    ];
    let messaging = ["channels", "choices", "inmemorychannels", "sequences"];
    let sources = ["apiserversources", "containersources", "cronjobsources"];

    eventing
        .iter()
        .map(|r| ResourceDescriptor::new(EVENTING_GROUP, V1ALPHA1, *r))
        .chain(messaging.iter().map(|r| ResourceDescriptor::new(MESSAGING_GROUP, V1ALPHA1, *r)))
        .chain(sources.iter().map(|r| ResourceDescriptor::new(SOURCES_GROUP, V1ALPHA1, *r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn display_round_trips_through_from_str() {
        let d = ResourceDescriptor::new(EVENTING_GROUP, "v1alpha1", "triggers");
        assert_eq!(d.to_string(), "triggers.v1alpha1.eventing.knative.dev");
        assert_eq!(d.to_string().parse::<ResourceDescriptor>().unwrap(), d);

        let core = ResourceDescriptor::new("", "v1", "services");
        assert_eq!(core.to_string(), "services.v1");
        assert_eq!("services.v1".parse::<ResourceDescriptor>().unwrap(), core);
    }

    #[test]
    fn parse_rejects_missing_version() {
        let err = "triggers".parse::<ResourceDescriptor>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidDescriptor { .. }));
    }

    #[test]
    fn equality_is_structural() {
        let a = ResourceDescriptor::new(MESSAGING_GROUP, "v1alpha1", "channels");
        let b = ResourceDescriptor::new(EVENTING_GROUP, "v1alpha1", "channels");
        let c = ResourceDescriptor::new(MESSAGING_GROUP, "v1beta1", "channels");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, ResourceDescriptor::new(MESSAGING_GROUP, "v1alpha1", "channels"));
    }

    #[test]
    fn validate_checks_each_field() {
        assert!(ResourceDescriptor::new("", "v1", "pods").validate().is_ok());
        assert!(ResourceDescriptor::new(EVENTING_GROUP, "v2beta3", "brokers").validate().is_ok());

        assert!(ResourceDescriptor::new("Eventing", "v1", "brokers").validate().is_err());
        assert!(ResourceDescriptor::new(EVENTING_GROUP, "1", "brokers").validate().is_err());
        assert!(ResourceDescriptor::new(EVENTING_GROUP, "v1gamma1", "brokers").validate().is_err());
        assert!(ResourceDescriptor::new(EVENTING_GROUP, "v1", "Brokers").validate().is_err());
        assert!(ResourceDescriptor::new(EVENTING_GROUP, "v1", "").validate().is_err());
    }

    #[test]
    fn group_resource_omits_version() {
        let d = ResourceDescriptor::new(SOURCES_GROUP, "v1alpha1", "cronjobsources");
        assert_eq!(d.group_resource(), "cronjobsources.sources.eventing.knative.dev");
        assert_eq!(ResourceDescriptor::new("", "v1", "pods").group_resource(), "pods");
    }

    #[test]
    fn eventing_descriptors_are_valid_and_unique() {
        let all = eventing_descriptors();
        assert_eq!(all.len(), 13);
        for d in &all {
            d.validate().unwrap();
        }
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }
}
