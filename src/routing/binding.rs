//! Subscribers and the bindings that attach them to filters.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

use super::filter::FilterPredicate;

/// Unique identifier for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(Uuid);

impl BindingId {
    /// Create a new random binding id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID, e.g. the UID of the trigger object.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A delivery target. Opaque to routing: only the deliverer interprets the address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscriber {
    name: String,
    address: String,
}

impl Subscriber {
    /// Creates a subscriber.
    ///
    /// # Errors
    /// `EmptySubscriberName` if `name` is empty or whitespace.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptySubscriberName);
        }
        Ok(Self {
            name,
            address: address.into(),
        })
    }

    /// Subscriber name, used in logs and reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivery address, e.g. a service URL.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// A live association of a predicate to a subscriber, owned by the routing table.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub id: BindingId,
    pub predicate: FilterPredicate,
    pub subscriber: Subscriber,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_requires_name() {
        assert_eq!(Subscriber::new("", "http://x"), Err(ValidationError::EmptySubscriberName));
        assert_eq!(Subscriber::new("  ", "http://x"), Err(ValidationError::EmptySubscriberName));

        let s = Subscriber::new("dumper-type1-any", "http://dumper.default.svc").unwrap();
        assert_eq!(s.name(), "dumper-type1-any");
        assert_eq!(s.to_string(), "dumper-type1-any (http://dumper.default.svc)");
    }

    #[test]
    fn binding_ids_round_trip_uuid() {
        let uuid = Uuid::new_v4();
        let id = BindingId::from_uuid(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
        assert_ne!(BindingId::new(), BindingId::new());
    }
}
