//! Filter predicates over event attributes.
//!
//! A predicate is a pair of matchers, one for the event type and one for the
//! event source. Each side is either the wildcard or an exact string, and a
//! predicate matches iff both sides match.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::envelope::EventEnvelope;

/// Reserved filter value meaning "any". Never a legal literal type or source.
pub const ANY_FILTER: &str = "";

/// One side of a [`FilterPredicate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    /// Matches every value.
    Any,
    /// Matches exactly this value.
    Exact(String),
}

impl Matcher {
    /// Converts an already-normalized filter value, mapping [`ANY_FILTER`] to `Any`.
    #[must_use]
    pub fn from_filter_value(value: &str) -> Self {
        if value == ANY_FILTER {
            Self::Any
        } else {
            Self::Exact(value.to_string())
        }
    }

    /// An exact matcher.
    ///
    /// # Errors
    /// [`ValidationError::ReservedWildcard`] if `value` is the wildcard sentinel.
    pub fn exact(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value == ANY_FILTER {
            return Err(ValidationError::ReservedWildcard);
        }
        Ok(Self::Exact(value))
    }

    /// Returns true if this matcher accepts `value`.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == value,
        }
    }

    /// The exact value, or `None` for the wildcard.
    #[must_use]
    pub fn as_exact(&self) -> Option<&str> {
        match self {
            Self::Any => None,
            Self::Exact(v) => Some(v),
        }
    }

    /// Returns true for the wildcard.
    #[must_use]
    pub const fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(v) => f.write_str(v),
        }
    }
}

/// A (type, source) filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Matcher for the event type.
    pub event_type: Matcher,
    /// Matcher for the event source.
    pub source: Matcher,
}

impl FilterPredicate {
    /// Pairs a type matcher with a source matcher.
    #[must_use]
    pub const fn new(event_type: Matcher, source: Matcher) -> Self {
        Self { event_type, source }
    }

    /// Matches every event.
    #[must_use]
    pub const fn any() -> Self {
        Self::new(Matcher::Any, Matcher::Any)
    }

    /// Builds a predicate from normalized filter values, where [`ANY_FILTER`]
    /// on either side means "any".
    #[must_use]
    pub fn from_filter_values(event_type: &str, source: &str) -> Self {
        Self::new(Matcher::from_filter_value(event_type), Matcher::from_filter_value(source))
    }

    /// Returns true if both sides accept the envelope's attributes.
    #[must_use]
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        self.matches_attributes(envelope.event_type(), envelope.source())
    }

    /// Returns true if both sides accept the given type and source.
    #[must_use]
    pub fn matches_attributes(&self, event_type: &str, source: &str) -> bool {
        self.event_type.matches(event_type) && self.source.matches(source)
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type={} source={}", self.event_type, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(v: &str) -> Matcher {
        Matcher::exact(v).unwrap()
    }

    #[test]
    fn wildcard_sentinel_maps_to_any() {
        assert_eq!(Matcher::from_filter_value(ANY_FILTER), Matcher::Any);
        assert_eq!(Matcher::from_filter_value("type1"), exact("type1"));
        assert_eq!(Matcher::exact(ANY_FILTER), Err(ValidationError::ReservedWildcard));
    }

    #[test]
    fn single_sided_wildcards() {
        let (t, s) = ("dev.knative.type1", "/source1");

        assert!(FilterPredicate::new(exact(t), Matcher::Any).matches_attributes(t, s));
        assert!(FilterPredicate::new(Matcher::Any, exact(s)).matches_attributes(t, s));
        assert!(FilterPredicate::new(exact(t), exact(s)).matches_attributes(t, s));
        assert!(!FilterPredicate::new(exact("other"), exact(s)).matches_attributes(t, s));
        assert!(!FilterPredicate::new(exact(t), exact("other")).matches_attributes(t, s));
    }

    #[test]
    fn any_any_matches_everything() {
        let p = FilterPredicate::any();
        assert!(p.matches_attributes("a", "b"));
        assert!(p.matches_attributes("x", "y"));
    }

    #[test]
    fn exact_match_is_case_sensitive() {
        let p = FilterPredicate::from_filter_values("Type1", ANY_FILTER);
        assert!(!p.matches_attributes("type1", "s"));
    }

    #[test]
    fn predicate_serializes_matchers() {
        let p = FilterPredicate::from_filter_values("type1", ANY_FILTER);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["event_type"]["exact"], "type1");
        assert_eq!(json["source"], "any");
        assert_eq!(p.to_string(), "type=type1 source=*");
    }
}
