//! The routed event: type and source attributes around an opaque payload.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ValidationError;

use super::filter::ANY_FILTER;

/// The unit being routed: type and source attributes plus an opaque payload.
///
/// Immutable once built. The payload is never inspected and passes through
/// to deliverers unmodified.
#[derive(Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    id: Uuid,
    event_type: String,
    source: String,
    time: DateTime<Utc>,
    payload: Bytes,
}

#[allow(missing_docs)]
impl EventEnvelope {
    /// Builds an envelope with a fresh id and the current time.
    ///
    /// # Errors
    /// `InvalidEnvelope` if the type or source is empty; the empty string is
    /// the reserved filter wildcard and never a real attribute value.
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Result<Self, ValidationError> {
        let event_type = event_type.into();
        let source = source.into();
        if event_type == ANY_FILTER {
            return Err(ValidationError::InvalidEnvelope {
                reason: "event type cannot be empty".to_string(),
            });
        }
        if source == ANY_FILTER {
            return Err(ValidationError::InvalidEnvelope {
                reason: "event source cannot be empty".to_string(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            event_type,
            source,
            time: Utc::now(),
            payload: payload.into(),
        })
    }

    /// Replaces the generated id, e.g. with one carried by the ingress protocol.
    #[must_use]
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Replaces the generated timestamp.
    #[must_use]
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub const fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// The opaque payload. Cloning the returned `Bytes` is cheap.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }
}

impl fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEnvelope")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("source", &self.source)
            .field("time", &self.time)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}
