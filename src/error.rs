//! Error types for kroute.
//!
//! Structural errors (bad descriptor, unknown binding) are returned
//! synchronously and are fatal to that single call. Delivery errors are
//! never returned from routing; they travel as data inside a
//! [`RouteReport`](crate::routing::RouteReport).

use thiserror::Error;

use crate::descriptor::ResourceDescriptor;
use crate::routing::BindingId;

/// Validation errors raised while constructing routing or registry inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid resource descriptor '{descriptor}': {reason}")]
    InvalidDescriptor {
        descriptor: String,
        reason: String,
    },

    #[error("The reserved wildcard filter value cannot be used as an exact match")]
    ReservedWildcard,

    #[error("Subscriber name cannot be empty")]
    EmptySubscriberName,

    #[error("Invalid event envelope: {reason}")]
    InvalidEnvelope {
        reason: String,
    },
}

/// Errors from the capability registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Resource {descriptor} is already registered")]
    DuplicateRegistration {
        descriptor: ResourceDescriptor,
    },

    #[error("No capability registered for {descriptor}")]
    NotFound {
        descriptor: ResourceDescriptor,
    },
}

/// Errors from routing table mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("Binding not found: {id}")]
    NotFound {
        id: BindingId,
    },
}

/// Execution errors from watch and list capabilities.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
    },
}

/// Per-subscriber delivery failure, reported inside a route outcome.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Delivery rejected: {reason}")]
    Rejected {
        reason: String,
    },

    #[error("Delivery timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Deliverer panicked: {message}")]
    Panicked {
        message: String,
    },

    #[error("Failed to start delivery: {message}")]
    Spawn {
        message: String,
    },
}

impl DeliveryError {
    /// Creates a rejection with the given reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Returns true if the deadline elapsed before the deliverer returned.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Top-level error type for kroute.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl BrokerError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a registry error.
    #[must_use]
    pub const fn is_registry(&self) -> bool {
        matches!(self, Self::Registry(_))
    }

    /// Returns true if this is a binding error.
    #[must_use]
    pub const fn is_binding(&self) -> bool {
        matches!(self, Self::Binding(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if either lookup failed with `NotFound`.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Registry(RegistryError::NotFound { .. }) | Self::Binding(BindingError::NotFound { .. })
        )
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Binding(_) | Self::Internal { .. } => false,
            // An unknown kind may be registered later by a bootstrap collaborator.
            Self::Registry(e) => matches!(e, RegistryError::NotFound { .. }),
            Self::Execution(e) => matches!(e, ExecutionError::Timeout { .. }),
        }
    }
}

/// Result type alias for kroute operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

pub(crate) fn lock_err(context: &'static str) -> BrokerError {
    BrokerError::Execution(ExecutionError::Storage {
        message: format!("poisoned lock: {context}"),
    })
}
