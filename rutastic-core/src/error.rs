//! Error types for Rutastic operations

use crate::identity::RouteId;
use thiserror::Error;

/// Failures talking to the remote backend. Always recoverable: the cache
/// segment that was being refreshed simply stays stale.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    #[error("Backend responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Could not decode backend response: {reason}")]
    Decode { reason: String },

    #[error("Route not found: {route_id}")]
    RouteNotFound { route_id: RouteId },

    #[error("Operation requires a signed-in identity")]
    Unauthenticated,
}

impl BackendError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}

/// Arguments rejected before any network call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Vote direction must be +1 or -1, got {value}")]
    InvalidVoteDirection { value: i8 },

    #[error("Invalid range for {field}: min {min} is greater than max {max}")]
    InvertedRange { field: String, min: u32, max: u32 },

    #[error("Invalid route id: {route_id}")]
    InvalidRouteId { route_id: RouteId },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Identity slot contract violations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Identity changed from inside an identity observer")]
    ReentrantUpdate,
}

/// Result type for calls that cross the backend boundary.
pub type BackendResult<T> = Result<T, BackendError>;

// =============================================================================
// TESTS
// =============================================================================
