//! Identity types for Rutastic entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Backend-assigned route identifier. Valid identifiers are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(i64);

impl RouteId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Whether the backend could ever have issued this id.
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RouteId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// The signed-in user as seen by the client.
///
/// At most one identity is live per process; the slot that holds it belongs
/// to the identity broadcaster in the client crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Two identities denote the same session owner when their usernames match.
    pub fn same_user(&self, other: &Identity) -> bool {
        self.username == other.username
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_id_validity() {
        assert!(RouteId::new(1).is_valid());
        assert!(!RouteId::new(0).is_valid());
        assert!(!RouteId::new(-4).is_valid());
    }

    #[test]
    fn test_route_id_serializes_as_number() {
        let json = serde_json::to_string(&RouteId::new(42)).expect("serialize");
        assert_eq!(json, "42");
    }

    #[test]
    fn test_same_user_ignores_attributes() {
        let a = Identity::new("ana").with_email("ana@example.com");
        let b = Identity::new("ana");
        assert!(a.same_user(&b));
        assert_ne!(a, b);
    }
}
