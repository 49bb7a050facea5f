//! Rutastic Core - Domain Types
//!
//! Data types shared by every Rutastic crate: identities, routes, queries,
//! votes, the error taxonomy and the async traits describing the remote
//! backend. The only behavior here is validation and the pure request-shaping
//! policy for related routes.

pub mod backend;
pub mod entities;
pub mod enums;
pub mod error;
pub mod filter;
pub mod identity;
pub mod similarity;

pub use backend::{IdentityProvider, KudoBackend, LeaderboardBackend, RouteBackend};
pub use entities::{AuthorStat, KudoEntry, KudoOverlay, RouteEdit, RouteSummary};
pub use enums::{KudoOrdering, Similarity, SkillLevel, VoteDirection};
pub use error::{BackendError, BackendResult, IdentityError, ValidationError};
pub use filter::{BoundRange, DistanceRange, DurationRange, RouteQuery, KEYWORD_SEPARATOR};
pub use identity::{Identity, RouteId, Timestamp};
pub use similarity::{compute_distance_delta, RelatedRoutesRequest, DISTANCE_DELTA_THRESHOLD};
