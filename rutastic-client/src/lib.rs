//! Rutastic client library exports.
//!
//! Keeps per-session view state (filtered routes, leaderboards, the signed-in
//! user's vote overlay, the identity itself) consistent with the backend.
//! Writes never patch cached state; they trigger a re-read.

pub mod api_client;
pub mod config;
pub mod detail;
pub mod editor;
pub mod error;
pub mod identity;
pub mod notifications;
pub mod overlay;
pub mod persistence;
pub mod sequencer;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod vote;

pub use config::ClientConfig;
pub use detail::{RouteDetail, RouteDetailLoader};
pub use editor::RouteEditor;
pub use error::{ClientError, ClientResult};
pub use identity::{IdentityBroadcaster, SubscriptionHandle};
pub use notifications::{Notification, NotificationCenter, NotificationLevel};
pub use overlay::KudoOverlayResolver;
pub use session::SessionController;
pub use store::{Leaderboard, LeaderboardCache, QueryStateStore, StaleResponsePolicy};
pub use vote::{KudoRatingConsistencyProtocol, VoteOrigin, VoteReceipt, VoteRequest, VoteState};
