//! Request tokens for ordering overlapping fetches.
//!
//! Every fetch that may race with a later fetch of the same cache slot takes
//! a token first. Tokens are monotonically increasing; a slot remembers the
//! token of the response it currently holds and uses it to decide whether a
//! late response is allowed to replace it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// What to do with a response that completes after a newer one was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleResponsePolicy {
    /// Drop responses older than the one already applied.
    #[default]
    DiscardSuperseded,
    /// Whatever lands last wins, regardless of when it was requested.
    LastWriteWins,
}

/// Position of a request in issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestToken(u64);

impl RequestToken {
    /// Token held by a slot that was never filled.
    pub const fn zero() -> Self {
        Self(0)
    }

    pub fn sequence(&self) -> u64 {
        self.0
    }

    pub fn is_newer_than(&self, other: &RequestToken) -> bool {
        self.0 > other.0
    }
}

/// Issues tokens for one family of requests.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    last_issued: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestToken {
        RequestToken(self.last_issued.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn last_issued(&self) -> RequestToken {
        RequestToken(self.last_issued.load(Ordering::Acquire))
    }
}

/// A cached value together with the token of the response that produced it.
#[derive(Debug, Clone, Default)]
pub struct Sequenced<T> {
    value: T,
    applied: RequestToken,
}

impl<T> Sequenced<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            applied: RequestToken::zero(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn applied(&self) -> RequestToken {
        self.applied
    }

    /// Store `value` if `policy` admits a response carrying `token`.
    /// Returns whether the value was stored.
    pub fn apply(&mut self, token: RequestToken, value: T, policy: StaleResponsePolicy) -> bool {
        let admitted = match policy {
            StaleResponsePolicy::LastWriteWins => true,
            StaleResponsePolicy::DiscardSuperseded => !self.applied.is_newer_than(&token),
        };
        if admitted {
            self.value = value;
            self.applied = self.applied.max(token);
        }
        admitted
    }

    /// Unconditionally reset the value, keeping the token so that responses
    /// requested before the reset cannot bring old data back.
    pub fn reset(&mut self, value: T, token: RequestToken) {
        self.value = value;
        self.applied = self.applied.max(token);
    }
}
