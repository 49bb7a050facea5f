//! Identity slot with change notification.
//!
//! Holds "current identity or none" for the whole client. Components that
//! need identity awareness get the broadcaster by `Arc` and either read it on
//! demand or register an observer. Observers are plain callbacks without
//! arguments; they read the new value through [`IdentityBroadcaster::current_identity`].

use rutastic_core::{Identity, IdentityError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use tracing::debug;

/// Callback invoked after every identity change.
pub type IdentityObserver = Arc<dyn Fn() + Send + Sync>;

/// Registration returned by [`IdentityBroadcaster::subscribe`].
///
/// Dropping the handle does not unregister the observer; pass it to
/// [`IdentityBroadcaster::unsubscribe`] for teardown.
#[must_use = "keep the handle to be able to unsubscribe"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

pub struct IdentityBroadcaster {
    slot: RwLock<Option<Identity>>,
    observers: Mutex<Vec<(SubscriptionHandle, IdentityObserver)>>,
    next_id: AtomicU64,
    /// Held for the whole of one update, notification included.
    update: Mutex<()>,
    /// Thread currently running an update, if any.
    notifier: Mutex<Option<ThreadId>>,
}

impl IdentityBroadcaster {
    pub fn new() -> Self {
        Self::with_identity(None)
    }

    /// Seed the slot, typically from a restored session. No observer exists
    /// yet so nobody is notified.
    pub fn with_identity(identity: Option<Identity>) -> Self {
        Self {
            slot: RwLock::new(identity),
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            update: Mutex::new(()),
            notifier: Mutex::new(None),
        }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the slot and notify every observer, in registration order,
    /// before returning.
    ///
    /// Updates from different threads are serialized: a second caller waits
    /// until the first one has notified everybody. Changing the identity from
    /// inside an observer is rejected.
    pub fn set_identity(&self, identity: Option<Identity>) -> Result<(), IdentityError> {
        let me = thread::current().id();
        if *self.notifier.lock().unwrap_or_else(PoisonError::into_inner) == Some(me) {
            return Err(IdentityError::ReentrantUpdate);
        }
        let _update = self.update.lock().unwrap_or_else(PoisonError::into_inner);
        *self.notifier.lock().unwrap_or_else(PoisonError::into_inner) = Some(me);
        let _notifier = NotifierGuard(&self.notifier);

        debug!(
            username = identity.as_ref().map(|i| i.username.as_str()),
            "Identity changed"
        );
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = identity;

        // Snapshot so observers may read the slot or subscribe without
        // deadlocking on the registry.
        let observers: Vec<IdentityObserver> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer();
        }
        Ok(())
    }

    /// Register an observer. Registering the same callback twice makes it
    /// fire twice per change.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = SubscriptionHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((handle, Arc::new(observer)));
        handle
    }

    /// Remove one registration. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != handle);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for IdentityBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdentityBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityBroadcaster")
            .field("identity", &self.current_identity())
            .field("observers", &self.observer_count())
            .finish()
    }
}

struct NotifierGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for NotifierGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
