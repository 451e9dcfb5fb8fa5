//! # Registry
//!
//! A channel-keyed subscriber registry. Each channel maps to an ordered list of
//! callbacks; registration order is delivery order and the same callback may be
//! registered more than once. `subscribe` hands back a [`Subscription`] whose
//! `unsubscribe` removes exactly that registration.
//!
//! Dispatch takes a snapshot of the channel's callbacks and releases the lock
//! before calling them, so a callback may subscribe or unsubscribe freely. Each
//! registration carries its own liveness flag which is checked right before the
//! call: unsubscribing a sibling in the middle of a dispatch stops that sibling
//! from being called for the rest of it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A shared, thread-safe callback as stored by the registry.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Entry<T> {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Callback<T>,
}

struct Shared<K, T> {
    channels: Mutex<HashMap<K, Vec<Entry<T>>>>,
    next_id: AtomicU64,
}

impl<K, T> Shared<K, T> {
    fn lock(&self) -> MutexGuard<'_, HashMap<K, Vec<Entry<T>>>> {
        // A panicking listener never runs under this lock, so the map is still consistent.
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Channel name -> ordered callbacks.
pub struct Registry<K, T> {
    shared: Arc<Shared<K, T>>,
}

impl<K, T> Clone for Registry<K, T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, T> Default for Registry<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> Registry<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: 'static,
{
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                channels: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers `callback` at the end of `channel`'s list.
    pub fn subscribe<F>(&self, channel: K, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));

        self.shared
            .lock()
            .entry(channel.clone())
            .or_default()
            .push(Entry {
                id,
                active: Arc::clone(&active),
                callback: Arc::new(callback),
            });

        let weak: Weak<Shared<K, T>> = Arc::downgrade(&self.shared);
        Subscription::new(active, move || {
            if let Some(shared) = weak.upgrade() {
                let mut channels = shared.lock();
                if let Some(entries) = channels.get_mut(&channel) {
                    entries.retain(|e| e.id != id);
                    if entries.is_empty() {
                        channels.remove(&channel);
                    }
                }
            }
        })
    }

    /// Calls every live callback registered for `channel`, in registration order.
    ///
    /// Returns the number of callbacks that were invoked.
    pub fn dispatch(&self, channel: &K, message: &T) -> usize {
        let snapshot: Vec<(Arc<AtomicBool>, Callback<T>)> = {
            let channels = self.shared.lock();
            match channels.get(channel) {
                Some(entries) => entries
                    .iter()
                    .map(|e| (Arc::clone(&e.active), Arc::clone(&e.callback)))
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (active, callback) in snapshot {
            if active.load(Ordering::Acquire) {
                (*callback)(message);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn listener_count(&self, channel: &K) -> usize {
        self.shared.lock().get(channel).map_or(0, Vec::len)
    }

    /// Drops every registration. Outstanding [`Subscription`]s become inert.
    pub fn clear(&self) {
        let mut channels = self.shared.lock();
        for entry in channels.values().flatten() {
            entry.active.store(false, Ordering::Release);
        }
        channels.clear();
    }
}

/// Disposer returned by [`Registry::subscribe`].
///
/// Dropping a `Subscription` does *not* unsubscribe; call
/// [`Subscription::unsubscribe`] to stop deliveries.
#[must_use = "keep the subscription to be able to unsubscribe later"]
pub struct Subscription {
    active: Arc<AtomicBool>,
    remover: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new<F>(active: Arc<AtomicBool>, remover: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            active,
            remover: Mutex::new(Some(Box::new(remover))),
        }
    }

    /// Removes this registration. Safe to call more than once.
    pub fn unsubscribe(&self) {
        self.active.store(false, Ordering::Release);
        let remover = self
            .remover
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(remove) = remover {
            remove();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A bag of subscriptions released together, e.g. when a view detaches.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn unsubscribe_all(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
    }
}

impl Extend<Subscription> for SubscriptionSet {
    fn extend<I: IntoIterator<Item = Subscription>>(&mut self, iter: I) {
        self.subscriptions.extend(iter);
    }
}

impl IntoIterator for SubscriptionSet {
    type Item = Subscription;
    type IntoIter = std::vec::IntoIter<Subscription>;

    fn into_iter(self) -> Self::IntoIter {
        self.subscriptions.into_iter()
    }
}
