//! # Envelope Dispatcher
//!
//! Sits between the transport and the subscribers. Each text frame is decoded
//! into an envelope and handed to every listener registered under the
//! envelope's channel, in registration order. Frames arrive one at a time from
//! the feed task, so delivery order equals arrival order.
//!
//! Frames that cannot be used are counted and logged, never propagated:
//! - unknown `type` tags are ignored,
//! - malformed frames or payloads are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::registry::{Registry, Subscription};
use crate::feed::envelope::{decode_envelope, Channel, Decoded, FeedMessage};

/// What happened to a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Routed to `Channel`; the count is the number of listeners called.
    Delivered(Channel, usize),
    /// Well-formed envelope with an unrecognised tag.
    Ignored(String),
    /// Not an envelope, or a payload that does not fit its tag.
    Dropped,
}

/// Running totals, mostly for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub routed: u64,
    pub ignored: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    routed: AtomicU64,
    ignored: AtomicU64,
    dropped: AtomicU64,
}

/// Routes decoded envelopes to channel listeners.
#[derive(Clone, Default)]
pub struct Dispatcher {
    listeners: Registry<Channel, FeedMessage>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `channel`. The returned subscription removes exactly this callback.
    pub fn add_listener<F>(&self, channel: Channel, callback: F) -> Subscription
    where
        F: Fn(&FeedMessage) + Send + Sync + 'static,
    {
        let subscription = self.listeners.subscribe(channel, callback);
        log::debug!(
            "Listener added on '{}' ({} total)",
            channel,
            self.listeners.listener_count(&channel)
        );
        subscription
    }

    pub fn listener_count(&self, channel: Channel) -> usize {
        self.listeners.listener_count(&channel)
    }

    /// Decodes one text frame and delivers it.
    pub fn route_text(&self, text: &str) -> RouteOutcome {
        match decode_envelope(text) {
            Ok(Decoded::Message(message)) => {
                let channel = message.channel();
                let delivered = self.route(&message);
                RouteOutcome::Delivered(channel, delivered)
            }
            Ok(Decoded::Unknown(tag)) => {
                self.counters.ignored.fetch_add(1, Ordering::Relaxed);
                log::debug!("Ignoring live feed message with unknown type '{}'", tag);
                RouteOutcome::Ignored(tag)
            }
            Err(e) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("Dropping live feed frame: {}", e);
                RouteOutcome::Dropped
            }
        }
    }

    /// Delivers an already decoded message. Returns the number of listeners called.
    pub fn route(&self, message: &FeedMessage) -> usize {
        self.counters.routed.fetch_add(1, Ordering::Relaxed);
        let channel = message.channel();
        let delivered = self.listeners.dispatch(&channel, message);
        log::trace!("Routed '{}' message to {} listener(s)", channel, delivered);
        delivered
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            routed: self.counters.routed.load(Ordering::Relaxed),
            ignored: self.counters.ignored.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Removes every listener on every channel.
    pub fn clear(&self) {
        self.listeners.clear();
    }
}
