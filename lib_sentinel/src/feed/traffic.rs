//! # Traffic Service
//!
//! Forwards the live feed's `traffic` channel to traffic listeners.

use crate::core::registry::{Registry, Subscription};
use crate::feed::envelope::{Channel, FeedMessage, TrafficData};
use crate::feed::live_feed::LiveFeedClient;

#[derive(Clone, Default)]
pub struct TrafficService {
    listeners: Registry<(), TrafficData>,
}

impl TrafficService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes this service to `feed`.
    pub fn attach(&self, feed: &LiveFeedClient) -> Subscription {
        let service = self.clone();
        feed.add_listener(Channel::Traffic, move |message| {
            if let FeedMessage::Traffic(data) = message {
                service.publish(data);
            }
        })
    }

    pub fn add_listener<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&TrafficData) + Send + Sync + 'static,
    {
        self.listeners.subscribe((), callback)
    }

    pub fn publish(&self, data: &TrafficData) {
        self.listeners.dispatch(&(), data);
    }
}
