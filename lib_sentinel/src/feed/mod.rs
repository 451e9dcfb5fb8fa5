//! # Live Feed Module
//!
//! The push side of the console. A single reconnecting WebSocket connection
//! delivers tagged envelopes which are routed to channel listeners.
//!
//! ## Contained Modules:
//! - **`envelope`**: wire shapes and decoding of `{type, payload}` frames.
//! - **`dispatcher`**: routes decoded envelopes to the channel registry.
//! - **`live_feed`**: the connection supervisor with bounded exponential backoff.
//! - **`notification`**: toast and security-event hub bridged from the feed.
//! - **`traffic`**: forwards observed flows to traffic listeners.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Envelope wire types and decoding.
pub mod envelope;
/// Envelope routing onto the channel registry.
pub mod dispatcher;
/// The reconnecting WebSocket client.
pub mod live_feed;
/// Toast and security-event notifications.
pub mod notification;
/// Traffic flow listeners.
pub mod traffic;

// --- Public API Re-exports ---
pub use dispatcher::{DispatchStats, Dispatcher, RouteOutcome};
pub use envelope::{
    AlertPayload, Channel, FeedMessage, MetricPoint, SecurityEvent, Severity, TrafficData,
};
pub use live_feed::{LiveFeedClient, LiveFeedConfig};
pub use notification::{Notification, NotificationKind, NotificationService};
pub use traffic::TrafficService;
