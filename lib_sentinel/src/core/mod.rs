//! # Core Module
//!
//! Runtime-agnostic building blocks shared by the live feed, the notification
//! bridge and the session layer.
//!
//! - **`registry`**: channel-keyed subscriber registry with disposers. Both the
//!   live feed and the notification service route through it.
//! - **`reconnect`**: connection states and the bounded exponential backoff
//!   used by the live feed supervisor.
//! - **`serde_ext`**: lenient field decoders for backend payloads.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Channel name -> ordered callbacks, with `Subscription` disposers.
pub mod registry;
/// Connection state machine and reconnect backoff.
pub mod reconnect;
/// Lenient serde helpers.
#[cfg(any(feature = "feed", feature = "api"))]
pub(crate) mod serde_ext;

// --- Public API Re-exports ---
pub use registry::{Callback, Registry, Subscription, SubscriptionSet};
pub use reconnect::{Backoff, ConnectionState, ReconnectPolicy};
