//! # REST API Module
//!
//! The pull side of the console: request/response access to the backend.
//!
//! ## Contained Modules:
//!
//! - **`client`**: the shared `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`. Attaches the bearer token, retries idempotent reads
//!   once and turns a rejected token into a session-expiry event.
//! - **`services`**: typed endpoint groups (auth, monitoring, security, team,
//!   settings).
//! - **`types`**: request and response bodies.
//! - **`token_store`**: where the session token is persisted.
//! - **`error`**: `ClientError` and `StoreError`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// HTTP client with bearer auth, read retries and session expiry.
pub mod client;
/// Error types for requests and token storage.
pub mod error;
/// Typed endpoint wrappers.
pub mod services;
/// Persisted session token.
pub mod token_store;
/// Wire types.
pub mod types;

// --- Public API Re-exports ---
pub use client::{ApiClient, ApiConfig, ApiResponse, SessionEvent, DEFAULT_API_URL};
pub use error::{ClientError, StoreError};
pub use services::{AuthApi, MonitoringApi, SecurityApi, SettingsApi, TeamApi};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use types::*;
