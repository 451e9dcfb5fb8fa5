//! # Auth Module
//!
//! Session handling on top of the REST client.
//!
//! - **`store`**: `AuthStore`, the observable login/logout/register state.
//! - **`routes`**: screen routes and the `Navigator` guard that reacts to
//!   session expiry.
//!
//! Token persistence lives in [`crate::api::token_store`] and is re-exported here.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Route table and navigation guard.
pub mod routes;
/// Observable session state.
pub mod store;

// --- Public API Re-exports ---
pub use crate::api::token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use routes::{Navigator, Route};
pub use store::{AuthError, AuthState, AuthStore};
