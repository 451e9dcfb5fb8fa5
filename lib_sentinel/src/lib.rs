//! # lib_sentinel
//!
//! Client library for the Sentinel security console.
//!
//! Modules are gated behind features so binaries only pull in what they use:
//! - `feed`: reconnecting WebSocket live feed and the notification bridge.
//! - `api`: REST client, typed endpoints and token storage.
//! - `auth`: session store and route guard.
//! - `views`: derived state for the console screens.
//! - `configs`: layered configuration.
//! - `loggers`: `fern` based logging setup.

/// Registry, reconnect policy and shared helpers.
pub mod core;

#[cfg(feature = "api")]
pub mod api;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "configs")]
pub mod configs;

#[cfg(all(feature = "auth", feature = "feed", feature = "configs"))]
pub mod console;

#[cfg(feature = "feed")]
pub mod feed;

#[cfg(feature = "loggers")]
pub mod loggers;

#[cfg(feature = "views")]
pub mod views;
