//! # Routes
//!
//! Screen routing with an authentication guard. Protected routes require a
//! stored session token; without one the navigator lands on [`Route::Login`].
//! A session rejected by the backend logs the user out and returns them to
//! the login screen.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::api::client::SessionEvent;
use crate::auth::store::AuthStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Events,
    Team,
    Settings,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Login,
        Route::Register,
        Route::Dashboard,
        Route::Events,
        Route::Team,
        Route::Settings,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Events => "/events",
            Route::Team => "/team",
            Route::Settings => "/settings",
        }
    }

    /// Resolves a path. The root redirects to the dashboard.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Some(Route::Dashboard);
        }
        Route::ALL.into_iter().find(|route| route.path() == path)
    }

    pub fn is_protected(self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Holds the current route and enforces the guard.
#[derive(Clone)]
pub struct Navigator {
    auth: AuthStore,
    current: Arc<watch::Sender<Route>>,
}

impl Navigator {
    pub fn new(auth: AuthStore) -> Self {
        let (current, _) = watch::channel(Route::Login);
        Self {
            auth,
            current: Arc::new(current),
        }
    }

    pub fn current(&self) -> Route {
        *self.current.borrow()
    }

    pub fn watch_route(&self) -> watch::Receiver<Route> {
        self.current.subscribe()
    }

    /// Whether `route` may be shown right now.
    pub fn can_access(&self, route: Route) -> bool {
        !route.is_protected() || self.auth.api().tokens().has_token()
    }

    /// Moves to `route`, or to [`Route::Login`] if the guard refuses. Returns where it landed.
    pub fn navigate(&self, route: Route) -> Route {
        let target = if self.can_access(route) {
            route
        } else {
            log::info!("{} requires a session; redirecting to {}", route, Route::Login);
            Route::Login
        };
        self.current.send_if_modified(|current| {
            let changed = *current != target;
            *current = target;
            changed
        });
        target
    }

    /// Reacts to a rejected session: full logout, then back to the login screen.
    pub fn handle_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Expired => {
                log::warn!("Session expired; returning to {}", Route::Login);
                self.auth.logout();
                self.navigate(Route::Login);
            }
        }
    }

    /// Spawns a task that applies [`Self::handle_session_event`] to every event the
    /// API client raises. The task ends when the client is dropped.
    pub fn watch_sessions(&self) -> JoinHandle<()> {
        let navigator = self.clone();
        let mut events = self.auth.api().session_events();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => navigator.handle_session_event(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Missed {} session events", skipped);
                        navigator.handle_session_event(SessionEvent::Expired);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::{ApiClient, ApiConfig};
    use crate::api::token_store::{MemoryTokenStore, TokenStore};

    fn navigator(tokens: Arc<MemoryTokenStore>) -> Navigator {
        let api = ApiClient::new(ApiConfig::new("http://127.0.0.1:1/api"), tokens).unwrap();
        Navigator::new(AuthStore::new(api))
    }

    #[test]
    fn paths_round_trip_and_root_is_dashboard() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/"), Some(Route::Dashboard));
        assert_eq!(Route::from_path("/events/"), Some(Route::Events));
        assert_eq!(Route::from_path("/nowhere"), None);
        assert!(!Route::Login.is_protected());
        assert!(!Route::Register.is_protected());
        assert!(Route::Team.is_protected());
    }

    #[test]
    fn protected_routes_need_a_stored_token() {
        let tokens = Arc::new(MemoryTokenStore::new());
        let nav = navigator(tokens.clone());

        assert_eq!(nav.navigate(Route::Dashboard), Route::Login);
        assert_eq!(nav.navigate(Route::Register), Route::Register);

        tokens.set("t").unwrap();
        assert_eq!(nav.navigate(Route::Settings), Route::Settings);
        assert_eq!(nav.current(), Route::Settings);
    }

    #[test]
    fn expiry_logs_out_and_returns_to_login() {
        let tokens = Arc::new(MemoryTokenStore::with_token("t"));
        let nav = navigator(tokens.clone());
        nav.navigate(Route::Events);

        nav.handle_session_event(SessionEvent::Expired);

        assert_eq!(nav.current(), Route::Login);
        assert!(!tokens.has_token());
        assert!(!nav.auth.is_authenticated());
    }
}
