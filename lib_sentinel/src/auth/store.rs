//! # Auth Store
//!
//! Session state for the console as an explicit, injectable container. The
//! state is published through a `tokio::sync::watch` channel so any number of
//! views can observe it; mutations go through the store's async actions.

use std::sync::Arc;

use tokio::sync::watch;

use crate::api::client::ApiClient;
use crate::api::error::ClientError;
use crate::api::types::{Organization, RegisterData, User};

/// Error shown to the user, with the HTTP status that caused it when there was one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    pub message: String,
    pub status: Option<u16>,
}

impl AuthError {
    fn new(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    /// Server `detail` if the backend sent one, otherwise `fallback`.
    fn from_client(err: &ClientError, fallback: &str) -> Self {
        Self::new(err.detail().unwrap_or(fallback), err.status())
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AuthError {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<AuthError>,
}

/// Login/logout/register actions over a shared [`AuthState`]. Clones share state.
#[derive(Clone)]
pub struct AuthStore {
    api: ApiClient,
    state: Arc<watch::Sender<AuthState>>,
}

impl AuthStore {
    /// A session exists at startup exactly when the token store holds a token.
    pub fn new(api: ApiClient) -> Self {
        let token = api.tokens().get();
        let initial = AuthState {
            is_authenticated: token.is_some(),
            token,
            ..Default::default()
        };
        let (state, _) = watch::channel(initial);
        Self {
            api,
            state: Arc::new(state),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Exchanges credentials for a token, persists it and loads the current user.
    ///
    /// Nothing is persisted unless both steps succeed.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.begin();

        let token = match self.api.auth().login(email, password).await {
            Ok(response) => response.access_token,
            Err(e) => {
                log::warn!("Login failed for {}: {}", email, e);
                let error = match e.status() {
                    Some(400) | Some(401) => {
                        AuthError::new("Invalid username or password", e.status())
                    }
                    _ => AuthError::from_client(&e, "Failed to login"),
                };
                return Err(self.fail(error));
            }
        };

        if let Err(e) = self.api.tokens().set(&token) {
            log::error!("Could not persist session token: {}", e);
            return Err(self.fail(AuthError::new("Failed to login", None)));
        }

        match self.api.auth().me().await {
            Ok(user) => {
                log::info!("Logged in as {}", user.email);
                self.state.send_modify(|state| {
                    state.user = Some(user.clone());
                    state.token = Some(token);
                    state.is_authenticated = true;
                    state.is_loading = false;
                    state.error = None;
                });
                Ok(user)
            }
            Err(e) => {
                log::warn!("Fetching the current user failed: {}", e);
                if let Err(e) = self.api.tokens().remove() {
                    log::error!("Could not clear session token: {}", e);
                }
                Err(self.fail(AuthError::from_client(&e, "Failed to login")))
            }
        }
    }

    /// Drops the session locally. Never fails; storage errors are logged.
    pub fn logout(&self) {
        if let Err(e) = self.api.tokens().remove() {
            log::error!("Could not clear session token: {}", e);
        }
        self.state.send_modify(|state| {
            state.user = None;
            state.token = None;
            state.is_authenticated = false;
            state.is_loading = false;
            state.error = None;
        });
        log::info!("Logged out.");
    }

    /// Registers an account. `confirm_password` must equal `data.password`.
    pub async fn register(
        &self,
        data: &RegisterData,
        confirm_password: &str,
    ) -> Result<User, AuthError> {
        if data.password != confirm_password {
            let error = AuthError::new("Passwords do not match", None);
            self.state.send_modify(|state| state.error = Some(error.clone()));
            return Err(error);
        }

        self.begin();
        match self.api.auth().register(data).await {
            Ok(user) => {
                log::info!("Registered {}", user.email);
                self.state.send_modify(|state| state.is_loading = false);
                Ok(user)
            }
            Err(e) => {
                log::warn!("Registration failed for {}: {}", data.email, e);
                Err(self.fail(AuthError::from_client(&e, "Failed to register")))
            }
        }
    }

    /// First step of sign-up: the organization the new account will belong to.
    pub async fn create_organization(&self, name: &str) -> Result<Organization, AuthError> {
        self.begin();
        match self.api.auth().create_organization(name).await {
            Ok(organization) => {
                self.state.send_modify(|state| state.is_loading = false);
                Ok(organization)
            }
            Err(e) => Err(self.fail(AuthError::from_client(
                &e,
                "Failed to create organization",
            ))),
        }
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    fn fail(&self, error: AuthError) -> AuthError {
        self.state.send_modify(|state| {
            state.is_loading = false;
            state.error = Some(error.clone());
        });
        error
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("is_authenticated", &self.is_authenticated())
            .finish()
    }
}
