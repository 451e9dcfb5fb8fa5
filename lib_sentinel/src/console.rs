//! # Console
//!
//! Wires the clients together the way the console application uses them:
//! one REST client and token store, the auth store and navigator on top, and
//! one live feed bridged into the notification and traffic services.

use crate::api::client::ApiClient;
use crate::api::error::ClientError;
use crate::auth::routes::Navigator;
use crate::auth::store::AuthStore;
use crate::configs::ConsoleConfig;
use crate::core::registry::SubscriptionSet;
use crate::feed::live_feed::LiveFeedClient;
use crate::feed::notification::NotificationService;
use crate::feed::traffic::TrafficService;

pub struct Console {
    pub api: ApiClient,
    pub auth: AuthStore,
    pub navigator: Navigator,
    pub feed: LiveFeedClient,
    pub notifications: NotificationService,
    pub traffic: TrafficService,
    bridges: SubscriptionSet,
    session_watcher: Option<tokio::task::JoinHandle<()>>,
}

impl Console {
    /// Builds every client from `config`. Nothing connects until [`Console::start`].
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, ClientError> {
        let api = ApiClient::new(config.api_config(), config.token_store())?;
        let auth = AuthStore::new(api.clone());
        let navigator = Navigator::new(auth.clone());
        Ok(Self {
            api,
            auth,
            navigator,
            feed: LiveFeedClient::new(config.live_feed_config()),
            notifications: NotificationService::new(),
            traffic: TrafficService::new(),
            bridges: SubscriptionSet::new(),
            session_watcher: None,
        })
    }

    /// Bridges the feed into the services and starts following session expiry.
    /// Must run inside a tokio runtime. Calling it twice is harmless.
    pub fn start(&mut self) {
        if self.bridges.is_empty() {
            let notifications = self.notifications.attach(&self.feed);
            self.bridges.extend(notifications);
            self.bridges.push(self.traffic.attach(&self.feed));
        }
        if self.session_watcher.is_none() {
            self.session_watcher = Some(self.navigator.watch_sessions());
        }
    }

    /// Disconnects the feed and drops the bridges.
    pub fn shutdown(&mut self) {
        self.feed.disconnect();
        self.bridges.unsubscribe_all();
        if let Some(watcher) = self.session_watcher.take() {
            watcher.abort();
        }
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.shutdown();
    }
}
