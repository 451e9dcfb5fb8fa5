//! # Live Feed Client
//!
//! Keeps a single WebSocket connection to the backend's push channel, decodes
//! the envelopes it delivers and fans them out to channel listeners.
//!
//! A `connect()` spawns one supervisor task. The supervisor owns the transport
//! and runs the reconnect state machine: on an unexpected close it waits
//! `base_delay * 2^n` and tries again, up to `max_attempts` times, then parks in
//! [`ConnectionState::Exhausted`] until `connect()` is called again. A
//! successful open resets the budget. `disconnect()` cancels the supervisor,
//! which closes the socket or abandons the pending wait.
//!
//! Only one supervisor is live per client, and a new supervisor waits for the
//! previous one to finish before dialing, so at most one physical connection
//! exists at any time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;

use crate::core::reconnect::{ConnectionState, ReconnectPolicy};
use crate::core::registry::Subscription;
use crate::feed::dispatcher::{DispatchStats, Dispatcher};
use crate::feed::envelope::{Channel, FeedMessage};

/// Default push endpoint of a locally running backend.
pub const DEFAULT_FEED_URL: &str = "ws://localhost:8000/ws";

/// How long a requested close waits for the peer to drop the socket.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Configuration for the live feed.
#[derive(Debug, Clone)]
pub struct LiveFeedConfig {
    pub url: String,
    pub reconnect: ReconnectPolicy,
}

impl Default for LiveFeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl LiveFeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

struct FeedTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    config: LiveFeedConfig,
    dispatcher: Dispatcher,
    state_tx: watch::Sender<ConnectionState>,
    task: Mutex<Option<FeedTask>>,
}

impl Inner {
    fn task_slot(&self) -> MutexGuard<'_, Option<FeedTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `state` unless the supervisor owning `cancel` has been cancelled.
    /// The check runs under the watch lock, so a concurrent `disconnect()` always wins.
    fn set_state(&self, cancel: &CancellationToken, state: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            if cancel.is_cancelled() || *current == state {
                return false;
            }
            log::debug!("Live feed state: {} -> {}", current, state);
            *current = state;
            true
        });
    }
}

/// How a connected session ended.
enum Closure {
    /// `disconnect()` was called.
    Requested,
    /// The remote closed, the stream errored, or it ended.
    Unexpected,
}

/// Handle to the live feed. Cheap to clone; clones share the connection and listeners.
#[derive(Clone)]
pub struct LiveFeedClient {
    inner: Arc<Inner>,
}

impl LiveFeedClient {
    pub fn new(config: LiveFeedConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                dispatcher: Dispatcher::new(),
                state_tx,
                task: Mutex::new(None),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    pub fn config(&self) -> &LiveFeedConfig {
        &self.inner.config
    }

    /// Starts the connection supervisor.
    ///
    /// Never fails: connection problems go through the reconnect path. Calling
    /// this while a supervisor is already live is a no-op. Must be called from
    /// within a tokio runtime; outside one the call is logged and ignored.
    pub fn connect(&self) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("Live feed connect() called outside a tokio runtime: {}", e);
                return;
            }
        };

        let mut slot = self.inner.task_slot();
        let previous = match slot.take() {
            Some(task)
                if !task.cancel.is_cancelled()
                    && !task.handle.is_finished()
                    && self.state().is_live() =>
            {
                log::debug!("Live feed already running; connect() ignored.");
                *slot = Some(task);
                return;
            }
            Some(task) => {
                // An exhausted supervisor may still be unwinding; silence it.
                task.cancel.cancel();
                Some(task.handle)
            }
            None => None,
        };

        let cancel = CancellationToken::new();
        // Published under the slot lock so a second connect() sees a live supervisor.
        self.inner.set_state(&cancel, ConnectionState::Connecting);
        let handle = runtime.spawn(supervise(
            Arc::clone(&self.inner),
            cancel.clone(),
            previous,
        ));
        *slot = Some(FeedTask { cancel, handle });
    }

    /// Closes the transport if open and cancels any scheduled reconnect. Idempotent.
    pub fn disconnect(&self) {
        let slot = self.inner.task_slot();
        if let Some(task) = slot.as_ref() {
            if !task.cancel.is_cancelled() {
                log::info!("Disconnecting live feed: {}", self.inner.config.url);
                task.cancel.cancel();
            }
        }
        self.inner.state_tx.send_if_modified(|current| {
            if *current == ConnectionState::Idle {
                return false;
            }
            *current = ConnectionState::Idle;
            true
        });
    }

    /// Registers `callback` for messages on `channel`.
    pub fn add_listener<F>(&self, channel: Channel, callback: F) -> Subscription
    where
        F: Fn(&FeedMessage) + Send + Sync + 'static,
    {
        self.inner.dispatcher.add_listener(channel, callback)
    }

    pub fn listener_count(&self, channel: Channel) -> usize {
        self.inner.dispatcher.listener_count(channel)
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// A receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn stats(&self) -> DispatchStats {
        self.inner.dispatcher.stats()
    }
}

impl std::fmt::Debug for LiveFeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveFeedClient")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .finish()
    }
}

/// Connection supervisor: dial, pump, back off, repeat.
async fn supervise(
    inner: Arc<Inner>,
    cancel: CancellationToken,
    previous: Option<JoinHandle<()>>,
) {
    // The prior supervisor may still be closing its socket.
    if let Some(previous) = previous {
        let _ = previous.await;
    }

    let url = inner.config.url.clone();
    let policy = inner.config.reconnect;
    let mut backoff = policy.backoff();

    loop {
        if cancel.is_cancelled() {
            return;
        }
        inner.set_state(&cancel, ConnectionState::Connecting);
        log::info!("Connecting to live feed: {}", url);

        let attempt = tokio::select! {
            _ = cancel.cancelled() => return,
            result = connect_async(url.as_str()) => result,
        };

        match attempt {
            Ok((ws_stream, _)) => {
                log::info!("Live feed connected.");
                backoff.reset();
                inner.set_state(&cancel, ConnectionState::Open);
                if let Closure::Requested = pump(&inner, ws_stream, &cancel).await {
                    return;
                }
            }
            Err(e) => {
                log::error!("Failed to connect to live feed: {}", e);
            }
        }

        match backoff.next_delay() {
            Some(delay) => {
                inner.set_state(&cancel, ConnectionState::Closed);
                log::warn!(
                    "Live feed reconnect {}/{} in {}ms",
                    backoff.attempts(),
                    policy.max_attempts,
                    delay.as_millis()
                );
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => {
                inner.set_state(&cancel, ConnectionState::Exhausted);
                log::error!(
                    "Live feed gave up after {} reconnect attempts; call connect() to retry.",
                    policy.max_attempts
                );
                return;
            }
        }
    }
}

/// Reads frames until the socket ends or `cancel` fires.
async fn pump(
    inner: &Inner,
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    cancel: &CancellationToken,
) -> Closure {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                // The socket must be gone before the next supervisor dials.
                let drained = tokio::time::timeout(CLOSE_GRACE, async {
                    while let Some(Ok(_)) = read.next().await {}
                })
                .await;
                if drained.is_err() {
                    log::warn!("Live feed peer did not close within {}ms; dropping the socket.", CLOSE_GRACE.as_millis());
                }
                let _ = write.close().await;
                log::info!("Live feed closed.");
                return Closure::Requested;
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        inner.dispatcher.route_text(text.as_str());
                    }
                    Some(Ok(Message::Binary(bin))) => match std::str::from_utf8(&bin) {
                        Ok(text) => {
                            inner.dispatcher.route_text(text);
                        }
                        Err(_) => log::warn!("Dropping non UTF-8 binary frame ({} bytes)", bin.len()),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        log::warn!("Live feed closed by remote host: {:?}", frame);
                        return Closure::Unexpected;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::error!("Live feed read error: {}", e);
                        return Closure::Unexpected;
                    }
                    None => {
                        log::warn!("Live feed stream ended.");
                        return Closure::Unexpected;
                    }
                }
            }
        }
    }
}
