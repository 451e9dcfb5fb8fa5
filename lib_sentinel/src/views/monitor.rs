//! # Live Views
//!
//! View models fed by the push side:
//! - [`RealTimeMonitor`]: metric chart, alert list and the current alert toast.
//! - [`TrafficVisualizer`]: packets, graph nodes and links.
//! - [`SecurityOverview`]: the latest security events, newest first.
//!
//! Each keeps its state behind a mutex shared with its listener closures.
//! `snapshot()` copies the state out for rendering.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::registry::{Subscription, SubscriptionSet};
use crate::feed::envelope::{AlertPayload, Channel, FeedMessage, MetricPoint, SecurityEvent, TrafficData};
use crate::feed::live_feed::LiveFeedClient;
use crate::feed::notification::{NotificationKind, NotificationService};
use crate::feed::traffic::TrafficService;
use crate::views::window::{
    TrailingWindow, ALERT_WINDOW, METRICS_WINDOW, SECURITY_EVENT_WINDOW, TRAFFIC_LINK_WINDOW,
    TRAFFIC_PACKET_WINDOW,
};

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorState {
    pub metrics: TrailingWindow<MetricPoint>,
    pub alerts: TrailingWindow<AlertPayload>,
    /// Alert shown as a toast until dismissed or replaced.
    pub current_alert: Option<AlertPayload>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            metrics: TrailingWindow::new(METRICS_WINDOW),
            alerts: TrailingWindow::new(ALERT_WINDOW),
            current_alert: None,
        }
    }
}

impl MonitorState {
    /// Appends to the alert list and raises `alert` as the current toast.
    pub fn record_alert(&mut self, alert: &AlertPayload) {
        self.alerts.push(alert.clone());
        self.current_alert = Some(alert.clone());
    }
}

/// Live metric chart plus alerts. Connects the feed while mounted.
pub struct RealTimeMonitor {
    state: Arc<Mutex<MonitorState>>,
    feed: Option<LiveFeedClient>,
    subscriptions: SubscriptionSet,
}

impl RealTimeMonitor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MonitorState::default())),
            feed: None,
            subscriptions: SubscriptionSet::new(),
        }
    }

    /// Subscribes to `metrics` and `alert` and connects the feed.
    pub fn mount(&mut self, feed: &LiveFeedClient) {
        self.unmount();

        let state = Arc::clone(&self.state);
        self.subscriptions.push(feed.add_listener(Channel::Metrics, move |message| {
            if let FeedMessage::Metrics(point) = message {
                lock(&state).metrics.push(point.clone());
            }
        }));

        let state = Arc::clone(&self.state);
        self.subscriptions.push(feed.add_listener(Channel::Alert, move |message| {
            if let FeedMessage::Alert(alert) = message {
                lock(&state).record_alert(alert);
            }
        }));

        feed.connect();
        self.feed = Some(feed.clone());
    }

    /// Drops the listeners and disconnects the feed it mounted.
    pub fn unmount(&mut self) {
        self.subscriptions.unsubscribe_all();
        if let Some(feed) = self.feed.take() {
            feed.disconnect();
        }
    }

    pub fn dismiss_alert(&self) {
        lock(&self.state).current_alert = None;
    }

    pub fn snapshot(&self) -> MonitorState {
        lock(&self.state).clone()
    }

    /// Toast category of the current alert.
    pub fn current_alert_kind(&self) -> Option<NotificationKind> {
        lock(&self.state)
            .current_alert
            .as_ref()
            .map(|alert| NotificationKind::from_severity(&alert.severity))
    }
}

impl Default for RealTimeMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RealTimeMonitor {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Source,
    Destination,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkNode {
    pub id: String,
    pub role: NodeRole,
    pub connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkLink {
    pub source: String,
    pub target: String,
    pub value: u64,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficState {
    pub packets: TrailingWindow<TrafficData>,
    pub nodes: Vec<NetworkNode>,
    pub links: TrailingWindow<NetworkLink>,
}

impl Default for TrafficState {
    fn default() -> Self {
        Self {
            packets: TrailingWindow::new(TRAFFIC_PACKET_WINDOW),
            nodes: Vec::new(),
            links: TrailingWindow::new(TRAFFIC_LINK_WINDOW),
        }
    }
}

impl TrafficState {
    /// Records one flow. Its endpoints replace any older nodes with the same address.
    pub fn record(&mut self, data: &TrafficData) {
        self.packets.push(data.clone());

        self.nodes
            .retain(|node| node.id != data.source_ip && node.id != data.destination_ip);
        self.nodes.push(NetworkNode {
            id: data.source_ip.clone(),
            role: NodeRole::Source,
            connections: 1,
        });
        self.nodes.push(NetworkNode {
            id: data.destination_ip.clone(),
            role: NodeRole::Destination,
            connections: 1,
        });

        self.links.push(NetworkLink {
            source: data.source_ip.clone(),
            target: data.destination_ip.clone(),
            value: data.size,
            protocol: data.protocol.clone(),
        });
    }
}

/// Traffic graph fed by the [`TrafficService`].
#[derive(Default)]
pub struct TrafficVisualizer {
    state: Arc<Mutex<TrafficState>>,
    subscription: Option<Subscription>,
}

impl TrafficVisualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, traffic: &TrafficService) {
        self.detach();
        let state = Arc::clone(&self.state);
        self.subscription = Some(traffic.add_listener(move |data| lock(&state).record(data)));
    }

    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn snapshot(&self) -> TrafficState {
        lock(&self.state).clone()
    }
}

impl Drop for TrafficVisualizer {
    fn drop(&mut self) {
        self.detach();
    }
}

/// One row of the security overview list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityEventRow {
    pub kind: NotificationKind,
    pub label: String,
    pub description: String,
    pub route: String,
}

impl SecurityEventRow {
    pub fn from_event(event: &SecurityEvent) -> Self {
        let kind = match event.severity.as_str().to_ascii_lowercase().as_str() {
            "high" | "critical" => NotificationKind::Error,
            "medium" => NotificationKind::Warning,
            _ => NotificationKind::Info,
        };
        Self {
            kind,
            label: event.severity.as_str().to_uppercase(),
            description: event.description.clone(),
            route: format!("Source: {} -> {}", event.source_ip, event.destination_ip),
        }
    }
}

/// The last ten security events, fed by the [`NotificationService`].
pub struct SecurityOverview {
    events: Arc<Mutex<TrailingWindow<SecurityEvent>>>,
    subscription: Option<Subscription>,
}

impl SecurityOverview {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(TrailingWindow::new(SECURITY_EVENT_WINDOW))),
            subscription: None,
        }
    }

    pub fn attach(&mut self, notifications: &NotificationService) {
        self.detach();
        let events = Arc::clone(&self.events);
        self.subscription = Some(
            notifications.add_security_event_listener(move |event| {
                lock(&events).push(event.clone());
            }),
        );
    }

    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Newest first.
    pub fn events(&self) -> Vec<SecurityEvent> {
        lock(&self.events).newest_first().cloned().collect()
    }

    pub fn rows(&self) -> Vec<SecurityEventRow> {
        lock(&self.events)
            .newest_first()
            .map(SecurityEventRow::from_event)
            .collect()
    }
}

impl Default for SecurityOverview {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SecurityOverview {
    fn drop(&mut self) {
        self.detach();
    }
}
