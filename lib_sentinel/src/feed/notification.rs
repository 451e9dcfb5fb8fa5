//! # Notification Service
//!
//! Toast notifications and security-event notifications for the UI layer.
//! `attach` bridges the live feed into it: `alert` envelopes become
//! [`Notification`]s and `security_event` envelopes are re-published as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::registry::{Registry, Subscription, SubscriptionSet};
use crate::feed::envelope::{AlertPayload, Channel, FeedMessage, SecurityEvent};
use crate::feed::live_feed::LiveFeedClient;

/// Visual category of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Error,
    Warning,
    Info,
    Success,
}

impl NotificationKind {
    /// Maps a backend severity label onto a toast category.
    pub fn from_severity(severity: &str) -> Self {
        match severity.to_ascii_lowercase().as_str() {
            "error" | "critical" | "high" => Self::Error,
            "warning" | "warn" | "medium" => Self::Warning,
            "success" | "ok" | "resolved" => Self::Success,
            _ => Self::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: now.timestamp_millis().to_string(),
            kind,
            message: message.into(),
            timestamp: now,
            details: None,
        }
    }

    /// Builds the toast for an `alert` payload; the full payload is kept as details.
    pub fn from_alert(alert: &AlertPayload) -> Self {
        let mut notification =
            Self::new(NotificationKind::from_severity(&alert.severity), alert.message.clone());
        notification.details = serde_json::to_value(alert).ok();
        notification
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Topic {
    Notification,
    SecurityEvent,
}

#[derive(Debug, Clone)]
enum Published {
    Notification(Notification),
    SecurityEvent(SecurityEvent),
}

/// Publish/subscribe hub for notifications. Clones share listeners.
#[derive(Clone, Default)]
pub struct NotificationService {
    listeners: Registry<Topic, Published>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_notification_listener<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.listeners.subscribe(Topic::Notification, move |published| {
            if let Published::Notification(notification) = published {
                listener(notification);
            }
        })
    }

    pub fn add_security_event_listener<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SecurityEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(Topic::SecurityEvent, move |published| {
            if let Published::SecurityEvent(event) = published {
                listener(event);
            }
        })
    }

    pub fn notify(&self, notification: Notification) {
        log::debug!("Notification [{:?}] {}", notification.kind, notification.message);
        self.listeners
            .dispatch(&Topic::Notification, &Published::Notification(notification));
    }

    pub fn notify_security_event(&self, event: SecurityEvent) {
        self.listeners
            .dispatch(&Topic::SecurityEvent, &Published::SecurityEvent(event));
    }

    /// Routes the feed's `alert` and `security_event` channels into this service.
    pub fn attach(&self, feed: &LiveFeedClient) -> SubscriptionSet {
        let mut subscriptions = SubscriptionSet::new();

        let service = self.clone();
        subscriptions.push(feed.add_listener(Channel::Alert, move |message| {
            if let FeedMessage::Alert(alert) = message {
                service.notify(Notification::from_alert(alert));
            }
        }));

        let service = self.clone();
        subscriptions.push(feed.add_listener(Channel::SecurityEvent, move |message| {
            if let FeedMessage::SecurityEvent(event) = message {
                service.notify_security_event(event.clone());
            }
        }));

        subscriptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::envelope::Severity;
    use serde_json::{json, Map};
    use std::sync::{Arc, Mutex};

    #[test]
    fn severity_labels_map_to_kinds() {
        assert_eq!(NotificationKind::from_severity("critical"), NotificationKind::Error);
        assert_eq!(NotificationKind::from_severity("Warning"), NotificationKind::Warning);
        assert_eq!(NotificationKind::from_severity("medium"), NotificationKind::Warning);
        assert_eq!(NotificationKind::from_severity("success"), NotificationKind::Success);
        assert_eq!(NotificationKind::from_severity("low"), NotificationKind::Info);
        assert_eq!(NotificationKind::from_severity(""), NotificationKind::Info);
    }

    #[test]
    fn alert_becomes_notification_with_details() {
        let mut extra = Map::new();
        extra.insert("source_ip".to_string(), json!("10.1.1.1"));
        let alert = AlertPayload {
            id: Some(json!(3)),
            severity: "error".to_string(),
            message: "DDoS suspected".to_string(),
            timestamp: None,
            extra,
        };

        let notification = Notification::from_alert(&alert);
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.message, "DDoS suspected");
        let details = notification.details.unwrap();
        assert_eq!(details["source_ip"], json!("10.1.1.1"));
        assert_eq!(details["id"], json!(3));
    }

    #[test]
    fn listeners_are_topic_scoped() {
        let service = NotificationService::new();
        let toasts = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Mutex::new(Vec::new()));

        let toast_sub = {
            let toasts = Arc::clone(&toasts);
            service.add_notification_listener(move |n| toasts.lock().unwrap().push(n.message.clone()))
        };
        let _event_sub = {
            let events = Arc::clone(&events);
            service.add_security_event_listener(move |e| events.lock().unwrap().push(e.id.clone()))
        };

        service.notify(Notification::new(NotificationKind::Info, "hello"));
        service.notify_security_event(SecurityEvent {
            id: "e1".to_string(),
            kind: "scan".to_string(),
            source_ip: "1.1.1.1".to_string(),
            destination_ip: "2.2.2.2".to_string(),
            severity: Severity::Low,
            description: String::new(),
            timestamp: Utc::now(),
            anomaly_score: None,
        });
        toast_sub.unsubscribe();
        service.notify(Notification::new(NotificationKind::Info, "ignored"));

        assert_eq!(*toasts.lock().unwrap(), vec!["hello"]);
        assert_eq!(*events.lock().unwrap(), vec!["e1"]);
    }
}
