//! # Live Feed Runner
//!
//! Follows a live feed for a few seconds and prints every notification,
//! security event and traffic flow it delivers.
//!
//! With no argument it starts a local mock feed that replays one message per
//! channel. Pass a `ws://` URL to follow a real backend instead.

use std::time::Duration;

use lib_sentinel::feed::{LiveFeedClient, LiveFeedConfig, NotificationService, TrafficService};
use project_tests::{alert_frame, metrics_frame, security_event_frame, traffic_frame, FeedScript, MockFeed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (url, _mock) = match std::env::args().nth(1) {
        Some(url) => (url, None),
        None => {
            let mock = MockFeed::start(FeedScript {
                frames: vec![
                    alert_frame("high", "Port scan from 10.0.0.5"),
                    security_event_frame(1, "medium"),
                    traffic_frame("10.0.0.5", "10.0.0.1"),
                    metrics_frame(420),
                ],
                close_after: false,
            })
            .await?;
            (mock.url.clone(), Some(mock))
        }
    };

    println!("--- Following {} ---", url);
    let feed = LiveFeedClient::new(LiveFeedConfig::new(url));
    let notifications = NotificationService::new();
    let traffic = TrafficService::new();
    let mut bridges = notifications.attach(&feed);
    bridges.push(traffic.attach(&feed));

    let _toasts = notifications.add_notification_listener(|n| {
        println!("✅ notification [{:?}] {}", n.kind, n.message);
    });
    let _events = notifications.add_security_event_listener(|e| {
        println!("✅ security event {} {} {} -> {}", e.id, e.severity, e.source_ip, e.destination_ip);
    });
    let _flows = traffic.add_listener(|t| {
        println!("✅ traffic {} -> {} ({} bytes)", t.source_ip, t.destination_ip, t.size);
    });

    feed.connect();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let stats = feed.stats();
    println!(
        "--- {} routed, {} ignored, {} dropped; state {} ---",
        stats.routed,
        stats.ignored,
        stats.dropped,
        feed.state()
    );
    bridges.unsubscribe_all();
    feed.disconnect();
    Ok(())
}
