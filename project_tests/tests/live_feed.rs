use std::sync::{Arc, Mutex};
use std::time::Duration;

use lib_sentinel::core::{ConnectionState, ReconnectPolicy};
use lib_sentinel::feed::{
    Channel, FeedMessage, LiveFeedClient, LiveFeedConfig, NotificationKind, NotificationService,
    TrafficService,
};
use project_tests::{
    alert_frame, eventually, metrics_frame, security_event_frame, traffic_frame, DroppingListener,
    FeedScript, MockFeed,
};

fn config(url: &str, base_delay_ms: u64) -> LiveFeedConfig {
    LiveFeedConfig {
        url: url.to_string(),
        reconnect: ReconnectPolicy {
            base_delay: Duration::from_millis(base_delay_ms),
            max_attempts: 5,
        },
    }
}

fn record(client: &LiveFeedClient, channel: Channel, log: &Arc<Mutex<Vec<String>>>, name: &'static str) {
    let log = log.clone();
    // Subscriptions stay active when the handle is dropped.
    let _ = client.add_listener(channel, move |message| {
        let entry = match message {
            FeedMessage::Metrics(point) => format!("{}:{}", name, point.packet_count),
            FeedMessage::SecurityEvent(event) => format!("{}:{}", name, event.id),
            FeedMessage::Alert(alert) => format!("{}:{}", name, alert.message),
            FeedMessage::Traffic(data) => format!("{}:{}", name, data.source_ip),
        };
        log.lock().unwrap().push(entry);
    });
}

#[tokio::test]
async fn frames_reach_only_their_channel_in_order() {
    let feed = MockFeed::start(FeedScript {
        frames: vec![
            metrics_frame(1),
            security_event_frame(7, "high"),
            r#"{"type":"heartbeat","payload":{}}"#.to_string(),
            "not json".to_string(),
            metrics_frame(2),
            alert_frame("warning", "CPU hot"),
            traffic_frame("10.0.0.9", "10.0.0.1"),
            metrics_frame(3),
        ],
        close_after: false,
    })
    .await
    .unwrap();

    let client = LiveFeedClient::new(config(&feed.url, 50));
    let log = Arc::new(Mutex::new(Vec::new()));
    record(&client, Channel::Metrics, &log, "metrics");
    record(&client, Channel::SecurityEvent, &log, "event");
    record(&client, Channel::Alert, &log, "alert");
    record(&client, Channel::Traffic, &log, "traffic");

    client.connect();
    assert!(eventually(Duration::from_secs(5), || log.lock().unwrap().len() == 6).await);

    let seen = log.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            "metrics:1",
            "event:7",
            "metrics:2",
            "alert:CPU hot",
            "traffic:10.0.0.9",
            "metrics:3",
        ]
    );
    let stats = client.stats();
    assert_eq!(stats.routed, 6);
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.dropped, 1);
    assert_eq!(client.state(), ConnectionState::Open);

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Idle);
    assert!(eventually(Duration::from_secs(5), || feed.closed() == 1).await);
}

#[tokio::test]
async fn unsubscribed_listener_stops_receiving() {
    let feed = MockFeed::start(FeedScript::default()).await.unwrap();
    let client = LiveFeedClient::new(config(&feed.url, 50));

    let kept = Arc::new(Mutex::new(Vec::new()));
    let dropped = Arc::new(Mutex::new(Vec::new()));
    let sink = kept.clone();
    let _kept_sub = client.add_listener(Channel::Metrics, move |message| {
        if let FeedMessage::Metrics(point) = message {
            sink.lock().unwrap().push(point.packet_count);
        }
    });
    let sink = dropped.clone();
    let subscription = client.add_listener(Channel::Metrics, move |message| {
        if let FeedMessage::Metrics(point) = message {
            sink.lock().unwrap().push(point.packet_count);
        }
    });

    let mut states = client.watch_state();
    client.connect();
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| *s == ConnectionState::Open),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(eventually(Duration::from_secs(5), || feed.accepts() == 1).await);

    assert!(eventually(Duration::from_secs(5), || feed.push(metrics_frame(1)) == 1).await);
    assert!(eventually(Duration::from_secs(5), || kept.lock().unwrap().len() == 1).await);

    subscription.unsubscribe();
    assert!(!subscription.is_active());
    assert_eq!(client.listener_count(Channel::Metrics), 1);

    feed.push(metrics_frame(2));
    assert!(eventually(Duration::from_secs(5), || kept.lock().unwrap().len() == 2).await);
    assert_eq!(*dropped.lock().unwrap(), vec![1]);
    assert_eq!(*kept.lock().unwrap(), vec![1, 2]);

    client.disconnect();
}

#[tokio::test]
async fn reconnects_with_growing_delays_then_gives_up() {
    let listener = DroppingListener::start().await.unwrap();
    let client = LiveFeedClient::new(config(&listener.url, 25));
    let mut states = client.watch_state();

    client.connect();
    tokio::time::timeout(
        Duration::from_secs(10),
        states.wait_for(|s| *s == ConnectionState::Exhausted),
    )
    .await
    .expect("the feed gives up after five reconnects")
    .unwrap();

    // One initial attempt plus five reconnects.
    assert_eq!(listener.attempts(), 6);
    let gaps = listener.gaps();
    assert_eq!(gaps.len(), 5);
    assert!(gaps[0] >= Duration::from_millis(25));
    for pair in gaps.windows(2) {
        assert!(pair[1] > pair[0], "gaps should grow: {:?}", gaps);
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(listener.attempts(), 6);
    assert_eq!(client.state(), ConnectionState::Exhausted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reconnecting_never_holds_two_sockets() {
    let feed = MockFeed::start(FeedScript::default()).await.unwrap();
    let client = LiveFeedClient::new(config(&feed.url, 50));
    let mut states = client.watch_state();

    client.connect();
    client.connect();
    for round in 1..=3 {
        tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|s| *s == ConnectionState::Open),
        )
        .await
        .expect("feed opens")
        .unwrap();
        assert!(eventually(Duration::from_secs(5), || feed.accepts() == round).await);

        client.disconnect();
        client.connect();
    }
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| *s == ConnectionState::Open),
    )
    .await
    .expect("feed opens")
    .unwrap();

    assert!(eventually(Duration::from_secs(5), || feed.accepts() == 4).await);
    // Each earlier socket was closed before the next upgrade arrived.
    assert_eq!(feed.open_at_accept(), vec![0, 0, 0, 0]);
    assert_eq!(feed.closed(), 3);

    client.disconnect();
    assert!(eventually(Duration::from_secs(5), || feed.closed() == 4).await);
}

#[tokio::test]
async fn remote_close_reconnects_and_resets_the_budget() {
    let feed = MockFeed::start(FeedScript {
        frames: vec![metrics_frame(1)],
        close_after: true,
    })
    .await
    .unwrap();
    let client = LiveFeedClient::new(config(&feed.url, 10));

    client.connect();
    // Every session opens successfully, so the cap of five is never reached.
    assert!(eventually(Duration::from_secs(5), || feed.accepts() >= 8).await);
    assert_ne!(client.state(), ConnectionState::Exhausted);

    client.disconnect();
    assert_eq!(client.state(), ConnectionState::Idle);
    let settled = feed.accepts();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(feed.accepts() <= settled + 1);
}

#[tokio::test]
async fn services_bridge_alerts_events_and_traffic() {
    let feed = MockFeed::start(FeedScript {
        frames: vec![
            alert_frame("critical", "Brute force on ssh"),
            security_event_frame(11, "medium"),
            traffic_frame("192.168.1.20", "192.168.1.1"),
        ],
        close_after: false,
    })
    .await
    .unwrap();
    let client = LiveFeedClient::new(config(&feed.url, 50));

    let notifications = NotificationService::new();
    let traffic = TrafficService::new();
    let mut bridges = notifications.attach(&client);
    bridges.push(traffic.attach(&client));

    let toasts = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let flows = Arc::new(Mutex::new(Vec::new()));
    let sink = toasts.clone();
    let _toasts = notifications.add_notification_listener(move |n| {
        sink.lock().unwrap().push((n.kind, n.message.clone()));
    });
    let sink = events.clone();
    let _events = notifications.add_security_event_listener(move |e| {
        sink.lock().unwrap().push(e.id.clone());
    });
    let sink = flows.clone();
    let _flows = traffic.add_listener(move |t| {
        sink.lock().unwrap().push(t.source_ip.clone());
    });

    client.connect();
    assert!(
        eventually(Duration::from_secs(5), || {
            toasts.lock().unwrap().len() == 1
                && events.lock().unwrap().len() == 1
                && flows.lock().unwrap().len() == 1
        })
        .await
    );
    assert_eq!(
        toasts.lock().unwrap()[0],
        (NotificationKind::Error, "Brute force on ssh".to_string())
    );
    assert_eq!(*events.lock().unwrap(), vec!["11".to_string()]);
    assert_eq!(*flows.lock().unwrap(), vec!["192.168.1.20".to_string()]);

    bridges.unsubscribe_all();
    assert_eq!(client.listener_count(Channel::Alert), 0);
    assert_eq!(client.listener_count(Channel::Traffic), 0);
    client.disconnect();
}
