//! # Mock Backend
//!
//! Local stand-ins for the console backend used by the integration tests and
//! the manual runners: an HTTP server built from an `axum::Router`, a scripted
//! WebSocket feed, and a listener that drops every connection before the
//! handshake.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Serves `router` on an ephemeral localhost port.
pub async fn serve(router: Router) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            log::error!("Mock HTTP server stopped: {}", e);
        }
    });
    Ok(addr)
}

/// REST base URL for a server started with [`serve`]; routes live under `/api`.
pub fn api_base(addr: SocketAddr) -> String {
    format!("http://{}/api", addr)
}

/// Frames a [`MockFeed`] sends to every connection right after the upgrade.
#[derive(Debug, Clone, Default)]
pub struct FeedScript {
    pub frames: Vec<String>,
    /// Send a close frame after the scripted frames instead of holding the socket open.
    pub close_after: bool,
}

#[derive(Clone)]
struct FeedState {
    script: FeedScript,
    accepts: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    open_at_accept: Arc<Mutex<Vec<usize>>>,
    push: broadcast::Sender<String>,
}

/// A WebSocket endpoint at `/ws` that replays a [`FeedScript`].
pub struct MockFeed {
    pub url: String,
    accepts: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    open_at_accept: Arc<Mutex<Vec<usize>>>,
    push: broadcast::Sender<String>,
}

impl MockFeed {
    pub async fn start(script: FeedScript) -> anyhow::Result<Self> {
        let accepts = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let open_at_accept = Arc::new(Mutex::new(Vec::new()));
        let (push, _) = broadcast::channel(64);
        let state = FeedState {
            script,
            accepts: accepts.clone(),
            closed: closed.clone(),
            open_at_accept: open_at_accept.clone(),
            push: push.clone(),
        };
        let router = Router::new().route("/ws", get(upgrade)).with_state(state);
        let addr = serve(router).await?;
        Ok(Self {
            url: format!("ws://{}/ws", addr),
            accepts,
            closed,
            open_at_accept,
            push,
        })
    }

    /// Upgrades accepted so far.
    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }

    /// Connections the client closed (or that went away) while held open.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// For each upgrade, how many earlier sockets were still open when it arrived.
    pub fn open_at_accept(&self) -> Vec<usize> {
        self.open_at_accept
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    /// Sends `frame` to every open connection. Returns how many received it.
    pub fn push(&self, frame: impl Into<String>) -> usize {
        self.push.send(frame.into()).unwrap_or(0)
    }
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<FeedState>) -> Response {
    let earlier = state.accepts.fetch_add(1, Ordering::SeqCst);
    let open = earlier.saturating_sub(state.closed.load(Ordering::SeqCst));
    if let Ok(mut seen) = state.open_at_accept.lock() {
        seen.push(open);
    }
    ws.on_upgrade(move |socket| replay(socket, state))
}

async fn replay(mut socket: WebSocket, state: FeedState) {
    let mut pushed = state.push.subscribe();
    for frame in &state.script.frames {
        if socket.send(Message::Text(frame.clone().into())).await.is_err() {
            return;
        }
    }
    if state.script.close_after {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            frame = pushed.recv() => match frame {
                Ok(frame) => {
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    state.closed.fetch_add(1, Ordering::SeqCst);
}

/// Accepts TCP connections and drops them at once, so every WebSocket handshake fails.
pub struct DroppingListener {
    pub url: String,
    accepted_at: Arc<Mutex<Vec<Instant>>>,
}

impl DroppingListener {
    pub async fn start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let accepted_at = Arc::new(Mutex::new(Vec::new()));
        let log = accepted_at.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if let Ok(mut times) = log.lock() {
                    times.push(Instant::now());
                }
                drop(stream);
            }
        });
        Ok(Self {
            url: format!("ws://{}/ws", addr),
            accepted_at,
        })
    }

    pub fn attempts(&self) -> usize {
        self.accepted_at.lock().map(|times| times.len()).unwrap_or(0)
    }

    /// Time between consecutive connection attempts.
    pub fn gaps(&self) -> Vec<Duration> {
        self.accepted_at
            .lock()
            .map(|times| times.windows(2).map(|pair| pair[1] - pair[0]).collect())
            .unwrap_or_default()
    }
}

/// Polls `condition` every 10ms until it holds or `limit` passes.
pub async fn eventually(limit: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// A `security_event` envelope.
pub fn security_event_frame(id: u64, severity: &str) -> String {
    serde_json::json!({
        "type": "security_event",
        "payload": {
            "id": id,
            "type": "port_scan",
            "source_ip": "10.0.0.5",
            "destination_ip": "10.0.0.1",
            "severity": severity,
            "description": "Sequential port probes",
            "timestamp": "2024-03-01T12:00:00Z"
        }
    })
    .to_string()
}

/// An `alert` envelope.
pub fn alert_frame(severity: &str, message: &str) -> String {
    serde_json::json!({
        "type": "alert",
        "payload": { "id": 1, "severity": severity, "message": message }
    })
    .to_string()
}

/// A `metrics` envelope.
pub fn metrics_frame(packet_count: u64) -> String {
    serde_json::json!({
        "type": "metrics",
        "payload": { "timestamp": "12:00:00", "packet_count": packet_count, "anomaly_score": 0.1 }
    })
    .to_string()
}

/// A `traffic` envelope.
pub fn traffic_frame(source: &str, destination: &str) -> String {
    serde_json::json!({
        "type": "traffic",
        "payload": {
            "timestamp": "2024-03-01T12:00:01Z",
            "source_ip": source,
            "destination_ip": destination,
            "protocol": 6,
            "size": 1500,
            "type": "tcp"
        }
    })
    .to_string()
}
