//! # Views Module
//!
//! Derived state behind the console screens. Nothing here draws anything;
//! each view turns API responses or feed messages into display-ready values.
//!
//! ## Contained Modules:
//! - **`render`**: the loading / failed / ready lifecycle.
//! - **`window`**: bounded trailing windows for streamed data.
//! - **`dashboard`**: system health and recent anomalies.
//! - **`monitor`**: real-time monitor, traffic visualizer and security overview.
//! - **`events`**: events table filtering, paging and the severity chart.
//! - **`team`**: team table filtering.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod dashboard;
pub mod events;
pub mod monitor;
pub mod render;
pub mod team;
pub mod window;

// --- Public API Re-exports ---
pub use dashboard::{DashboardData, DashboardView, HealthPanel, StatusIndicator};
pub use events::{format_timestamp, page_count, paginate, severity_by_day, EventFilter, SeverityBucket};
pub use monitor::{
    MonitorState, NetworkLink, NetworkNode, NodeRole, RealTimeMonitor, SecurityEventRow,
    SecurityOverview, TrafficState, TrafficVisualizer,
};
pub use render::RenderState;
pub use team::{filter_members, role_label};
pub use window::{
    TrailingWindow, ALERT_WINDOW, METRICS_WINDOW, SECURITY_EVENT_WINDOW, TRAFFIC_LINK_WINDOW,
    TRAFFIC_PACKET_WINDOW,
};
