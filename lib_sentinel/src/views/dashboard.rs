//! # Dashboard
//!
//! System health and recent anomalies, fetched together. If either request
//! fails the dashboard shows the error text instead of any metrics.

use crate::api::client::ApiClient;
use crate::api::error::ClientError;
use crate::api::types::{Anomaly, SystemHealth};
use crate::views::render::RenderState;

/// Colour of the status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardData {
    pub health: SystemHealth,
    pub anomalies: Vec<Anomaly>,
}

/// Rendered health card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthPanel {
    pub indicator: StatusIndicator,
    pub status: String,
    pub cpu: String,
    pub memory: String,
}

impl DashboardData {
    pub fn health_panel(&self) -> HealthPanel {
        let metrics = &self.health.metrics;
        HealthPanel {
            indicator: if self.health.is_healthy() {
                StatusIndicator::Success
            } else {
                StatusIndicator::Error
            },
            status: format!("System Status: {}", self.health.status),
            cpu: format!("CPU Usage: {}%", metrics.cpu_usage),
            memory: format!("Memory Usage: {}%", metrics.memory_usage),
        }
    }

    pub fn anomaly_lines(&self) -> Vec<String> {
        if self.anomalies.is_empty() {
            return vec!["No anomalies detected".to_string()];
        }
        self.anomalies
            .iter()
            .map(|anomaly| {
                format!(
                    "Anomaly detected from {} to {} (Score: {:.2})",
                    anomaly.packet.source, anomaly.packet.destination, anomaly.score
                )
            })
            .collect()
    }
}

pub struct DashboardView {
    api: ApiClient,
    state: RenderState<DashboardData>,
}

impl DashboardView {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: RenderState::Loading,
        }
    }

    pub fn state(&self) -> &RenderState<DashboardData> {
        &self.state
    }

    /// Fetches health and anomalies concurrently and replaces the current state.
    pub async fn load(&mut self) -> &RenderState<DashboardData> {
        self.state = RenderState::Loading;
        self.state = RenderState::from_result(fetch(&self.api).await);
        if let Some(message) = self.state.error() {
            log::warn!("Dashboard load failed: {}", message);
        }
        &self.state
    }

    /// Text lines in display order.
    pub fn render(&self) -> Vec<String> {
        match &self.state {
            RenderState::Loading => vec!["Loading...".to_string()],
            RenderState::Failed(message) => vec![message.clone()],
            RenderState::Ready(data) => {
                let panel = data.health_panel();
                let mut lines = vec![
                    "System Health".to_string(),
                    panel.status,
                    panel.cpu,
                    panel.memory,
                    "Recent Anomalies".to_string(),
                ];
                lines.extend(data.anomaly_lines());
                lines
            }
        }
    }
}

async fn fetch(api: &ApiClient) -> Result<DashboardData, ClientError> {
    let monitoring = api.monitoring();
    let security = api.security();
    let (health, anomalies) = tokio::join!(monitoring.health(), security.anomalies());
    Ok(DashboardData {
        health: health?,
        anomalies: anomalies?,
    })
}
