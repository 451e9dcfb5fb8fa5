//! Request and response bodies of the console backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::serde_ext::{opt_string_or_number, string_or_number};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// OAuth2 password-flow token response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub organization_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct NewOrganization<'a> {
    pub name: &'a str,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_usage: f64,
    #[serde(default)]
    pub packet_count: u64,
    #[serde(default)]
    pub anomaly_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlert {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// `GET /monitoring/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    /// `"healthy"` or `"critical"`; other values are passed through.
    pub status: String,
    #[serde(default)]
    pub metrics: HealthMetrics,
    #[serde(default)]
    pub alerts: Vec<HealthAlert>,
}

impl SystemHealth {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPacket {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub protocol: String,
    #[serde(default)]
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub packet: AnomalyPacket,
    pub score: f64,
}

/// A row of the security events table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEventRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub event_type: String,
    pub severity: String,
    #[serde(default)]
    pub description: String,
    pub created_at: String,
    #[serde(default)]
    pub event_metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<SecurityEventRecord>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Filters and paging for `GET /events`. `page` is zero-based here and sent one-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub page: u32,
    pub per_page: u32,
    pub search: Option<String>,
    pub severity: Option<String>,
    pub event_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: 10,
            search: None,
            severity: None,
            event_type: None,
            start_date: None,
            end_date: None,
        }
    }
}

impl EventQuery {
    /// Query pairs in wire order. Empty filters and the `"all"` sentinel are omitted.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.saturating_add(1).to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        let optional = [
            ("search", &self.search),
            ("severity", &self.severity),
            ("event_type", &self.event_type),
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty() && *v != "all") {
                pairs.push((key, value.to_string()));
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteData {
    pub email: String,
    pub role: TeamRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationFrequency {
    Realtime,
    Hourly,
    Daily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSettings {
    pub name: String,
    pub notification_email: String,
    pub alert_threshold: f64,
    pub enable_notifications: bool,
    pub notification_frequency: NotificationFrequency,
    pub security_level: SecurityLevel,
    pub auto_block_threats: bool,
    pub retention_days: u32,
}

/// Partial update for [`OrganizationSettings`]; unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_frequency: Option<NotificationFrequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_level: Option<SecurityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_block_threats: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_query_is_one_based_and_skips_empty_filters() {
        let query = EventQuery {
            page: 2,
            per_page: 25,
            search: Some("ssh".to_string()),
            severity: Some("all".to_string()),
            event_type: Some(String::new()),
            start_date: Some("2024-01-01".to_string()),
            end_date: None,
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("page", "3".to_string()),
                ("per_page", "25".to_string()),
                ("search", "ssh".to_string()),
                ("start_date", "2024-01-01".to_string()),
            ]
        );
    }

    #[test]
    fn last_page_does_not_overflow() {
        let query = EventQuery {
            page: u32::MAX,
            ..Default::default()
        };
        assert_eq!(query.to_pairs()[0], ("page", u32::MAX.to_string()));
    }

    #[test]
    fn health_tolerates_missing_sections() {
        let health: SystemHealth =
            serde_json::from_value(json!({"status": "healthy", "metrics": {"cpu_usage": 25, "memory_usage": 40}}))
                .unwrap();
        assert!(health.is_healthy());
        assert_eq!(health.metrics.cpu_usage, 25.0);
        assert_eq!(health.metrics.packet_count, 0);
        assert!(health.alerts.is_empty());
    }

    #[test]
    fn user_ids_may_be_numeric() {
        let user: User = serde_json::from_value(json!({
            "id": 7,
            "email": "ana@example.com",
            "organization_id": 3,
            "is_superuser": true
        }))
        .unwrap();
        assert_eq!(user.id, "7");
        assert_eq!(user.organization_id.as_deref(), Some("3"));
        assert!(user.is_active);
    }

    #[test]
    fn settings_update_sends_only_set_fields() {
        let update = SettingsUpdate {
            retention_days: Some(30),
            security_level: Some(SecurityLevel::High),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"retention_days": 30, "security_level": "high"})
        );
    }
}
