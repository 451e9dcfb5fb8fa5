//! # Live Feed Envelopes
//!
//! Every inbound frame is a JSON object `{ "type": <tag>, "payload": {...} }`.
//! The tag selects the [`Channel`] and the shape of the payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::serde_ext::string_or_number;

/// Named category of live-feed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    SecurityEvent,
    Alert,
    Metrics,
    Traffic,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::SecurityEvent,
        Channel::Alert,
        Channel::Metrics,
        Channel::Traffic,
    ];

    /// Maps an envelope `type` tag to its channel. Unknown tags map to `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "security_event" => Some(Self::SecurityEvent),
            "alert" => Some(Self::Alert),
            "metrics" => Some(Self::Metrics),
            "traffic" => Some(Self::Traffic),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::SecurityEvent => "security_event",
            Self::Alert => "alert",
            Self::Metrics => "metrics",
            Self::Traffic => "traffic",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Severity as reported by the backend. Unrecognised labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for Severity {
    fn from(label: String) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Other(label),
        }
    }
}

impl From<&str> for Severity {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `security_event` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub source_ip: String,
    pub destination_ip: String,
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,
}

/// `alert` payload. Unknown fields are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `metrics` payload: one point of the live traffic chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, alias = "packetCount")]
    pub packet_count: u64,
    #[serde(default, alias = "anomalyScore")]
    pub anomaly_score: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `traffic` payload: one observed flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficData {
    pub timestamp: DateTime<Utc>,
    pub source_ip: String,
    pub destination_ip: String,
    #[serde(deserialize_with = "string_or_number")]
    pub protocol: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A decoded live-feed message.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    SecurityEvent(SecurityEvent),
    Alert(AlertPayload),
    Metrics(MetricPoint),
    Traffic(TrafficData),
}

impl FeedMessage {
    pub fn channel(&self) -> Channel {
        match self {
            Self::SecurityEvent(_) => Channel::SecurityEvent,
            Self::Alert(_) => Channel::Alert,
            Self::Metrics(_) => Channel::Metrics,
            Self::Traffic(_) => Channel::Traffic,
        }
    }

    /// Decodes `payload` as the shape `channel` carries.
    pub fn decode(channel: Channel, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match channel {
            Channel::SecurityEvent => Self::SecurityEvent(serde_json::from_value(payload)?),
            Channel::Alert => Self::Alert(serde_json::from_value(payload)?),
            Channel::Metrics => Self::Metrics(serde_json::from_value(payload)?),
            Channel::Traffic => Self::Traffic(serde_json::from_value(payload)?),
        })
    }
}

/// Wire shape before the tag is interpreted.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Message(FeedMessage),
    /// A well-formed envelope with a tag no channel handles.
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("frame is not an envelope: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("invalid `{tag}` payload: {source}")]
    Payload {
        tag: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Parses one text frame.
pub fn decode_envelope(text: &str) -> Result<Decoded, EnvelopeError> {
    let raw: RawEnvelope = serde_json::from_str(text).map_err(EnvelopeError::Malformed)?;
    let Some(channel) = Channel::from_tag(&raw.kind) else {
        return Ok(Decoded::Unknown(raw.kind));
    };
    FeedMessage::decode(channel, raw.payload)
        .map(Decoded::Message)
        .map_err(|source| EnvelopeError::Payload {
            tag: channel.tag(),
            source,
        })
}
