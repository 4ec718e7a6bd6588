//! Anomaly detection: rolling per-device history, window statistics,
//! rule-based classification and remediation hints.

pub mod classifier;
pub mod engine;
pub mod journal;
pub mod recommend;
pub mod report;
pub mod stats;
pub mod window;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::engine::AnomalyEngine;

#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("cannot compute statistics over an empty window")]
    EmptyWindow,
    #[error("non-finite value in reading field `{field}`")]
    NonFinite { field: &'static str },
}

/// One sampled snapshot of a device's metrics.
///
/// `latency` is in milliseconds; every other field is a percentage. Ranges
/// are not enforced here, out-of-range values flow through the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub latency: f64,
    pub packet_loss: f64,
    pub bandwidth: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
}

impl Reading {
    /// Reject readings carrying NaN or infinite values.
    pub fn validate(&self) -> Result<(), DetectError> {
        let fields = [
            ("latency", self.latency),
            ("packet_loss", self.packet_loss),
            ("bandwidth", self.bandwidth),
            ("cpu_usage", self.cpu_usage),
            ("memory_usage", self.memory_usage),
        ];
        match fields.into_iter().find(|(_, v)| !v.is_finite()) {
            Some((field, _)) => Err(DetectError::NonFinite { field }),
            None => Ok(()),
        }
    }
}

/// A reading tagged with the device it came from, as collectors submit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub device_id: String,
    pub reading: Reading,
}

/// Severity tiers, ordered by increasing urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Healthy,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Healthy => "healthy",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(Severity::Healthy),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => anyhow::bail!("unknown severity '{}'", other),
        }
    }
}

/// Issue labels the classifier can attach to a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Issue {
    #[serde(rename = "High Latency Detected")]
    HighLatency,
    #[serde(rename = "Critical Packet Loss")]
    CriticalPacketLoss,
    #[serde(rename = "Elevated Latency")]
    ElevatedLatency,
    #[serde(rename = "Packet Loss Detected")]
    PacketLoss,
    #[serde(rename = "Low Bandwidth")]
    LowBandwidth,
    #[serde(rename = "Non-Finite Telemetry")]
    NonFiniteTelemetry,
}

impl Issue {
    pub const ALL: [Issue; 6] = [
        Issue::HighLatency,
        Issue::CriticalPacketLoss,
        Issue::ElevatedLatency,
        Issue::PacketLoss,
        Issue::LowBandwidth,
        Issue::NonFiniteTelemetry,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Issue::HighLatency => "High Latency Detected",
            Issue::CriticalPacketLoss => "Critical Packet Loss",
            Issue::ElevatedLatency => "Elevated Latency",
            Issue::PacketLoss => "Packet Loss Detected",
            Issue::LowBandwidth => "Low Bandwidth",
            Issue::NonFiniteTelemetry => "Non-Finite Telemetry",
        }
    }

    /// Map a human label back to its issue.
    pub fn from_label(label: &str) -> Option<Issue> {
        Issue::ALL.into_iter().find(|i| i.label() == label)
    }

    pub fn severity(&self) -> Severity {
        match self {
            Issue::HighLatency | Issue::CriticalPacketLoss | Issue::NonFiniteTelemetry => {
                Severity::Critical
            }
            Issue::ElevatedLatency | Issue::PacketLoss | Issue::LowBandwidth => Severity::Warning,
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// Result of classifying one reading for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub device_id: String,
    pub severity: Severity,
    pub confidence: u8,
    pub issue: Option<Issue>,
    pub recommendation: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl AnomalyRecord {
    pub fn is_anomaly(&self) -> bool {
        self.severity != Severity::Healthy && self.issue.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> Reading {
        Reading {
            latency: 10.0,
            packet_loss: 0.0,
            bandwidth: 90.0,
            cpu_usage: 5.0,
            memory_usage: 5.0,
        }
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        assert!(reading().validate().is_ok());

        let bad = Reading {
            packet_loss: f64::NAN,
            ..reading()
        };
        assert_eq!(
            bad.validate(),
            Err(DetectError::NonFinite {
                field: "packet_loss"
            })
        );

        let inf = Reading {
            memory_usage: f64::INFINITY,
            ..reading()
        };
        assert!(inf.validate().is_err());
    }

    #[test]
    fn test_missing_field_fails_deserialization() {
        let json = r#"{"latency": 10.0, "packet_loss": 0.0, "bandwidth": 90.0, "cpu_usage": 5.0}"#;
        assert!(serde_json::from_str::<Reading>(json).is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Healthy < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert!("panic".parse::<Severity>().is_err());
    }

    #[test]
    fn test_issue_labels_serialize_as_text() {
        let json = serde_json::to_string(&Issue::LowBandwidth).unwrap();
        assert_eq!(json, "\"Low Bandwidth\"");
        for issue in Issue::ALL {
            assert_eq!(Issue::from_label(issue.label()), Some(issue));
        }
        assert_eq!(Issue::from_label("Gremlins"), None);
    }

    #[test]
    fn test_record_serializes_lowercase_severity() {
        let record = AnomalyRecord {
            device_id: "AP-001".to_string(),
            severity: Severity::Warning,
            confidence: 88,
            issue: Some(Issue::ElevatedLatency),
            recommendation: None,
            timestamp: chrono::Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["issue"], "Elevated Latency");
        assert!(record.is_anomaly());
    }
}
