//! Batch summaries for dashboards and CLI output.

use crate::detect::{AnomalyRecord, Reading, Severity};
use serde::Serialize;

/// Per-tier totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Healthy => self.healthy += 1,
            Severity::Warning => self.warning += 1,
            Severity::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.healthy + self.warning + self.critical
    }
}

/// One device's entry in a poll cycle: the classification next to the
/// metrics it was made from. Both serialize flat, so a dashboard row reads
/// `device_id`, `severity`, `confidence`, `latency`, `packet_loss` and so on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatus {
    #[serde(flatten)]
    pub record: AnomalyRecord,
    #[serde(flatten)]
    pub reading: Reading,
}

/// Every device from one poll cycle, the records that are anomalies, and the
/// tier counts.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub devices: Vec<DeviceStatus>,
    pub anomalies: Vec<AnomalyRecord>,
    pub stats: SeverityCounts,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl MonitorReport {
    pub fn from_statuses(devices: Vec<DeviceStatus>) -> Self {
        let mut stats = SeverityCounts::default();
        for status in &devices {
            stats.add(status.record.severity);
        }
        let anomalies = devices
            .iter()
            .filter(|s| s.record.is_anomaly())
            .map(|s| s.record.clone())
            .collect();
        Self {
            devices,
            anomalies,
            stats,
            timestamp: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Issue;

    fn status(device_id: &str, severity: Severity, issue: Option<Issue>) -> DeviceStatus {
        DeviceStatus {
            record: AnomalyRecord {
                device_id: device_id.to_string(),
                severity,
                confidence: 90,
                issue,
                recommendation: None,
                timestamp: chrono::Utc::now(),
            },
            reading: Reading {
                latency: 21.5,
                packet_loss: 0.4,
                bandwidth: 78.0,
                cpu_usage: 33.0,
                memory_usage: 61.0,
            },
        }
    }

    #[test]
    fn test_counts_and_anomaly_list() {
        let report = MonitorReport::from_statuses(vec![
            status("AP-001", Severity::Healthy, None),
            status("SW-002", Severity::Critical, Some(Issue::HighLatency)),
            status("WAN-003", Severity::Warning, Some(Issue::LowBandwidth)),
            status("AP-004", Severity::Healthy, None),
        ]);

        assert_eq!(
            report.stats,
            SeverityCounts {
                healthy: 2,
                warning: 1,
                critical: 1
            }
        );
        assert_eq!(report.stats.total(), 4);
        let ids: Vec<_> = report.anomalies.iter().map(|r| r.device_id.as_str()).collect();
        assert_eq!(ids, vec!["SW-002", "WAN-003"]);
    }

    #[test]
    fn test_device_entry_carries_metrics() {
        let value = serde_json::to_value(status("SW-002", Severity::Critical, Some(Issue::HighLatency)))
            .unwrap();
        assert_eq!(value["device_id"], "SW-002");
        assert_eq!(value["severity"], "critical");
        assert_eq!(value["confidence"], 90);
        assert_eq!(value["latency"], 21.5);
        assert_eq!(value["packet_loss"], 0.4);
        assert_eq!(value["bandwidth"], 78.0);
        assert_eq!(value["cpu_usage"], 33.0);
        assert_eq!(value["memory_usage"], 61.0);
    }

    #[test]
    fn test_empty_batch() {
        let report = MonitorReport::from_statuses(Vec::new());
        assert_eq!(report.stats.total(), 0);
        assert!(report.anomalies.is_empty());
    }
}
