//! Remediation hints for detected issues.

use crate::detect::Issue;

pub const DEFAULT_RECOMMENDATION: &str = "Continue monitoring network performance";

/// Fixed issue-to-remediation mapping.
pub struct RecommendationCatalog;

impl RecommendationCatalog {
    pub fn lookup(issue: Option<Issue>) -> &'static str {
        match issue {
            Some(Issue::HighLatency) => {
                "Check network congestion, optimize routing paths, consider upgrading bandwidth"
            }
            Some(Issue::CriticalPacketLoss) => {
                "Inspect physical connections, check for hardware failures, analyze network traffic"
            }
            Some(Issue::ElevatedLatency) => {
                "Monitor application performance, reduce background processes, check for bandwidth throttling"
            }
            Some(Issue::PacketLoss) => {
                "Check cable connections, verify switch ports, review QoS policies"
            }
            Some(Issue::LowBandwidth) => {
                "Analyze bandwidth usage, implement traffic shaping, consider capacity upgrade"
            }
            Some(Issue::NonFiniteTelemetry) => {
                "Verify the collector for this device, readings contain NaN or infinite values"
            }
            None => DEFAULT_RECOMMENDATION,
        }
    }

    /// Lookup by human label. Unknown labels get the generic text.
    pub fn lookup_label(label: &str) -> &'static str {
        Self::lookup(Issue::from_label(label))
    }
}
