//! Ordered threshold rules mapping a reading to a severity tier.

use crate::config::ClassifierConfig;
use crate::detect::stats::WindowStatistics;
use crate::detect::{Issue, Reading, Severity};

/// Outcome of evaluating one reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub severity: Severity,
    pub confidence: u8,
    pub issue: Option<Issue>,
}

/// What the reading is compared against.
#[derive(Debug, Clone, Copy)]
pub enum Baseline {
    /// Too few samples in the window for statistics to mean anything.
    InsufficientHistory,
    Window(WindowStatistics),
}

type Predicate = fn(&Reading, &WindowStatistics, &ClassifierConfig) -> bool;

/// Evaluated top to bottom; the first match wins.
const RULES: [(Issue, Predicate); 5] = [
    (Issue::HighLatency, high_latency),
    (Issue::CriticalPacketLoss, critical_packet_loss),
    (Issue::ElevatedLatency, elevated_latency),
    (Issue::PacketLoss, packet_loss),
    (Issue::LowBandwidth, low_bandwidth),
];

fn high_latency(r: &Reading, s: &WindowStatistics, c: &ClassifierConfig) -> bool {
    r.latency > s.mean_latency + c.latency_critical_sigma * s.std_latency
        || r.latency > c.latency_critical_ms
}

fn critical_packet_loss(r: &Reading, s: &WindowStatistics, c: &ClassifierConfig) -> bool {
    r.packet_loss > s.mean_packet_loss + c.packet_loss_critical_margin
        || r.packet_loss > c.packet_loss_critical_pct
}

fn elevated_latency(r: &Reading, s: &WindowStatistics, c: &ClassifierConfig) -> bool {
    r.latency > s.mean_latency + c.latency_warning_sigma * s.std_latency
        || r.latency > c.latency_warning_ms
}

fn packet_loss(r: &Reading, s: &WindowStatistics, c: &ClassifierConfig) -> bool {
    r.packet_loss > s.mean_packet_loss + c.packet_loss_warning_margin
        || r.packet_loss > c.packet_loss_warning_pct
}

fn low_bandwidth(r: &Reading, s: &WindowStatistics, c: &ClassifierConfig) -> bool {
    r.bandwidth < s.mean_bandwidth - c.bandwidth_drop_margin
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, reading: &Reading, baseline: &Baseline) -> Classification {
        let stats = match baseline {
            Baseline::InsufficientHistory => {
                return Classification {
                    severity: Severity::Healthy,
                    confidence: self.config.confidence.insufficient_history.min(100),
                    issue: None,
                };
            }
            Baseline::Window(stats) => stats,
        };

        RULES
            .iter()
            .find(|(_, fires)| fires(reading, stats, &self.config))
            .map(|&(issue, _)| self.flag(issue))
            .unwrap_or(Classification {
                severity: Severity::Healthy,
                confidence: self.config.confidence.healthy.min(100),
                issue: None,
            })
    }

    /// Classification for a reading whose values cannot be evaluated.
    pub fn non_finite(&self) -> Classification {
        self.flag(Issue::NonFiniteTelemetry)
    }

    fn flag(&self, issue: Issue) -> Classification {
        Classification {
            severity: issue.severity(),
            confidence: self.config.confidence.for_issue(issue),
            issue: Some(issue),
        }
    }
}
