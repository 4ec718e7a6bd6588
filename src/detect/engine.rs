use crate::config::{ClassifierConfig, EngineConfig, NetvigilConfig};
use crate::detect::classifier::{Baseline, Classifier};
use crate::detect::recommend::RecommendationCatalog;
use crate::detect::stats::WindowStatistics;
use crate::detect::window::RollingWindow;
use crate::detect::{AnomalyRecord, Reading, Severity};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

type DeviceHistory = Arc<Mutex<RollingWindow>>;

/// Streaming per-device anomaly detector.
///
/// Each device identity gets its own lazily created history behind its own
/// lock, so classifications for different devices never contend. Calls for
/// the same device are serialized on that device's lock.
pub struct AnomalyEngine {
    histories: DashMap<String, DeviceHistory>,
    config: EngineConfig,
    classifier: Classifier,
}

impl Default for AnomalyEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), ClassifierConfig::default())
    }
}

impl AnomalyEngine {
    pub fn new(config: EngineConfig, classifier: ClassifierConfig) -> Self {
        Self {
            histories: DashMap::new(),
            config,
            classifier: Classifier::new(classifier),
        }
    }

    pub fn from_config(config: &NetvigilConfig) -> Self {
        Self::new(config.engine.clone(), config.classifier.clone())
    }

    /// Record `reading` in the device's history and classify it against the
    /// recent window.
    ///
    /// Readings with non-finite values are flagged critical and are not
    /// added to the history.
    pub fn classify(&self, device_id: &str, reading: Reading) -> AnomalyRecord {
        let classification = if let Err(e) = reading.validate() {
            warn!(device_id, error = %e, "rejecting reading from history");
            self.classifier.non_finite()
        } else {
            // Append and snapshot under one lock; the math runs on the copy.
            let snapshot = {
                let history = self.history(device_id);
                let mut window = history.lock();
                window.append(reading);
                window.snapshot(self.config.window)
            };

            let baseline = if snapshot.len() < self.config.min_samples {
                Baseline::InsufficientHistory
            } else {
                WindowStatistics::compute(&snapshot)
                    .map(Baseline::Window)
                    .unwrap_or(Baseline::InsufficientHistory)
            };
            self.classifier.classify(&reading, &baseline)
        };

        let recommendation = classification
            .issue
            .map(|issue| RecommendationCatalog::lookup(Some(issue)).to_string());

        match classification.severity {
            Severity::Critical => warn!(
                device_id,
                issue = ?classification.issue,
                confidence = classification.confidence,
                latency = reading.latency,
                packet_loss = reading.packet_loss,
                "critical anomaly"
            ),
            Severity::Warning => info!(
                device_id,
                issue = ?classification.issue,
                confidence = classification.confidence,
                "warning anomaly"
            ),
            Severity::Healthy => debug!(device_id, "reading healthy"),
        }

        AnomalyRecord {
            device_id: device_id.to_string(),
            severity: classification.severity,
            confidence: classification.confidence,
            issue: classification.issue,
            recommendation,
            timestamp: chrono::Utc::now(),
        }
    }

    fn history(&self, device_id: &str) -> DeviceHistory {
        if let Some(existing) = self.histories.get(device_id) {
            return Arc::clone(existing.value());
        }
        let capacity = self.config.capacity;
        let entry = self
            .histories
            .entry(device_id.to_string())
            .or_insert_with(|| {
                debug!(device_id, capacity, "tracking new device");
                Arc::new(Mutex::new(RollingWindow::new(capacity)))
            });
        Arc::clone(entry.value())
    }

    pub fn device_count(&self) -> usize {
        self.histories.len()
    }

    /// Number of readings retained for `device_id`, if the device is known.
    pub fn history_len(&self, device_id: &str) -> Option<usize> {
        self.histories
            .get(device_id)
            .map(|history| history.value().lock().len())
    }

    /// Known device identities, sorted.
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.histories.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// History sizing the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
