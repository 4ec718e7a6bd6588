//! TOML configuration for netvigil.
//!
//! Every table is optional; missing keys fall back to compiled-in defaults.
//! The config file is located via an explicit path, the `NETVIGIL_CONFIG`
//! environment variable, or the standard system location.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::detect::Issue;

const SYSTEM_CONFIG_PATH: &str = "/etc/netvigil/netvigil.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the netvigil process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetvigilConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetvigilConfig {
    /// Load and validate configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded netvigil configuration");
        Ok(config)
    }

    /// Resolve configuration, in order:
    /// 1. `explicit`, if given. Errors here are fatal.
    /// 2. The path in the `NETVIGIL_CONFIG` environment variable.
    /// 3. `/etc/netvigil/netvigil.toml`.
    /// 4. Compiled-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var("NETVIGIL_CONFIG") {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "NETVIGIL_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.classifier.validate()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address and port for the HTTP API listener.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// History sizing for the anomaly engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Readings retained per device.
    pub capacity: usize,
    /// Most recent readings the statistics are computed over.
    pub window: usize,
    /// Minimum readings in the window before statistics are trusted.
    pub min_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            window: 30,
            min_samples: 10,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.capacity > 0, "engine.capacity must be positive");
        ensure!(self.window > 0, "engine.window must be positive");
        ensure!(
            self.window <= self.capacity,
            "engine.window ({}) exceeds engine.capacity ({})",
            self.window,
            self.capacity
        );
        ensure!(self.min_samples > 0, "engine.min_samples must be positive");
        ensure!(
            self.min_samples <= self.window,
            "engine.min_samples ({}) exceeds engine.window ({})",
            self.min_samples,
            self.window
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Thresholds and confidence scores for the classification rules.
///
/// Latency values are milliseconds; packet loss and bandwidth values are
/// percentage points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub latency_critical_ms: f64,
    pub latency_critical_sigma: f64,
    pub latency_warning_ms: f64,
    pub latency_warning_sigma: f64,
    pub packet_loss_critical_pct: f64,
    pub packet_loss_critical_margin: f64,
    pub packet_loss_warning_pct: f64,
    pub packet_loss_warning_margin: f64,
    /// Drop below the windowed mean bandwidth that raises a warning.
    pub bandwidth_drop_margin: f64,
    pub confidence: ConfidenceConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            latency_critical_ms: 70.0,
            latency_critical_sigma: 2.0,
            latency_warning_ms: 40.0,
            latency_warning_sigma: 1.0,
            packet_loss_critical_pct: 3.0,
            packet_loss_critical_margin: 2.0,
            packet_loss_warning_pct: 1.5,
            packet_loss_warning_margin: 1.0,
            bandwidth_drop_margin: 20.0,
            confidence: ConfidenceConfig::default(),
        }
    }
}

impl ClassifierConfig {
    /// Reject NaN and infinite thresholds. A non-finite threshold makes its
    /// comparison always false and silently disables the rule.
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("latency_critical_ms", self.latency_critical_ms),
            ("latency_critical_sigma", self.latency_critical_sigma),
            ("latency_warning_ms", self.latency_warning_ms),
            ("latency_warning_sigma", self.latency_warning_sigma),
            ("packet_loss_critical_pct", self.packet_loss_critical_pct),
            ("packet_loss_critical_margin", self.packet_loss_critical_margin),
            ("packet_loss_warning_pct", self.packet_loss_warning_pct),
            ("packet_loss_warning_margin", self.packet_loss_warning_margin),
            ("bandwidth_drop_margin", self.bandwidth_drop_margin),
        ];
        for (name, value) in thresholds {
            ensure!(
                value.is_finite(),
                "classifier.{} must be finite, got {}",
                name,
                value
            );
        }
        Ok(())
    }
}

/// Fixed heuristic confidence attached to each outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub insufficient_history: u8,
    pub healthy: u8,
    pub high_latency: u8,
    pub critical_packet_loss: u8,
    pub elevated_latency: u8,
    pub packet_loss: u8,
    pub low_bandwidth: u8,
    pub non_finite: u8,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            insufficient_history: 85,
            healthy: 95,
            high_latency: 98,
            critical_packet_loss: 97,
            elevated_latency: 88,
            packet_loss: 85,
            low_bandwidth: 82,
            non_finite: 99,
        }
    }
}

impl ConfidenceConfig {
    pub fn for_issue(&self, issue: Issue) -> u8 {
        let score = match issue {
            Issue::HighLatency => self.high_latency,
            Issue::CriticalPacketLoss => self.critical_packet_loss,
            Issue::ElevatedLatency => self.elevated_latency,
            Issue::PacketLoss => self.packet_loss,
            Issue::LowBandwidth => self.low_bandwidth,
            Issue::NonFiniteTelemetry => self.non_finite,
        };
        score.min(100)
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Anomaly journal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Whether non-healthy records are written to SQLite.
    pub journal_enabled: bool,
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            journal_enabled: true,
            db_path: PathBuf::from("data/netvigil.db"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = NetvigilConfig::default();
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.engine.capacity, 100);
        assert_eq!(cfg.engine.window, 30);
        assert_eq!(cfg.engine.min_samples, 10);
        assert_eq!(cfg.classifier.latency_critical_ms, 70.0);
        assert_eq!(cfg.classifier.confidence.high_latency, 98);
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[engine]
window = 20

[classifier]
latency_critical_ms = 120.0

[classifier.confidence]
low_bandwidth = 70

[logging]
format = "json"
"#;

        let cfg: NetvigilConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.engine.window, 20);
        assert_eq!(cfg.classifier.latency_critical_ms, 120.0);
        assert_eq!(cfg.classifier.confidence.low_bandwidth, 70);
        assert_eq!(cfg.logging.format, LogFormat::Json);

        // Everything else should be defaults.
        assert_eq!(cfg.engine.capacity, 100);
        assert_eq!(cfg.classifier.latency_warning_ms, 40.0);
        assert_eq!(cfg.classifier.confidence.high_latency, 98);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let cfg: NetvigilConfig = toml::from_str("").unwrap();
        let defaults = NetvigilConfig::default();

        assert_eq!(cfg.server.bind, defaults.server.bind);
        assert_eq!(cfg.engine.capacity, defaults.engine.capacity);
        assert_eq!(cfg.storage.db_path, defaults.storage.db_path);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("netvigil.toml");
        std::fs::write(
            &path,
            r#"
[server]
bind = "127.0.0.1:9999"
"#,
        )
        .unwrap();

        let cfg = NetvigilConfig::load(&path).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:9999");
    }

    #[test]
    fn test_load_rejects_invalid_window() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("netvigil.toml");
        std::fs::write(
            &path,
            r#"
[engine]
capacity = 10
window = 30
"#,
        )
        .unwrap();

        assert!(NetvigilConfig::load(&path).is_err());
    }

    #[test]
    fn test_engine_validation() {
        let mut engine = EngineConfig::default();
        engine.min_samples = 0;
        assert!(engine.validate().is_err());

        engine.min_samples = 31;
        assert!(engine.validate().is_err());

        engine = EngineConfig {
            capacity: 0,
            ..EngineConfig::default()
        };
        assert!(engine.validate().is_err());
    }

    #[test]
    fn test_load_rejects_non_finite_threshold() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("netvigil.toml");
        std::fs::write(
            &path,
            r#"
[classifier]
latency_critical_ms = nan
"#,
        )
        .unwrap();

        let err = NetvigilConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("classifier.latency_critical_ms"));

        let cfg: NetvigilConfig = toml::from_str("[classifier]\nbandwidth_drop_margin = inf\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_explicit_missing_file_errors() {
        let result = NetvigilConfig::resolve(Some(Path::new("/nonexistent/netvigil.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_confidence_clamped() {
        let confidence = ConfidenceConfig {
            high_latency: 250,
            ..ConfidenceConfig::default()
        };
        assert_eq!(confidence.for_issue(Issue::HighLatency), 100);
        assert_eq!(confidence.for_issue(Issue::LowBandwidth), 82);
    }
}
