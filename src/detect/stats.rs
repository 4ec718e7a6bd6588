use crate::detect::{DetectError, Reading};

/// A simple time series for statistical analysis.
pub struct TimeSeries {
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population variance (divides by N, not N - 1).
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq_diff: f64 = self
            .values
            .iter()
            .map(|&x| (x - mean).powi(2))
            .sum();
        sum_sq_diff / self.values.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

/// Aggregates over the recent sub-window of one device's history.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct WindowStatistics {
    pub mean_latency: f64,
    pub std_latency: f64,
    pub mean_packet_loss: f64,
    pub std_packet_loss: f64,
    pub mean_bandwidth: f64,
    pub std_bandwidth: f64,
    pub sample_count: usize,
}

impl WindowStatistics {
    /// Compute mean and population std dev for latency, packet loss and
    /// bandwidth over `readings`.
    pub fn compute(readings: &[Reading]) -> Result<Self, DetectError> {
        if readings.is_empty() {
            return Err(DetectError::EmptyWindow);
        }

        let series = |f: fn(&Reading) -> f64| TimeSeries::new(readings.iter().map(f).collect());
        let latency = series(|r| r.latency);
        let packet_loss = series(|r| r.packet_loss);
        let bandwidth = series(|r| r.bandwidth);

        Ok(Self {
            mean_latency: latency.mean(),
            std_latency: latency.std_dev(),
            mean_packet_loss: packet_loss.mean(),
            std_packet_loss: packet_loss.std_dev(),
            mean_bandwidth: bandwidth.mean(),
            std_bandwidth: bandwidth.std_dev(),
            sample_count: readings.len(),
        })
    }
}
