//! Tuning constants for heatmap accumulation and timeline analysis.

use serde::{Deserialize, Serialize};

/// Configuration for the motion accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorConfig {
    /// Multiplier applied to the heatmap before each new delta is added.
    ///
    /// At 30 fps, 0.95 leaves about a fifth of a burst after one second.
    /// Must lie in (0, 1).
    pub decay_rate: f64,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self { decay_rate: 0.95 }
    }
}

impl AccumulatorConfig {
    pub fn with_decay_rate(decay_rate: f64) -> Self {
        Self { decay_rate }
    }

    /// True if the decay rate keeps the heatmap bounded and non-vanishing.
    pub fn is_valid(&self) -> bool {
        self.decay_rate > 0.0 && self.decay_rate < 1.0
    }
}

/// Configuration for timeline sampling and the repetition analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Approximate timeline samples per second of video
    pub samples_per_second: f64,
    /// Fewest samples the frequency analysis accepts
    pub min_frequency_samples: usize,
    /// Fewest samples the regularity analysis accepts
    pub min_regularity_samples: usize,
    /// Percentile a sample must exceed to count as a peak
    pub peak_percentile: f64,
    /// Percentile of timeline intensity a cell must exceed to count as active
    pub active_area_percentile: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            samples_per_second: 10.0,
            min_frequency_samples: 10,
            min_regularity_samples: 20,
            peak_percentile: 75.0,
            active_area_percentile: 75.0,
        }
    }
}

impl AnalysisConfig {
    /// Frames between timeline samples: `max(1, floor(fps / samples_per_second))`.
    pub fn sample_interval(&self, fps: f64) -> u64 {
        let interval = (fps / self.samples_per_second).floor();
        if interval.is_finite() && interval >= 1.0 {
            interval as u64
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_decay() {
        let config = AccumulatorConfig::default();
        assert!((config.decay_rate - 0.95).abs() < f64::EPSILON);
        assert!(config.is_valid());
        assert!(!AccumulatorConfig::with_decay_rate(1.0).is_valid());
        assert!(!AccumulatorConfig::with_decay_rate(0.0).is_valid());
    }

    #[test]
    fn test_sample_interval() {
        let config = AnalysisConfig::default();
        assert_eq!(config.sample_interval(30.0), 3);
        assert_eq!(config.sample_interval(29.97), 2);
        assert_eq!(config.sample_interval(60.0), 6);
        assert_eq!(config.sample_interval(10.0), 1);
        assert_eq!(config.sample_interval(5.0), 1);
    }
}
