//! Analytics record written once per completed session (`analytics.json`).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::zone::ZoneSnapshot;

/// Round to a fixed number of decimal places.
pub fn round_dp(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// One sampled point of the intensity timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineSample {
    /// Frame index the sample was taken at
    pub frame: u64,
    /// Elapsed seconds (2 dp)
    pub time: f64,
    /// Mean heatmap energy (2 dp)
    pub intensity: f64,
}

/// Zone distribution of the decaying heatmap at a sampled instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ZoneTimelineEntry {
    pub time: f64,
    pub zones: ZoneSnapshot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntensitySummary {
    pub average: f64,
    pub peak: f64,
    pub peak_time: f64,
    pub peak_frame: u64,
}

/// Repetition metrics; `None` serializes as `null` for undetermined values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RepetitionSummary {
    pub dominant_frequency_hz: Option<f64>,
    pub cycles_per_minute: Option<f64>,
    pub cycle_count: usize,
    pub rhythm_regularity: Option<f64>,
}

/// Full analytics output for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyticsRecord {
    pub duration_seconds: f64,
    pub total_frames: u64,
    pub fps: f64,
    pub resolution: Resolution,
    /// Resolution frames were exchanged at when an external device did the
    /// edge filtering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_resolution: Option<Resolution>,
    pub intensity: IntensitySummary,
    pub repetition: RepetitionSummary,
    pub hot_zones: ZoneSnapshot,
    pub active_area_percent: f64,
    pub timeline: Vec<TimelineSample>,
    pub zone_timeline: Vec<ZoneTimelineEntry>,
}

impl AnalyticsRecord {
    /// Intensity values of the timeline, in temporal order.
    pub fn intensity_values(&self) -> Vec<f64> {
        self.timeline.iter().map(|s| s.intensity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_dp() {
        assert_relative_eq!(round_dp(1.23456, 2), 1.23);
        assert_relative_eq!(round_dp(1.0049, 3), 1.005);
        assert_relative_eq!(round_dp(59.96, 1), 60.0);
    }

    #[test]
    fn test_undetermined_repetition_serializes_as_null() {
        let repetition = RepetitionSummary::default();
        let value = serde_json::to_value(repetition).unwrap();
        assert!(value["dominant_frequency_hz"].is_null());
        assert!(value["cycles_per_minute"].is_null());
        assert!(value["rhythm_regularity"].is_null());
        assert_eq!(value["cycle_count"], 0);
    }

    #[test]
    fn test_device_resolution_omitted_when_absent() {
        let record = AnalyticsRecord {
            duration_seconds: 1.0,
            total_frames: 30,
            fps: 30.0,
            resolution: Resolution::new(100, 100),
            device_resolution: None,
            intensity: IntensitySummary::default(),
            repetition: RepetitionSummary::default(),
            hot_zones: ZoneSnapshot::default(),
            active_area_percent: 0.0,
            timeline: vec![TimelineSample { frame: 0, time: 0.0, intensity: 0.0 }],
            zone_timeline: Vec::new(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("device_resolution").is_none());
        assert_eq!(value["resolution"]["width"], 100);
        assert_eq!(record.intensity_values(), vec![0.0]);
    }
}
