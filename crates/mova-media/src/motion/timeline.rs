//! Per-session intensity timeline and the final analytics record.

use mova_models::{
    round_dp, AnalyticsRecord, IntensitySummary, RepetitionSummary, Resolution, TimelineSample,
    ZoneTimelineEntry,
};
use tracing::debug;

use super::accumulator::MotionAccumulator;
use super::config::AnalysisConfig;
use super::periodicity::{dominant_frequency, percentile_linear, rhythm_regularity};
use super::zones::zones;

/// Collects sampled intensity and zone snapshots while frames stream by,
/// then derives the analytics record.
#[derive(Debug, Clone)]
pub struct MotionTimeline {
    config: AnalysisConfig,
    fps: f64,
    sample_interval: u64,
    timeline: Vec<TimelineSample>,
    zone_timeline: Vec<ZoneTimelineEntry>,
    peak: f64,
    peak_frame: u64,
    frames: u64,
}

impl MotionTimeline {
    /// `fps` must already be sanitized (positive, finite).
    pub fn new(fps: f64, config: AnalysisConfig) -> Self {
        Self {
            sample_interval: config.sample_interval(fps),
            config,
            fps,
            timeline: Vec::new(),
            zone_timeline: Vec::new(),
            peak: 0.0,
            peak_frame: 0,
            frames: 0,
        }
    }

    /// Frames between samples.
    pub fn sample_interval(&self) -> u64 {
        self.sample_interval
    }

    /// Timeline samples per second of video.
    pub fn sample_rate(&self) -> f64 {
        self.fps / self.sample_interval as f64
    }

    /// Record the accumulator state right after frame `frame_index` was
    /// ingested. Frames must be observed in order.
    pub fn observe(&mut self, frame_index: u64, accumulator: &MotionAccumulator) {
        let intensity = accumulator.current_intensity();

        if frame_index % self.sample_interval == 0 {
            let time = round_dp(frame_index as f64 / self.fps, 2);
            self.timeline.push(TimelineSample {
                frame: frame_index,
                time,
                intensity: round_dp(intensity, 2),
            });
            self.zone_timeline.push(ZoneTimelineEntry {
                time,
                zones: zones(accumulator.heatmap()),
            });
        }

        if intensity > self.peak {
            self.peak = intensity;
            self.peak_frame = frame_index;
        }

        self.frames = self.frames.max(frame_index + 1);
    }

    /// Frames observed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn timeline(&self) -> &[TimelineSample] {
        &self.timeline
    }

    /// Run the repetition and zone analyses and assemble the record.
    pub fn finish(
        self,
        accumulator: &MotionAccumulator,
        device_resolution: Option<Resolution>,
    ) -> AnalyticsRecord {
        let values: Vec<f64> = self.timeline.iter().map(|s| s.intensity).collect();

        let dominant = dominant_frequency(
            &values,
            self.sample_rate(),
            self.config.min_frequency_samples,
        );
        let rhythm = rhythm_regularity(
            &values,
            self.config.peak_percentile,
            self.config.min_regularity_samples,
        );

        let average = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };

        let threshold = percentile_linear(&values, self.config.active_area_percentile).unwrap_or(0.0);
        let lifetime = accumulator.lifetime();
        let active_area = if lifetime.is_empty() {
            0.0
        } else {
            let active = lifetime.iter().filter(|&&v| v > threshold).count();
            active as f64 / lifetime.len() as f64 * 100.0
        };

        debug!(
            samples = values.len(),
            dominant_hz = dominant.map(|d| d.hz),
            peaks = rhythm.peak_count,
            "Timeline analysis complete"
        );

        let (width, height) = accumulator.dimensions();

        AnalyticsRecord {
            duration_seconds: round_dp(self.frames as f64 / self.fps, 2),
            total_frames: self.frames,
            fps: round_dp(self.fps, 2),
            resolution: Resolution::new(width, height),
            device_resolution,
            intensity: IntensitySummary {
                average: round_dp(average, 2),
                peak: round_dp(self.peak, 2),
                peak_time: round_dp(self.peak_frame as f64 / self.fps, 2),
                peak_frame: self.peak_frame,
            },
            repetition: RepetitionSummary {
                dominant_frequency_hz: dominant.map(|d| round_dp(d.hz, 3)),
                cycles_per_minute: dominant.map(|d| round_dp(d.cycles_per_minute(), 1)),
                cycle_count: rhythm.peak_count,
                rhythm_regularity: rhythm.regularity.map(|r| round_dp(r, 2)),
            },
            hot_zones: zones(lifetime),
            active_area_percent: round_dp(active_area, 1),
            timeline: self.timeline,
            zone_timeline: self.zone_timeline,
        }
    }
}
