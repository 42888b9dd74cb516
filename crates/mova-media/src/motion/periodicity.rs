//! Repetition analysis over the sampled intensity timeline.
//!
//! Both analyses report "undetermined" as `None`; too few samples or a
//! signal without structure is an expected outcome, not an error.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Magnitudes at or below this are treated as an empty spectrum.
const SPECTRUM_FLOOR: f64 = 1e-9;

/// Strongest non-DC component of a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominantFrequency {
    /// Frequency in Hz
    pub hz: f64,
    /// Spectral magnitude of that bin
    pub magnitude: f64,
}

impl DominantFrequency {
    pub fn cycles_per_minute(&self) -> f64 {
        self.hz * 60.0
    }
}

/// Peak-interval regularity of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RhythmAnalysis {
    /// `1 - std/mean` of peak intervals in [0, 1]; `None` when undetermined
    pub regularity: Option<f64>,
    /// Interior peaks above the percentile threshold
    pub peak_count: usize,
}

/// Dominant frequency of `samples` taken at `sample_rate` Hz.
///
/// The mean is removed and the zero-frequency bin ignored, so a constant
/// offset never wins. `None` with fewer than `min_samples` samples, for a
/// flat signal, or when the winning bin is at zero frequency.
pub fn dominant_frequency(
    samples: &[f64],
    sample_rate: f64,
    min_samples: usize,
) -> Option<DominantFrequency> {
    let n = samples.len();
    if n < min_samples.max(2) || !(sample_rate > 0.0) {
        return None;
    }

    let mean = samples.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex<f64>> = samples
        .iter()
        .map(|&v| Complex::new(v - mean, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(n).process(&mut buffer);

    // Non-negative frequencies only; bin 0 (DC) is skipped.
    let bins = n / 2 + 1;
    let mut best: Option<(usize, f64)> = None;
    for (k, value) in buffer.iter().enumerate().take(bins).skip(1) {
        let magnitude = value.norm();
        if best.map_or(true, |(_, m)| magnitude > m) {
            best = Some((k, magnitude));
        }
    }

    let (k, magnitude) = best?;
    let hz = k as f64 * sample_rate / n as f64;
    if magnitude <= SPECTRUM_FLOOR || hz <= 0.0 {
        return None;
    }

    Some(DominantFrequency { hz, magnitude })
}

/// Regularity of the spacing between peaks of `samples`.
///
/// A peak is an interior sample strictly above both neighbours and
/// strictly above the `percentile`-th percentile of all samples.
/// Regularity is `1 - std(intervals) / mean(intervals)` clamped to [0, 1];
/// it is `None` with fewer than `min_samples` samples or fewer than two
/// peaks. The peak count is reported whenever the sample minimum is met.
pub fn rhythm_regularity(samples: &[f64], percentile: f64, min_samples: usize) -> RhythmAnalysis {
    if samples.len() < min_samples.max(3) {
        return RhythmAnalysis::default();
    }

    let Some(threshold) = percentile_linear(samples, percentile) else {
        return RhythmAnalysis::default();
    };

    let peaks: Vec<usize> = (1..samples.len() - 1)
        .filter(|&i| {
            let v = samples[i];
            v > threshold && v > samples[i - 1] && v > samples[i + 1]
        })
        .collect();

    let peak_count = peaks.len();
    if peak_count < 2 {
        return RhythmAnalysis {
            regularity: None,
            peak_count,
        };
    }

    let intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let variance =
        intervals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / intervals.len() as f64;
    let regularity = (1.0 - variance.sqrt() / mean).clamp(0.0, 1.0);

    RhythmAnalysis {
        regularity: Some(regularity),
        peak_count,
    }
}

/// Percentile with linear interpolation between closest ranks.
///
/// `percentile` is in [0, 100]; `None` for an empty slice.
pub fn percentile_linear(values: &[f64], percentile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = percentile.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let fraction = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * fraction)
}
