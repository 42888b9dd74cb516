//! Scenario tests for the motion analysis chain.
//!
//! Frames go through the same steps the session pipeline uses: edge
//! filter, accumulator, timeline, analytics.

#[cfg(test)]
mod motion_scenarios {
    use approx::assert_relative_eq;
    use image::{GrayImage, Luma};
    use mova_models::{AnalyticsRecord, ZoneLabel};

    use crate::edge::{sobel_magnitude, FULL_MASK};
    use crate::motion::{
        dominant_frequency, render, rhythm_regularity, AccumulatorConfig, AnalysisConfig,
        MotionAccumulator, MotionTimeline,
    };

    fn run(
        frames: impl Iterator<Item = GrayImage>,
        width: u32,
        height: u32,
        fps: f64,
    ) -> AnalyticsRecord {
        let mut acc = MotionAccumulator::new(width, height, AccumulatorConfig::default());
        let mut timeline = MotionTimeline::new(fps, AnalysisConfig::default());

        for (index, frame) in frames.enumerate() {
            let edges = sobel_magnitude(&frame, FULL_MASK);
            acc.ingest(&edges).unwrap();
            timeline.observe(index as u64, &acc);

            let rendered = render(acc.heatmap());
            assert_eq!(rendered.dimensions(), (width, height));
        }

        timeline.finish(&acc, None)
    }

    #[test]
    fn test_stationary_scene_has_no_motion() {
        let textured = GrayImage::from_fn(100, 100, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        let record = run(std::iter::repeat(textured).take(300), 100, 100, 30.0);

        assert_eq!(record.total_frames, 300);
        assert_eq!(record.duration_seconds, 10.0);
        assert_eq!(record.timeline.len(), 100);
        assert_eq!(record.zone_timeline.len(), 100);
        assert_eq!(record.intensity.average, 0.0);
        assert_eq!(record.intensity.peak, 0.0);
        assert_eq!(record.intensity.peak_frame, 0);
        assert_eq!(record.repetition.cycle_count, 0);
        assert_eq!(record.repetition.dominant_frequency_hz, None);
        assert_eq!(record.repetition.cycles_per_minute, None);
        assert_eq!(record.repetition.rhythm_regularity, None);
        assert_eq!(record.active_area_percent, 0.0);
        assert!(record.hot_zones.iter().all(|(_, share)| share == 0.0));
    }

    #[test]
    fn test_clean_oscillation_sampled_at_ten_hz() {
        let samples: Vec<f64> = (0..100)
            .map(|i| 20.0 + 5.0 * (2.0 * std::f64::consts::PI * i as f64 / 10.0).cos())
            .collect();

        let dominant = dominant_frequency(&samples, 10.0, 10).unwrap();
        assert_relative_eq!(dominant.hz, 1.0, epsilon = 0.1);

        let rhythm = rhythm_regularity(&samples, 75.0, 20);
        assert!(rhythm.regularity.unwrap() > 0.95);
        assert!(rhythm.peak_count >= 8);
    }

    #[test]
    fn test_blinking_square_is_periodic_and_central() {
        // A bright square toggles every 15 frames at 30 fps: a motion burst
        // every half second.
        let (width, height) = (60u32, 60u32);
        let on = GrayImage::from_fn(width, height, |x, y| {
            if (20..40).contains(&x) && (20..40).contains(&y) {
                Luma([200])
            } else {
                Luma([0])
            }
        });
        let off = GrayImage::new(width, height);
        let frames = (0..300).map(|i| if (i / 15) % 2 == 0 { on.clone() } else { off.clone() });

        let record = run(frames, width, height, 30.0);

        let hz = record.repetition.dominant_frequency_hz.unwrap();
        assert_relative_eq!(hz, 2.0, epsilon = 0.1);
        assert_relative_eq!(record.repetition.cycles_per_minute.unwrap(), 120.0, epsilon = 6.0);
        // Early bursts sit below the 75th percentile until the heat builds up.
        assert!((15..=19).contains(&record.repetition.cycle_count));
        assert!(record.repetition.rhythm_regularity.unwrap() >= 0.9);

        assert_eq!(record.hot_zones.hottest(), Some(ZoneLabel::Mc));
        assert_relative_eq!(record.hot_zones.total(), 100.0, epsilon = 0.5);
        assert!(record.active_area_percent > 0.0);
        assert!(record.intensity.peak >= record.intensity.average);
        assert_eq!(record.intensity.peak_frame % 15, 0);
    }
}
