//! Motion heatmap accumulation and analytics.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ Edge frames  │───►│ Accumulator  │───►│ render()     │───► frame sink
//! │ (gray, u8)   │    │ heat/lifetime│    │ (inferno)    │
//! └──────────────┘    └──────────────┘    └──────────────┘
//!                            │
//!                            ▼
//!                     ┌──────────────┐    ┌──────────────┐
//!                     │ Timeline     │───►│ Periodicity  │
//!                     │ (sampled)    │    │ Regularity   │
//!                     └──────────────┘    │ Hot zones    │
//!                                         └──────────────┘
//!                                                │
//!                                                ▼
//!                                         AnalyticsRecord
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use mova_media::motion::{render, AccumulatorConfig, AnalysisConfig, MotionAccumulator, MotionTimeline};
//!
//! let mut acc = MotionAccumulator::new(width, height, AccumulatorConfig::default());
//! let mut timeline = MotionTimeline::new(fps, AnalysisConfig::default());
//!
//! for (index, edges) in edge_frames.enumerate() {
//!     acc.ingest(&edges)?;
//!     timeline.observe(index as u64, &acc);
//!     sink.write_frame(&render(acc.heatmap()))?;
//! }
//!
//! let analytics = timeline.finish(&acc, None);
//! ```

mod accumulator;
mod config;
mod periodicity;
mod render;
mod timeline;
mod zones;

pub use accumulator::MotionAccumulator;
pub use config::{AccumulatorConfig, AnalysisConfig};
pub use periodicity::{
    dominant_frequency, percentile_linear, rhythm_regularity, DominantFrequency, RhythmAnalysis,
};
pub use render::{inferno_table, normalize, render};
pub use timeline::MotionTimeline;
pub use zones::zones;
