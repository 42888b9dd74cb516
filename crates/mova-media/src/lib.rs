#![deny(unreachable_patterns)]
//! Frame I/O and motion analysis for movement sessions.
//!
//! This crate provides:
//! - Frame source/sink capabilities backed by FFmpeg raw pipes
//! - FFprobe stream information with frame rate and count fallbacks
//! - Host-side Sobel edge filtering and resampling
//! - The decaying motion heatmap, its repetition and hot-zone analytics,
//!   and the inferno heatmap renderer
//! - Atomic writes for session records

pub mod command;
pub mod edge;
pub mod error;
pub mod frame_io;
pub mod fs_utils;
pub mod motion;
pub mod probe;

#[cfg(test)]
mod tests;

pub use command::FfmpegCommand;
pub use edge::{resize_gray, sobel_magnitude, FULL_MASK};
pub use error::{MediaError, MediaResult};
pub use frame_io::{EncoderSettings, FfmpegIo, FrameIo, FrameSink, FrameSource};
pub use fs_utils::{is_nonempty_file, remove_if_exists, write_atomic, write_json_atomic};
pub use probe::{probe_video, sanitize_fps, StreamInfo, DEFAULT_FPS, MAX_FPS};

pub use image::{GrayImage, RgbImage};
