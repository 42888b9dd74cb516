//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use mova_link::config::{DEFAULT_BAUD_RATE, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};
use mova_link::LinkConfig;
use mova_media::motion::{AccumulatorConfig, AnalysisConfig};
use mova_media::{EncoderSettings, FULL_MASK};

use crate::error::{WorkerError, WorkerResult};

/// Where edge frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeMode {
    /// Sobel filter on the host at source resolution
    #[default]
    Software,
    /// Round trip through the external device over the serial link
    Device,
}

impl EdgeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeMode::Software => "software",
            EdgeMode::Device => "device",
        }
    }
}

impl FromStr for EdgeMode {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "software" | "sw" | "host" => Ok(EdgeMode::Software),
            "device" | "serial" => Ok(EdgeMode::Device),
            other => Err(WorkerError::config_error(format!(
                "unknown edge mode '{other}' (expected 'software' or 'device')"
            ))),
        }
    }
}

impl std::fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root directory holding one subdirectory per session
    pub sessions_dir: PathBuf,
    /// Sleep between scans of the sessions directory
    pub poll_interval: Duration,
    /// Edge computation mode
    pub edge_mode: EdgeMode,
    /// Serial device path (device mode only)
    pub serial_port: Option<PathBuf>,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Frame width exchanged with the device
    pub device_width: u32,
    /// Frame height exchanged with the device
    pub device_height: u32,
    /// Deadline for one device round trip
    pub device_timeout: Duration,
    /// Frames between progress writes to the job record
    pub progress_every: u64,
    /// Heatmap decay per frame, in (0, 1)
    pub decay_rate: f64,
    /// Bit mask applied to pixels before the software edge filter
    pub sobel_mask: u8,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
    /// Heatmap video encoding
    pub encoder: EncoderSettings,
    /// FFmpeg `-v` level for decoder and encoder processes
    pub ffmpeg_log_level: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sessions_dir: PathBuf::from("./sessions"),
            poll_interval: Duration::from_secs(5),
            edge_mode: EdgeMode::Software,
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            device_width: DEFAULT_FRAME_WIDTH,
            device_height: DEFAULT_FRAME_HEIGHT,
            device_timeout: Duration::from_millis(5000),
            progress_every: 10,
            decay_rate: AccumulatorConfig::default().decay_rate,
            sobel_mask: FULL_MASK,
            metrics_port: None,
            encoder: EncoderSettings::default(),
            ffmpeg_log_level: "error".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Unparsable values fall back to their defaults. An unknown edge mode
    /// is an error so a typo never silently disables the device, and a zero
    /// poll interval or device timeout is an error.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let edge_mode = match std::env::var("MOVA_EDGE_MODE") {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => defaults.edge_mode,
        };

        let decay_rate = std::env::var("MOVA_DECAY_RATE")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|&d| AccumulatorConfig::with_decay_rate(d).is_valid())
            .unwrap_or(defaults.decay_rate);

        let poll_secs = positive_or(
            "MOVA_POLL_INTERVAL_SECS",
            std::env::var("MOVA_POLL_INTERVAL_SECS").ok(),
            defaults.poll_interval.as_secs(),
        )?;
        let device_timeout_ms = positive_or(
            "MOVA_DEVICE_TIMEOUT_MS",
            std::env::var("MOVA_DEVICE_TIMEOUT_MS").ok(),
            defaults.device_timeout.as_millis() as u64,
        )?;

        let encoder = EncoderSettings {
            codec: non_empty_var("MOVA_OUTPUT_CODEC").unwrap_or(defaults.encoder.codec),
            bitrate: non_empty_var("MOVA_OUTPUT_BITRATE").unwrap_or(defaults.encoder.bitrate),
            pixel_format: defaults.encoder.pixel_format,
        };

        Ok(Self {
            sessions_dir: std::env::var("MOVA_SESSIONS_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.sessions_dir),
            poll_interval: Duration::from_secs(poll_secs),
            edge_mode,
            serial_port: std::env::var("MOVA_SERIAL_PORT")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            baud_rate: std::env::var("MOVA_BAUD_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.baud_rate),
            device_width: std::env::var("MOVA_DEVICE_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&w: &u32| w > 0)
                .unwrap_or(defaults.device_width),
            device_height: std::env::var("MOVA_DEVICE_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&h: &u32| h > 0)
                .unwrap_or(defaults.device_height),
            device_timeout: Duration::from_millis(device_timeout_ms),
            progress_every: std::env::var("MOVA_PROGRESS_EVERY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &u64| n > 0)
                .unwrap_or(defaults.progress_every),
            decay_rate,
            sobel_mask: std::env::var("MOVA_SOBEL_MASK")
                .ok()
                .and_then(|s| parse_mask(&s))
                .unwrap_or(defaults.sobel_mask),
            metrics_port: std::env::var("METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            encoder,
            ffmpeg_log_level: non_empty_var("MOVA_FFMPEG_LOG_LEVEL")
                .unwrap_or(defaults.ffmpeg_log_level),
        })
    }

    /// Link settings for device mode.
    pub fn link_config(&self) -> WorkerResult<LinkConfig> {
        let device = self.serial_port.clone().ok_or_else(|| {
            WorkerError::config_error("MOVA_SERIAL_PORT is required in device mode")
        })?;

        Ok(LinkConfig::new(device)
            .with_baud_rate(self.baud_rate)
            .with_frame_size(self.device_width, self.device_height)
            .with_timeout(self.device_timeout))
    }

    /// Validated per-session slice of this config.
    pub fn session_config(&self) -> WorkerResult<SessionConfig> {
        let edge = match self.edge_mode {
            EdgeMode::Software => EdgeSettings::Software {
                mask: self.sobel_mask,
            },
            EdgeMode::Device => EdgeSettings::Device(self.link_config()?),
        };

        let accumulator = AccumulatorConfig::with_decay_rate(self.decay_rate);
        if !accumulator.is_valid() {
            return Err(WorkerError::config_error(format!(
                "decay rate {} outside (0, 1)",
                self.decay_rate
            )));
        }

        Ok(SessionConfig {
            edge,
            progress_every: self.progress_every.max(1),
            accumulator,
            analysis: AnalysisConfig::default(),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Unset or unparsable falls back to `default`; zero is rejected.
fn positive_or(name: &str, raw: Option<String>, default: u64) -> WorkerResult<u64> {
    match raw.and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(0) => Err(WorkerError::config_error(format!("{name} must be greater than zero"))),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

/// Accepts `0x`-prefixed hex or decimal.
fn parse_mask(value: &str) -> Option<u8> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Edge stage settings for one session.
#[derive(Debug, Clone)]
pub enum EdgeSettings {
    Software { mask: u8 },
    Device(LinkConfig),
}

impl EdgeSettings {
    pub fn mode(&self) -> EdgeMode {
        match self {
            EdgeSettings::Software { .. } => EdgeMode::Software,
            EdgeSettings::Device(_) => EdgeMode::Device,
        }
    }
}

/// Everything one session needs besides its directory.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub edge: EdgeSettings,
    pub progress_every: u64,
    pub accumulator: AccumulatorConfig,
    pub analysis: AnalysisConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            edge: EdgeSettings::Software { mask: FULL_MASK },
            progress_every: 10,
            accumulator: AccumulatorConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_mode_parse() {
        assert_eq!("device".parse::<EdgeMode>().unwrap(), EdgeMode::Device);
        assert_eq!(" Software ".parse::<EdgeMode>().unwrap(), EdgeMode::Software);
        assert!("gpu".parse::<EdgeMode>().is_err());
    }

    #[test]
    fn test_parse_mask() {
        assert_eq!(parse_mask("0xF0"), Some(0xF0));
        assert_eq!(parse_mask("255"), Some(255));
        assert_eq!(parse_mask("0x1FF"), None);
        assert_eq!(parse_mask("abc"), None);
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let err = positive_or("MOVA_POLL_INTERVAL_SECS", Some("0".to_string()), 5).unwrap_err();
        assert!(matches!(err, WorkerError::ConfigError(_)));
        assert!(err.to_string().contains("MOVA_POLL_INTERVAL_SECS"));
        assert!(positive_or("MOVA_DEVICE_TIMEOUT_MS", Some(" 0 ".to_string()), 5000).is_err());

        assert_eq!(positive_or("MOVA_DEVICE_TIMEOUT_MS", Some("250".to_string()), 5000).unwrap(), 250);
        assert_eq!(positive_or("MOVA_POLL_INTERVAL_SECS", None, 5).unwrap(), 5);
        assert_eq!(positive_or("MOVA_POLL_INTERVAL_SECS", Some("soon".to_string()), 5).unwrap(), 5);
    }

    #[test]
    fn test_device_mode_requires_port() {
        let config = WorkerConfig {
            edge_mode: EdgeMode::Device,
            ..Default::default()
        };
        assert!(matches!(
            config.session_config(),
            Err(WorkerError::ConfigError(_))
        ));

        let config = WorkerConfig {
            edge_mode: EdgeMode::Device,
            serial_port: Some(PathBuf::from("/dev/ttyUSB1")),
            device_timeout: Duration::from_millis(750),
            ..Default::default()
        };
        let session = config.session_config().unwrap();
        match session.edge {
            EdgeSettings::Device(link) => {
                assert_eq!(link.frame_len(), 19_200);
                assert_eq!(link.timeout, Duration::from_millis(750));
                assert_eq!(link.device, PathBuf::from("/dev/ttyUSB1"));
            }
            other => panic!("unexpected edge settings: {other:?}"),
        }
    }

    #[test]
    fn test_default_session_config() {
        let session = WorkerConfig::default().session_config().unwrap();
        assert_eq!(session.edge.mode(), EdgeMode::Software);
        assert_eq!(session.progress_every, 10);
        assert!((session.accumulator.decay_rate - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_decay_rejected() {
        let config = WorkerConfig {
            decay_rate: 1.5,
            ..Default::default()
        };
        assert!(config.session_config().is_err());
    }
}
