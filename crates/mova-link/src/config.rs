//! Link configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default serial rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default device frame geometry (single-byte grayscale).
pub const DEFAULT_FRAME_WIDTH: u32 = 160;
pub const DEFAULT_FRAME_HEIGHT: u32 = 120;

/// Configuration for the serial link and frame transceiver.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Device path (e.g. `/dev/ttyUSB0`)
    pub device: PathBuf,
    /// Baud rate
    pub baud_rate: u32,
    /// Frame width in pixels exchanged with the device
    pub frame_width: u32,
    /// Frame height in pixels exchanged with the device
    pub frame_height: u32,
    /// Deadline for one frame round trip
    pub timeout: Duration,
    /// Sleep between availability checks on the background reader
    pub poll_interval: Duration,
    /// Longest `close()` waits for the reader to exit
    pub join_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/ttyUSB0"),
            baud_rate: DEFAULT_BAUD_RATE,
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
            join_timeout: Duration::from_secs(1),
        }
    }
}

impl LinkConfig {
    /// Defaults for the given device path.
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set frame geometry.
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_width = width;
        self.frame_height = height;
        self
    }

    /// Set round-trip timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Bytes in one frame.
    pub fn frame_len(&self) -> usize {
        self.frame_width as usize * self.frame_height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_frame_len() {
        let config = LinkConfig::default();
        assert_eq!(config.frame_len(), 19_200);
        assert!(config.poll_interval < Duration::from_millis(10));
    }

    #[test]
    fn test_builder() {
        let config = LinkConfig::new("/dev/ttyACM0")
            .with_frame_size(8, 4)
            .with_baud_rate(57_600)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(config.frame_len(), 32);
        assert_eq!(config.baud_rate, 57_600);
        assert_eq!(config.device, PathBuf::from("/dev/ttyACM0"));
    }
}
