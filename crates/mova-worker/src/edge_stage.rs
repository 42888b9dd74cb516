//! Edge computation for the session pipeline.
//!
//! Software mode filters on the host. Device mode ships each frame to the
//! external processor at its fixed resolution and scales the reply back.

use std::sync::Arc;
use std::time::Duration;

use image::GrayImage;
use mova_link::{FrameTransceiver, LinkConfig, LinkResult, SerialLink};
use mova_media::{resize_gray, sobel_magnitude};
use mova_models::Resolution;
use tracing::{debug, info};

use crate::config::EdgeSettings;
use crate::error::{WorkerError, WorkerResult};

/// Opens a transceiver for one session.
pub trait DeviceConnector: Send + Sync {
    fn connect(&self, config: &LinkConfig) -> LinkResult<FrameTransceiver>;
}

impl<F> DeviceConnector for F
where
    F: Fn(&LinkConfig) -> LinkResult<FrameTransceiver> + Send + Sync,
{
    fn connect(&self, config: &LinkConfig) -> LinkResult<FrameTransceiver> {
        self(config)
    }
}

/// Connector for a serial tty.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl DeviceConnector for SerialConnector {
    fn connect(&self, config: &LinkConfig) -> LinkResult<FrameTransceiver> {
        let link = SerialLink::open(&config.device, config.baud_rate)?;
        info!(
            device = %config.device.display(),
            baud = config.baud_rate,
            "Serial link opened"
        );
        FrameTransceiver::open(link, config)
    }
}

/// Per-session edge stage.
pub enum EdgeStage {
    Software {
        mask: u8,
    },
    Device {
        transceiver: FrameTransceiver,
        width: u32,
        height: u32,
        timeout: Duration,
    },
}

impl std::fmt::Debug for EdgeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeStage::Software { mask } => f
                .debug_struct("Software")
                .field("mask", &format_args!("{mask:#04x}"))
                .finish(),
            EdgeStage::Device {
                transceiver,
                width,
                height,
                timeout,
            } => f
                .debug_struct("Device")
                .field("transceiver", transceiver)
                .field("width", width)
                .field("height", height)
                .field("timeout", timeout)
                .finish(),
        }
    }
}

impl EdgeStage {
    /// Build the stage for `settings`, connecting to the device if needed.
    ///
    /// The transceiver buffer is cleared before it is handed out.
    pub fn open(
        settings: &EdgeSettings,
        connector: Option<&Arc<dyn DeviceConnector>>,
    ) -> WorkerResult<Self> {
        match settings {
            EdgeSettings::Software { mask } => Ok(EdgeStage::Software { mask: *mask }),
            EdgeSettings::Device(config) => {
                let connector = connector.ok_or_else(|| {
                    WorkerError::device_unavailable("no device connector configured")
                })?;
                let transceiver = connector.connect(config)?;
                transceiver.clear();
                Ok(EdgeStage::Device {
                    transceiver,
                    width: config.frame_width,
                    height: config.frame_height,
                    timeout: config.timeout,
                })
            }
        }
    }

    /// Device frame geometry, when the device computes edges.
    pub fn device_resolution(&self) -> Option<Resolution> {
        match self {
            EdgeStage::Software { .. } => None,
            EdgeStage::Device { width, height, .. } => Some(Resolution::new(*width, *height)),
        }
    }

    /// Description of the device link, when one is open.
    pub fn link_description(&self) -> Option<&str> {
        match self {
            EdgeStage::Software { .. } => None,
            EdgeStage::Device { transceiver, .. } => Some(transceiver.description()),
        }
    }

    /// Edge magnitude of frame `index`, at the frame's own resolution.
    pub fn edges(&mut self, frame: &GrayImage, index: u64) -> WorkerResult<GrayImage> {
        match self {
            EdgeStage::Software { mask } => Ok(sobel_magnitude(frame, *mask)),
            EdgeStage::Device {
                transceiver,
                width,
                height,
                timeout,
            } => {
                let outbound = resize_gray(frame, *width, *height);
                transceiver
                    .send(outbound.as_raw())
                    .map_err(|e| WorkerError::from_exchange(index, e))?;
                let reply = transceiver
                    .receive(*timeout)
                    .map_err(|e| WorkerError::from_exchange(index, e))?;

                let device_frame = GrayImage::from_raw(*width, *height, reply).ok_or_else(|| {
                    WorkerError::processing_failed(format!(
                        "device reply for frame {index} does not fit {width}x{height}"
                    ))
                })?;

                let (w, h) = frame.dimensions();
                Ok(resize_gray(&device_frame, w, h))
            }
        }
    }

    /// Release the device link, if any.
    pub fn close(&mut self) {
        if let EdgeStage::Device { transceiver, .. } = self {
            if !transceiver.is_open() {
                return;
            }
            let stats = transceiver.stats();
            transceiver.close();
            debug!(
                sent = stats.frames_sent,
                received = stats.frames_received,
                timeouts = stats.timeouts,
                "Device link closed"
            );
        }
    }
}

impl Drop for EdgeStage {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use mova_link::loopback;
    use mova_media::FULL_MASK;

    #[test]
    fn test_software_stage() {
        let mut stage = EdgeStage::open(&EdgeSettings::Software { mask: FULL_MASK }, None).unwrap();
        assert!(stage.device_resolution().is_none());
        assert!(stage.link_description().is_none());

        let flat = GrayImage::from_pixel(12, 8, Luma([90]));
        let edges = stage.edges(&flat, 0).unwrap();
        assert_eq!(edges.dimensions(), (12, 8));
        assert!(edges.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_device_stage_over_loopback() {
        let config = LinkConfig::new("loopback")
            .with_frame_size(8, 6)
            .with_timeout(Duration::from_secs(2));
        let connector: Arc<dyn DeviceConnector> =
            Arc::new(|config: &LinkConfig| FrameTransceiver::open(loopback(), config));

        let mut stage = EdgeStage::open(&EdgeSettings::Device(config), Some(&connector)).unwrap();
        assert_eq!(stage.device_resolution(), Some(Resolution::new(8, 6)));
        assert_eq!(stage.link_description(), Some("loopback"));

        // Loopback echoes the downscaled frame; a flat frame survives both
        // resizes unchanged.
        let frame = GrayImage::from_pixel(32, 24, Luma([77]));
        let edges = stage.edges(&frame, 0).unwrap();
        assert_eq!(edges.dimensions(), (32, 24));
        assert!(edges.pixels().all(|p| p[0] == 77));
        stage.close();
    }

    #[test]
    fn test_device_mode_without_connector() {
        let config = LinkConfig::new("none");
        let err = EdgeStage::open(&EdgeSettings::Device(config), None).unwrap_err();
        assert!(matches!(err, WorkerError::DeviceUnavailable(_)));
    }
}
