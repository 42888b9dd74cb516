//! Fixed-size frame exchange with an external processing device.
//!
//! This crate provides:
//! - The byte stream link seam (`ByteLink`, `LinkReader`)
//! - A POSIX serial tty link configured through termios
//! - An in-memory link for tests and loopback checks
//! - The `FrameTransceiver`: send a frame, accumulate replies on a
//!   background reader, receive exactly one frame or time out
//!
//! # Usage
//!
//! ```rust,ignore
//! use mova_link::{FrameTransceiver, LinkConfig, SerialLink};
//!
//! let config = LinkConfig::new("/dev/ttyUSB0");
//! let link = SerialLink::open(&config.device, config.baud_rate)?;
//! let mut trx = FrameTransceiver::open(link, &config)?;
//!
//! trx.clear();
//! trx.send(&frame_bytes)?;
//! let reply = trx.receive(config.timeout)?;
//! trx.close();
//! ```

pub mod config;
pub mod error;
pub mod link;
pub mod memory;
pub mod metrics;
pub mod serial;
pub mod transceiver;

pub use config::LinkConfig;
pub use error::{LinkError, LinkResult};
pub use link::{ByteLink, LinkReader, LinkWriter};
pub use memory::{loopback, memory_pair, MemoryLink, MemoryPeer};
pub use serial::SerialLink;
pub use transceiver::{FrameTransceiver, TransceiverStats};
