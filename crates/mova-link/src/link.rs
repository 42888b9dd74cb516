//! Byte stream link abstraction.
//!
//! A link is a duplex byte channel that may deliver data in arbitrary chunk
//! sizes and may stall indefinitely. The transceiver needs the two
//! directions separately: the read half moves to the background reader
//! thread while the caller keeps the write half.

use std::io::{self, Write};

use crate::error::LinkResult;

/// Read half of a link.
pub trait LinkReader: Send {
    /// Number of bytes that can be read right now without blocking.
    fn available(&mut self) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes. Returns `Ok(0)` when nothing is ready.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Write half of a link.
pub trait LinkWriter: Write + Send {}

impl<T: Write + Send> LinkWriter for T {}

/// A duplex byte stream that can be split into its two halves.
pub trait ByteLink: Send {
    /// Short description for logs (device path, "memory", ...).
    fn describe(&self) -> String;

    /// Consume the link and hand out independent read and write halves.
    fn split(self) -> LinkResult<(Box<dyn LinkReader>, Box<dyn LinkWriter>)>;
}
