//! In-memory link.
//!
//! `memory_pair` gives a link plus the peer handle that plays the device:
//! the peer sees everything written to the link and pushes replies in any
//! chunking it likes. `loopback` echoes writes straight back.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::LinkResult;
use crate::link::{ByteLink, LinkReader, LinkWriter};

#[derive(Debug, Default)]
struct MemoryState {
    /// Bytes waiting to be read by the link
    inbound: VecDeque<u8>,
    /// Bytes written by the link, not yet taken by the peer
    outbound: Vec<u8>,
    loopback: bool,
    fail: Option<io::ErrorKind>,
    /// Split halves that are still alive
    halves: usize,
}

type Shared = Arc<Mutex<MemoryState>>;

/// Link side of an in-memory channel.
#[derive(Debug, Clone)]
pub struct MemoryLink {
    state: Shared,
}

/// Device side of an in-memory channel.
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    state: Shared,
}

/// Create a connected link/peer pair.
pub fn memory_pair() -> (MemoryLink, MemoryPeer) {
    let state: Shared = Arc::default();
    (
        MemoryLink {
            state: Arc::clone(&state),
        },
        MemoryPeer { state },
    )
}

/// A link whose writes come back as reads.
pub fn loopback() -> MemoryLink {
    let (link, _peer) = memory_pair();
    link.state.lock().loopback = true;
    link
}

impl ByteLink for MemoryLink {
    fn describe(&self) -> String {
        if self.state.lock().loopback {
            "loopback".to_string()
        } else {
            "memory".to_string()
        }
    }

    fn split(self) -> LinkResult<(Box<dyn LinkReader>, Box<dyn LinkWriter>)> {
        self.state.lock().halves += 2;
        let reader = MemoryReader {
            state: Arc::clone(&self.state),
        };
        let writer = MemoryWriter { state: self.state };
        Ok((Box::new(reader), Box::new(writer)))
    }
}

impl MemoryPeer {
    /// Queue bytes for the link to read.
    pub fn push(&self, bytes: &[u8]) {
        self.state.lock().inbound.extend(bytes.iter().copied());
    }

    /// Take everything the link has written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.state.lock().outbound)
    }

    /// Take exactly `n` written bytes if that many are waiting.
    pub fn drain_written(&self, n: usize) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        if state.outbound.len() < n {
            return None;
        }
        Some(state.outbound.drain(..n).collect())
    }

    /// Number of written bytes not yet taken.
    pub fn written_len(&self) -> usize {
        self.state.lock().outbound.len()
    }

    /// Read and write halves of the link that have not been dropped yet.
    pub fn attached_halves(&self) -> usize {
        self.state.lock().halves
    }

    /// Make every subsequent read and write on the link fail with `kind`.
    pub fn fail(&self, kind: io::ErrorKind) {
        self.state.lock().fail = Some(kind);
    }
}

struct MemoryReader {
    state: Shared,
}

impl LinkReader for MemoryReader {
    fn available(&mut self) -> io::Result<usize> {
        let state = self.state.lock();
        if let Some(kind) = state.fail {
            return Err(io::Error::from(kind));
        }
        Ok(state.inbound.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if let Some(kind) = state.fail {
            return Err(io::Error::from(kind));
        }
        let n = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Drop for MemoryReader {
    fn drop(&mut self) {
        self.state.lock().halves -= 1;
    }
}

struct MemoryWriter {
    state: Shared,
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.state.lock().halves -= 1;
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if let Some(kind) = state.fail {
            return Err(io::Error::from(kind));
        }
        if state.loopback {
            state.inbound.extend(buf.iter().copied());
        } else {
            state.outbound.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_moves_bytes_both_ways() {
        let (link, peer) = memory_pair();
        let (mut reader, mut writer) = link.split().unwrap();

        writer.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(peer.written_len(), 3);
        assert_eq!(peer.drain_written(4), None);
        assert_eq!(peer.drain_written(2), Some(vec![1, 2]));
        assert_eq!(peer.take_written(), vec![3]);

        peer.push(&[9, 8]);
        assert_eq!(reader.available().unwrap(), 2);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[9, 8]);
        assert_eq!(reader.available().unwrap(), 0);

        assert_eq!(peer.attached_halves(), 2);
        drop(reader);
        drop(writer);
        assert_eq!(peer.attached_halves(), 0);
    }

    #[test]
    fn test_loopback_echoes() {
        let link = loopback();
        assert_eq!(link.describe(), "loopback");
        let (mut reader, mut writer) = link.split().unwrap();
        writer.write_all(b"abc").unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"abc");
    }

    #[test]
    fn test_fail_poisons_both_halves() {
        let (link, peer) = memory_pair();
        let (mut reader, mut writer) = link.split().unwrap();
        peer.fail(io::ErrorKind::BrokenPipe);
        assert_eq!(
            reader.available().unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
        assert!(writer.write_all(&[0]).is_err());
    }
}
