//! Fixed-size frame transceiver.
//!
//! ```text
//! caller ── send(frame) ─────────────────────────────▶ LinkWriter ──▶ device
//!                                                                      │
//! caller ◀─ receive(timeout) ◀── buffer (Mutex + Condvar) ◀── reader ◀─┘
//!           drains exactly one frame          appends whatever is ready
//! ```
//!
//! The background reader is the only producer and the caller the only
//! consumer. Bytes leave the buffer in arrival order, one whole frame at a
//! time; a timed-out receive leaves the buffer untouched.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, LinkResult};
use crate::link::{ByteLink, LinkReader, LinkWriter};
use crate::metrics;

/// Largest single read from the link.
const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Default)]
struct BufferState {
    bytes: VecDeque<u8>,
    /// Set once by the reader when the link fails; never cleared.
    failure: Option<String>,
    /// Set once the reader thread has exited and dropped the read half.
    stopped: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<BufferState>,
    ready: Condvar,
    running: AtomicBool,
}

/// Counters for one transceiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransceiverStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub timeouts: u64,
}

/// Exchanges fixed-size frames with a device over a [`ByteLink`].
pub struct FrameTransceiver {
    shared: Arc<Shared>,
    writer: Option<Box<dyn LinkWriter>>,
    reader: Option<JoinHandle<()>>,
    frame_len: usize,
    join_timeout: Duration,
    description: String,
    stats: TransceiverStats,
}

impl std::fmt::Debug for FrameTransceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTransceiver")
            .field("link", &self.description)
            .field("frame_len", &self.frame_len)
            .field("open", &self.is_open())
            .field("stats", &self.stats)
            .finish()
    }
}

impl FrameTransceiver {
    /// Take ownership of `link` and start the background reader.
    pub fn open<L: ByteLink>(link: L, config: &LinkConfig) -> LinkResult<Self> {
        let description = link.describe();
        let (reader, writer) = link.split()?;

        let shared = Arc::new(Shared {
            state: Mutex::new(BufferState::default()),
            ready: Condvar::new(),
            running: AtomicBool::new(true),
        });

        let poll_interval = config.poll_interval;
        let reader_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("mova-link-reader".to_string())
            .spawn(move || {
                let _signal = ExitSignal(Arc::clone(&reader_shared));
                reader_loop(reader, &reader_shared, poll_interval);
            })?;

        info!(
            link = %description,
            frame_len = config.frame_len(),
            "Frame transceiver opened"
        );

        Ok(Self {
            shared,
            writer: Some(writer),
            reader: Some(handle),
            frame_len: config.frame_len(),
            join_timeout: config.join_timeout,
            description,
            stats: TransceiverStats::default(),
        })
    }

    /// Bytes in one frame.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Description of the underlying link.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn stats(&self) -> TransceiverStats {
        self.stats
    }

    /// Bytes currently buffered and not yet received.
    pub fn buffered(&self) -> usize {
        self.shared.state.lock().bytes.len()
    }

    /// Write one frame to the device. Does not wait for a reply.
    pub fn send(&mut self, frame: &[u8]) -> LinkResult<()> {
        if frame.len() != self.frame_len {
            return Err(LinkError::FrameSize {
                expected: self.frame_len,
                actual: frame.len(),
            });
        }

        let writer = self.writer.as_mut().ok_or(LinkError::Closed)?;
        writer.write_all(frame)?;
        writer.flush()?;

        self.stats.frames_sent += 1;
        metrics::record_frame_sent();
        Ok(())
    }

    /// Block until one whole frame is buffered or `timeout` elapses.
    ///
    /// On success exactly `frame_len` bytes are removed from the front of
    /// the buffer. A reader failure is reported in preference to any data
    /// still buffered.
    pub fn receive(&mut self, timeout: Duration) -> LinkResult<Vec<u8>> {
        if !self.is_open() {
            return Err(LinkError::Closed);
        }

        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();

        loop {
            if let Some(failure) = &state.failure {
                return Err(LinkError::ReaderStopped(failure.clone()));
            }

            if state.bytes.len() >= self.frame_len {
                let frame: Vec<u8> = state.bytes.drain(..self.frame_len).collect();
                drop(state);
                self.stats.frames_received += 1;
                metrics::record_frame_received();
                return Ok(frame);
            }

            let now = Instant::now();
            if now >= deadline {
                let buffered = state.bytes.len();
                drop(state);
                self.stats.timeouts += 1;
                metrics::record_timeout();
                debug!(link = %self.description, buffered, "Receive timed out");
                return Err(LinkError::Timeout { timeout, buffered });
            }

            self.shared.ready.wait_for(&mut state, deadline - now);
        }
    }

    /// Discard everything buffered so far.
    pub fn clear(&self) {
        let discarded = {
            let mut state = self.shared.state.lock();
            let n = state.bytes.len();
            state.bytes.clear();
            n
        };
        if discarded > 0 {
            debug!(link = %self.description, discarded, "Cleared stale bytes");
        }
    }

    /// Stop the reader, wait for it at most `join_timeout`, release the link.
    ///
    /// Idempotent.
    pub fn close(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.writer = None;

        let Some(handle) = self.reader.take() else {
            return;
        };

        let deadline = Instant::now() + self.join_timeout;
        let stopped = {
            let mut state = self.shared.state.lock();
            while !state.stopped {
                if self.shared.ready.wait_until(&mut state, deadline).timed_out() {
                    break;
                }
            }
            state.stopped
        };

        if stopped {
            if handle.join().is_err() {
                warn!(link = %self.description, "Link reader panicked");
            }
            info!(link = %self.description, stats = ?self.stats, "Frame transceiver closed");
        } else {
            warn!(
                link = %self.description,
                join_timeout_ms = self.join_timeout.as_millis() as u64,
                "Link reader did not stop in time; detaching it, read half leaked until it returns"
            );
        }
    }
}

impl Drop for FrameTransceiver {
    fn drop(&mut self) {
        self.close();
    }
}

/// Marks the reader as stopped when its thread unwinds or returns.
struct ExitSignal(Arc<Shared>);

impl Drop for ExitSignal {
    fn drop(&mut self) {
        self.0.state.lock().stopped = true;
        self.0.ready.notify_all();
    }
}

fn reader_loop(mut reader: Box<dyn LinkReader>, shared: &Shared, poll_interval: Duration) {
    let mut chunk = vec![0u8; READ_CHUNK];

    while shared.running.load(Ordering::Acquire) {
        let ready = match reader.available() {
            Ok(0) => {
                thread::sleep(poll_interval);
                continue;
            }
            Ok(n) => n.min(chunk.len()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                stop_with_failure(shared, e);
                return;
            }
        };

        match reader.read(&mut chunk[..ready]) {
            Ok(0) => thread::sleep(poll_interval),
            Ok(n) => {
                shared.state.lock().bytes.extend(chunk[..n].iter().copied());
                shared.ready.notify_all();
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                stop_with_failure(shared, e);
                return;
            }
        }
    }
}

fn stop_with_failure(shared: &Shared, err: io::Error) {
    warn!(error = %err, "Link reader stopped");
    metrics::record_reader_failure(&format!("{:?}", err.kind()));
    shared.state.lock().failure = Some(err.to_string());
    shared.ready.notify_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{loopback, memory_pair};

    fn small_config(width: u32, height: u32) -> LinkConfig {
        LinkConfig::new("memory")
            .with_frame_size(width, height)
            .with_timeout(Duration::from_millis(300))
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_loopback_round_trip() {
        let config = LinkConfig::default();
        let mut trx = FrameTransceiver::open(loopback(), &config).unwrap();

        let frame = pattern(config.frame_len(), 7);
        trx.send(&frame).unwrap();
        let reply = trx.receive(config.timeout).unwrap();

        assert_eq!(reply, frame);
        assert_eq!(trx.buffered(), 0);
        assert_eq!(trx.stats().frames_sent, 1);
        assert_eq!(trx.stats().frames_received, 1);
    }

    #[test]
    fn test_partial_frame_times_out_and_stays_buffered() {
        let config = LinkConfig::default().with_timeout(Duration::from_millis(400));
        assert_eq!(config.frame_len(), 19_200);

        let (link, peer) = memory_pair();
        let mut trx = FrameTransceiver::open(link, &config).unwrap();
        peer.push(&vec![0xAB; 19_199]);

        let started = Instant::now();
        let err = trx.receive(config.timeout).unwrap_err();
        let elapsed = started.elapsed();

        match err {
            LinkError::Timeout { buffered, .. } => assert_eq!(buffered, 19_199),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(elapsed >= config.timeout);
        assert!(elapsed < config.timeout + Duration::from_millis(250));
        assert_eq!(trx.buffered(), 19_199);
        assert_eq!(trx.stats().timeouts, 1);

        // The missing byte completes the frame; nothing was consumed.
        peer.push(&[0xCD]);
        let frame = trx.receive(config.timeout).unwrap();
        assert_eq!(frame.len(), 19_200);
        assert_eq!(frame[19_198], 0xAB);
        assert_eq!(frame[19_199], 0xCD);
    }

    #[test]
    fn test_reply_in_chunks() {
        let config = small_config(16, 8);
        let (link, peer) = memory_pair();
        let mut trx = FrameTransceiver::open(link, &config).unwrap();

        let reply = pattern(config.frame_len(), 3);
        let feeder = {
            let peer = peer.clone();
            let reply = reply.clone();
            thread::spawn(move || {
                for piece in reply.chunks(13) {
                    peer.push(piece);
                    thread::sleep(Duration::from_millis(2));
                }
            })
        };

        let got = trx.receive(Duration::from_secs(2)).unwrap();
        feeder.join().unwrap();
        assert_eq!(got, reply);
    }

    #[test]
    fn test_coalesced_replies_drain_one_frame_each() {
        let config = small_config(4, 4);
        let (link, peer) = memory_pair();
        let mut trx = FrameTransceiver::open(link, &config).unwrap();

        let first = pattern(16, 1);
        let second = pattern(16, 2);
        let mut both = first.clone();
        both.extend_from_slice(&second);
        peer.push(&both);

        assert_eq!(trx.receive(config.timeout).unwrap(), first);
        assert_eq!(trx.receive(config.timeout).unwrap(), second);
        assert!(trx.receive(Duration::from_millis(20)).unwrap_err().is_timeout());
    }

    #[test]
    fn test_clear_discards_stale_bytes() {
        let config = small_config(4, 2);
        let (link, peer) = memory_pair();
        let mut trx = FrameTransceiver::open(link, &config).unwrap();

        peer.push(&[9, 9, 9]);
        let deadline = Instant::now() + Duration::from_secs(1);
        while trx.buffered() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(trx.buffered(), 3);

        trx.clear();
        assert_eq!(trx.buffered(), 0);

        let fresh = pattern(8, 5);
        peer.push(&fresh);
        assert_eq!(trx.receive(config.timeout).unwrap(), fresh);
    }

    #[test]
    fn test_send_rejects_wrong_size() {
        let config = small_config(4, 4);
        let (link, peer) = memory_pair();
        let mut trx = FrameTransceiver::open(link, &config).unwrap();

        let err = trx.send(&[0u8; 15]).unwrap_err();
        assert!(matches!(err, LinkError::FrameSize { expected: 16, actual: 15 }));
        assert_eq!(peer.written_len(), 0);

        trx.send(&[1u8; 16]).unwrap();
        assert_eq!(peer.take_written(), vec![1u8; 16]);
    }

    #[test]
    fn test_reader_failure_is_terminal() {
        let config = small_config(4, 4);
        let (link, peer) = memory_pair();
        let mut trx = FrameTransceiver::open(link, &config).unwrap();

        peer.fail(io::ErrorKind::BrokenPipe);
        let err = trx.receive(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LinkError::ReaderStopped(_)));
        assert!(!err.is_timeout());

        let again = trx.receive(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(again, LinkError::ReaderStopped(_)));
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let config = small_config(4, 4);
        let mut trx = FrameTransceiver::open(loopback(), &config).unwrap();

        let started = Instant::now();
        trx.close();
        assert!(started.elapsed() < config.join_timeout + Duration::from_millis(100));
        assert!(!trx.is_open());
        trx.close();

        assert!(matches!(trx.send(&[0u8; 16]), Err(LinkError::Closed)));
        assert!(matches!(trx.receive(config.timeout), Err(LinkError::Closed)));
    }

    /// Link whose reader blocks far longer than any join timeout.
    struct StalledLink;

    struct StalledReader;

    impl LinkReader for StalledReader {
        fn available(&mut self) -> io::Result<usize> {
            thread::sleep(Duration::from_secs(2));
            Ok(0)
        }

        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl ByteLink for StalledLink {
        fn describe(&self) -> String {
            "stalled".to_string()
        }

        fn split(self) -> LinkResult<(Box<dyn LinkReader>, Box<dyn LinkWriter>)> {
            Ok((Box::new(StalledReader), Box::new(io::sink())))
        }
    }

    #[test]
    fn test_close_detaches_stalled_reader() {
        let mut config = small_config(4, 4);
        config.join_timeout = Duration::from_millis(50);
        let mut trx = FrameTransceiver::open(StalledLink, &config).unwrap();

        let started = Instant::now();
        trx.close();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!trx.is_open());
        assert!(!trx.shared.state.lock().stopped);
    }

    #[test]
    fn test_close_after_reader_failure() {
        let config = small_config(4, 4);
        let (link, peer) = memory_pair();
        let mut trx = FrameTransceiver::open(link, &config).unwrap();

        peer.fail(io::ErrorKind::BrokenPipe);
        assert!(trx.receive(Duration::from_secs(1)).is_err());

        trx.close();
        assert!(trx.shared.state.lock().stopped);
        assert_eq!(peer.attached_halves(), 0);
    }
}
