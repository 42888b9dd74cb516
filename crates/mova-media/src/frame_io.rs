//! Frame source and sink capabilities.
//!
//! The analysis pipeline only needs grayscale frames in and color frames
//! out. [`FrameIo`] opens both ends; [`FfmpegIo`] does it by piping raw
//! pixels through `ffmpeg` child processes.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};

use image::{GrayImage, RgbImage};
use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, PIPE};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, StreamInfo};

/// Sequential reader of grayscale frames.
pub trait FrameSource: Send {
    /// Geometry and advisory timing of the stream.
    fn info(&self) -> &StreamInfo;

    /// Next decoded frame, or `None` at end of stream.
    fn next_frame(&mut self) -> MediaResult<Option<GrayImage>>;

    /// Release the decoder. Idempotent.
    fn close(&mut self) -> MediaResult<()>;
}

/// Sequential writer of color frames.
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()>;

    /// Flush and finalize the output artifact. Idempotent.
    fn close(&mut self) -> MediaResult<()>;
}

/// Opens frame sources and sinks.
pub trait FrameIo: Send + Sync {
    fn open_source(&self, path: &Path) -> MediaResult<Box<dyn FrameSource>>;

    fn create_sink(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        fps: f64,
    ) -> MediaResult<Box<dyn FrameSink>>;

    /// Count frames by decoding the whole stream.
    fn count_frames(&self, path: &Path) -> MediaResult<u64> {
        let mut source = self.open_source(path)?;
        let mut count = 0u64;
        while source.next_frame()?.is_some() {
            count += 1;
        }
        source.close()?;
        Ok(count)
    }
}

/// Output encoding settings.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub codec: String,
    pub bitrate: String,
    pub pixel_format: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            codec: "libvpx".to_string(),
            bitrate: "2M".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

/// FFmpeg-backed [`FrameIo`].
#[derive(Debug, Clone)]
pub struct FfmpegIo {
    encoder: EncoderSettings,
    /// `-v` level passed to every child process
    log_level: String,
}

impl Default for FfmpegIo {
    fn default() -> Self {
        Self {
            encoder: EncoderSettings::default(),
            log_level: "error".to_string(),
        }
    }
}

impl FfmpegIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoder(mut self, encoder: EncoderSettings) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Decode `path` to raw gray frames on stdout.
    fn decode_command(&self, path: &Path) -> FfmpegCommand {
        // Keep the container's own frame timing; no duplication or dropping.
        FfmpegCommand::new(path, PIPE)
            .log_level(self.log_level.as_str())
            .output_args(["-fps_mode", "passthrough"])
            .raw_output("gray")
    }

    /// Encode raw RGB frames from stdin into `path`.
    fn encode_command(&self, path: &Path, width: u32, height: u32, fps: f64) -> FfmpegCommand {
        FfmpegCommand::new(PIPE, path)
            .log_level(self.log_level.as_str())
            .raw_input("rgb24", width, height, fps)
            .video_codec(self.encoder.codec.as_str())
            .video_bitrate(self.encoder.bitrate.as_str())
            .pixel_format(self.encoder.pixel_format.as_str())
    }
}

impl FrameIo for FfmpegIo {
    fn open_source(&self, path: &Path) -> MediaResult<Box<dyn FrameSource>> {
        let info = probe_video(path)?;

        let command = self.decode_command(path);

        let mut child = command
            .to_command(Stdio::null(), Stdio::piped())?
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("decoder stdout not captured"))?;

        debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.frame_rate,
            "Opened FFmpeg frame source"
        );

        Ok(Box::new(FfmpegSource {
            path: path.to_path_buf(),
            info,
            child: Some(child),
            stdout: Some(stdout),
            finished: false,
        }))
    }

    fn create_sink(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        fps: f64,
    ) -> MediaResult<Box<dyn FrameSink>> {
        let command = self.encode_command(path, width, height, fps);

        let mut child = command
            .to_command(Stdio::piped(), Stdio::null())?
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::internal("encoder stdin not captured"))?;

        info!(path = %path.display(), width, height, fps, "Opened FFmpeg frame sink");

        Ok(Box::new(FfmpegSink {
            path: path.to_path_buf(),
            width,
            height,
            child: Some(child),
            stdin: Some(stdin),
        }))
    }
}

struct FfmpegSource {
    path: PathBuf,
    info: StreamInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    finished: bool,
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn next_frame(&mut self) -> MediaResult<Option<GrayImage>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.info.gray_frame_len()];
        let filled = read_full(stdout, &mut buf)?;

        if filled < buf.len() {
            if filled > 0 {
                warn!(
                    path = %self.path.display(),
                    bytes = filled,
                    "Discarding truncated trailing frame"
                );
            }
            self.finished = true;
            self.stdout = None;
            return Ok(None);
        }

        GrayImage::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or_else(|| MediaError::internal("decoded frame has wrong length"))
    }

    fn close(&mut self) -> MediaResult<()> {
        self.stdout = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if !self.finished {
            // Stopped early; the decoder may still be producing.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(());
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                format!("decoding {} failed", self.path.display()),
                None,
                status.code(),
            ));
        }
        Ok(())
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

struct FfmpegSink {
    path: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(MediaError::dimension_mismatch(
                (self.width, self.height),
                frame.dimensions(),
            ));
        }

        let stdin = self.stdin.as_mut().ok_or(MediaError::SinkClosed)?;
        stdin.write_all(frame.as_raw()).map_err(|e| {
            if e.kind() == io::ErrorKind::BrokenPipe {
                MediaError::ffmpeg_failed(
                    format!("encoder for {} exited early", self.path.display()),
                    None,
                    None,
                )
            } else {
                MediaError::from(e)
            }
        })
    }

    fn close(&mut self) -> MediaResult<()> {
        // EOF on stdin lets the encoder finalize the container.
        self.stdin = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child.wait()?;
        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                format!("encoding {} failed", self.path.display()),
                None,
                status.code(),
            ));
        }
        debug!(path = %self.path.display(), "Frame sink finalized");
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
    }
}

/// Read until `buf` is full or the stream ends. Returns bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
