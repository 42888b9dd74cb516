//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{MediaError, MediaResult};

/// Frame rate substituted when a source reports an unusable one.
pub const DEFAULT_FPS: f64 = 30.0;

/// Highest frame rate accepted from a source.
pub const MAX_FPS: f64 = 120.0;

/// What a frame source says about itself.
///
/// `frame_rate` and `frame_count_hint` are advisory and kept as reported;
/// use [`StreamInfo::effective_fps`] and [`StreamInfo::known_frame_count`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Reported frame rate (fps)
    pub frame_rate: f64,
    /// Reported frame count; zero or negative when unknown
    pub frame_count_hint: i64,
    /// Duration in seconds (0 when unknown)
    pub duration: f64,
    /// Video codec
    pub codec: String,
}

impl StreamInfo {
    /// Frame rate with invalid values (≤ 0, > 120, NaN) replaced by 30.
    pub fn effective_fps(&self) -> f64 {
        sanitize_fps(self.frame_rate)
    }

    /// Frame count if the source reported a positive one.
    pub fn known_frame_count(&self) -> Option<u64> {
        (self.frame_count_hint > 0).then_some(self.frame_count_hint as u64)
    }

    /// Bytes in one single-channel frame.
    pub fn gray_frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Replace an unusable frame rate with [`DEFAULT_FPS`].
pub fn sanitize_fps(fps: f64) -> f64 {
    if fps.is_finite() && fps > 0.0 && fps <= MAX_FPS {
        fps
    } else {
        DEFAULT_FPS
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Probe a video file for information.
pub fn probe_video(path: impl AsRef<Path>) -> MediaResult<StreamInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(json: &[u8]) -> MediaResult<StreamInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let width = video_stream.width.unwrap_or(0);
    let height = video_stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(MediaError::InvalidVideo(format!(
            "Video stream has no usable dimensions ({width}x{height})"
        )));
    }

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    // avg_frame_rate is "0/0" for some containers; fall through to r_frame_rate.
    let frame_rate = [&video_stream.avg_frame_rate, &video_stream.r_frame_rate]
        .into_iter()
        .flatten()
        .filter_map(|r| parse_frame_rate(r))
        .find(|fps| *fps > 0.0)
        .unwrap_or(0.0);

    let frame_count_hint = video_stream
        .nb_frames
        .as_ref()
        .and_then(|n| n.parse::<i64>().ok())
        .unwrap_or(0);

    Ok(StreamInfo {
        width,
        height,
        frame_rate,
        frame_count_hint,
        duration,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
    }

    #[test]
    fn test_sanitize_fps() {
        assert_eq!(sanitize_fps(25.0), 25.0);
        assert_eq!(sanitize_fps(120.0), 120.0);
        assert_eq!(sanitize_fps(0.0), DEFAULT_FPS);
        assert_eq!(sanitize_fps(-1.0), DEFAULT_FPS);
        assert_eq!(sanitize_fps(1000.0), DEFAULT_FPS);
        assert_eq!(sanitize_fps(f64::NAN), DEFAULT_FPS);
    }

    #[test]
    fn test_parse_webm_probe() {
        // WebM from a browser recorder: no nb_frames, no duration on the stream.
        let json = br#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "opus"},
                {"codec_type": "video", "codec_name": "vp8", "width": 640, "height": 480,
                 "r_frame_rate": "1000/1", "avg_frame_rate": "0/0"}
            ],
            "format": {"duration": "12.480000"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!((info.width, info.height), (640, 480));
        assert_eq!(info.codec, "vp8");
        assert_eq!(info.frame_rate, 1000.0);
        assert_eq!(info.effective_fps(), DEFAULT_FPS);
        assert_eq!(info.known_frame_count(), None);
        assert!((info.duration - 12.48).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_with_frame_count() {
        let json = br#"{
            "streams": [{"codec_type": "video", "codec_name": "h264", "width": 100,
                         "height": 100, "avg_frame_rate": "30/1", "nb_frames": "300"}],
            "format": {}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.effective_fps(), 30.0);
        assert_eq!(info.known_frame_count(), Some(300));
        assert_eq!(info.gray_frame_len(), 10_000);
    }

    #[test]
    fn test_parse_probe_without_video() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::InvalidVideo(_))
        ));
    }
}
