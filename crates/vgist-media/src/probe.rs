//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Total number of video frames (from `nb_frames`, or estimated from
    /// duration and frame rate when the container doesn't carry it)
    pub frame_count: u64,
    /// Whether the container has an audio stream
    pub has_audio: bool,
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
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Probe a video file for information.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    // Check FFprobe exists
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
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    video_info_from_probe(probe)
}

/// Convert parsed ffprobe output into a [`VideoInfo`].
///
/// Fails with `Unreadable` when no video stream is present or the container
/// reports no frames at all.
fn video_info_from_probe(probe: FfprobeOutput) -> MediaResult<VideoInfo> {
    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::unreadable("No video stream found"))?;

    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    let frame_count = video_stream
        .nb_frames
        .as_ref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| (duration * fps).round() as u64);

    if frame_count == 0 {
        return Err(MediaError::unreadable("Container reports zero frames"));
    }

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        frame_count,
        has_audio,
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
    }

    fn sample_probe(json: &str) -> FfprobeOutput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_video_info_from_probe() {
        let probe = sample_probe(
            r#"{
                "format": {"duration": "120.5"},
                "streams": [
                    {"codec_type": "video", "width": 1920, "height": 1080,
                     "avg_frame_rate": "30/1", "nb_frames": "3615"},
                    {"codec_type": "audio"}
                ]
            }"#,
        );

        let info = video_info_from_probe(probe).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.frame_count, 3615);
        assert!(info.has_audio);
        assert!((info.fps - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_frame_count_estimated_when_missing() {
        let probe = sample_probe(
            r#"{
                "format": {"duration": "10.0"},
                "streams": [
                    {"codec_type": "video", "width": 640, "height": 360,
                     "r_frame_rate": "25/1"}
                ]
            }"#,
        );

        let info = video_info_from_probe(probe).unwrap();
        assert_eq!(info.frame_count, 250);
        assert!(!info.has_audio);
    }

    #[test]
    fn test_no_video_stream_is_unreadable() {
        let probe = sample_probe(
            r#"{"format": {"duration": "10.0"}, "streams": [{"codec_type": "audio"}]}"#,
        );
        assert!(matches!(
            video_info_from_probe(probe),
            Err(MediaError::Unreadable(_))
        ));
    }

    #[test]
    fn test_zero_frames_is_unreadable() {
        let probe = sample_probe(
            r#"{"format": {}, "streams": [{"codec_type": "video", "r_frame_rate": "30/1"}]}"#,
        );
        assert!(matches!(
            video_info_from_probe(probe),
            Err(MediaError::Unreadable(_))
        ));
    }
}
