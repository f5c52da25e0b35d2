//! Audio track extraction for transcription.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// Extract the audio track of a video to an mp3 file.
///
/// Returns `Ok(None)` when the container has no audio stream, so callers can
/// skip transcription instead of failing the job.
pub async fn extract_audio(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<Option<PathBuf>> {
    let video_path = video_path.as_ref();
    let output_path = output_path.as_ref();

    let info = probe_video(video_path).await?;
    if !info.has_audio {
        info!(
            video = %video_path.display(),
            "No audio stream detected, skipping extraction"
        );
        return Ok(None);
    }

    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    debug!(
        video = %video_path.display(),
        output = %output_path.display(),
        "Extracting audio track"
    );

    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-i"])
        .arg(video_path)
        .args(["-vn", "-acodec", "libmp3lame", "-q:a", "2"])
        .arg(output_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "Audio extraction failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    if !output_path.exists() {
        return Err(MediaError::ffmpeg_failed(
            "Audio output file not created",
            None,
        ));
    }

    Ok(Some(output_path.to_path_buf()))
}
