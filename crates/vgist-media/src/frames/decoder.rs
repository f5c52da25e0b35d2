//! Frame decoding.
//!
//! Production decoding shells out to `ffmpeg`, piping `rawvideo` rgb24
//! frames through stdout with a `select` filter doing the coarse stepping.
//! The [`FrameDecoder`] trait is the seam the selector is written against;
//! tests substitute a synthetic decoder.

use async_trait::async_trait;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};

/// A decoded video frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Source frame index (position in the full stream, not the sampled one).
    pub index: u64,
    /// Seconds from the start of the video.
    pub timestamp: f64,
    pub pixels: RgbImage,
}

/// An in-order stream of decoded frames at a fixed coarse step.
#[async_trait]
pub trait FrameStream: Send {
    /// Next decoded frame, or `None` at end of stream.
    async fn next_frame(&mut self) -> MediaResult<Option<DecodedFrame>>;
}

/// Opens a video container and streams decoded frames.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    /// Container metadata read at open time.
    fn info(&self) -> &VideoInfo;

    /// Stream frames whose source index is a multiple of `step` (step >= 1),
    /// starting from frame 0.
    async fn stream(&self, step: u64) -> MediaResult<Box<dyn FrameStream>>;
}

/// FFmpeg-backed decoder.
pub struct FfmpegFrameDecoder {
    path: PathBuf,
    info: VideoInfo,
}

impl FfmpegFrameDecoder {
    /// Probe the container and prepare a decoder for it.
    ///
    /// Fails with `Unreadable` when the container cannot be opened or has
    /// no decodable video frames.
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let info = probe_video(path).await?;

        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }
}

#[async_trait]
impl FrameDecoder for FfmpegFrameDecoder {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    async fn stream(&self, step: u64) -> MediaResult<Box<dyn FrameStream>> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let step = step.max(1);
        // The comma is escaped for the filter-graph parser, not the shell.
        let filter = format!("select=not(mod(n\\,{step}))");

        debug!(
            path = %self.path.display(),
            step = step,
            "Starting ffmpeg frame stream"
        );

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&self.path)
            .args(["-vf", &filter])
            .args(["-vsync", "vfr"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("Failed to capture ffmpeg stdout", None))?;

        Ok(Box::new(FfmpegFrameStream {
            _child: child,
            stdout,
            width: self.info.width,
            height: self.info.height,
            fps: self.info.fps,
            step,
            produced: 0,
        }))
    }
}

struct FfmpegFrameStream {
    // Held so the process is killed when the stream is dropped early.
    _child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    fps: f64,
    step: u64,
    produced: u64,
}

#[async_trait]
impl FrameStream for FfmpegFrameStream {
    async fn next_frame(&mut self) -> MediaResult<Option<DecodedFrame>> {
        let frame_size = (self.width as usize) * (self.height as usize) * 3;
        if frame_size == 0 {
            return Err(MediaError::unreadable("Container reports zero dimensions"));
        }

        let mut buf = vec![0u8; frame_size];
        match self.stdout.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let pixels = RgbImage::from_raw(self.width, self.height, buf)
            .ok_or_else(|| MediaError::unreadable("Decoded frame has unexpected size"))?;

        let index = self.produced * self.step;
        self.produced += 1;

        Ok(Some(DecodedFrame {
            index,
            timestamp: index as f64 / self.fps,
            pixels,
        }))
    }
}
