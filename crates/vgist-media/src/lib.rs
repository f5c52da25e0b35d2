//! FFmpeg CLI wrapper for video processing.
//!
//! This crate provides:
//! - Container probing via `ffprobe` JSON output
//! - Frame decoding through a trait seam (production: `ffmpeg` rawvideo pipe)
//! - Scene-change detection over grayscale rasters
//! - Adaptive key-frame selection with a uniform-sampling safety net
//! - Audio track extraction for transcription
//! - On-screen text extraction via the `tesseract` CLI

pub mod audio;
pub mod error;
pub mod frames;
pub mod ocr;
pub mod probe;

pub use audio::extract_audio;
pub use error::{MediaError, MediaResult};
pub use frames::decoder::{DecodedFrame, FfmpegFrameDecoder, FrameDecoder, FrameStream};
pub use frames::scene::SceneChangeDetector;
pub use frames::selector::{KeyFrameSelector, SampledFrame, SamplingPolicy, SelectorConfig};
pub use ocr::OcrEngine;
pub use probe::{probe_video, VideoInfo};
