//! Adaptive key-frame selection.
//!
//! Short clips rarely have enough motion for scene-change thresholds to fire
//! usefully, so videos under the configured duration boundary are sampled at
//! uniform intervals. Longer videos go through scene-change detection, with
//! uniform sampling as a safety net when too few changes are found (near
//! static videos, slideshows).

use image::{GrayImage, RgbImage};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::frames::decoder::FrameDecoder;
use crate::frames::scene::{SceneChangeDetector, DEFAULT_MIN_CHANGE_SCORE};
use crate::probe::VideoInfo;

/// A key frame chosen by the selector. Ownership transfers to the caller.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Source frame index.
    pub index: u64,
    /// Seconds from the start of the video.
    pub timestamp: f64,
    pub pixels: RgbImage,
}

/// Tunables for key-frame selection.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Upper bound on returned frames.
    pub max_frames: usize,
    /// Minimum change score (percent of pixels) for a scene-change key frame.
    pub min_change_score: f64,
    /// Floor under which scene-change output is discarded for uniform sampling.
    pub min_keyframes: usize,
    /// Videos shorter than this (seconds) are sampled uniformly.
    pub short_video_threshold: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_frames: 30,
            min_change_score: DEFAULT_MIN_CHANGE_SCORE,
            min_keyframes: 5,
            short_video_threshold: 30.0,
        }
    }
}

impl SelectorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_frames: std::env::var("SELECTOR_MAX_FRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_frames),
            min_change_score: std::env::var("SELECTOR_MIN_CHANGE_SCORE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_change_score),
            min_keyframes: std::env::var("SELECTOR_MIN_KEYFRAMES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_keyframes),
            short_video_threshold: std::env::var("SELECTOR_SHORT_VIDEO_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.short_video_threshold),
        }
    }

    /// Set the maximum number of frames.
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Set the scene-change score threshold.
    pub fn with_min_change_score(mut self, score: f64) -> Self {
        self.min_change_score = score;
        self
    }
}

/// Sampling policy, chosen deterministically from video duration.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingPolicy {
    Uniform {
        max_frames: usize,
    },
    SceneChange {
        max_frames: usize,
        min_change_score: f64,
        frame_skip: u64,
    },
}

impl SamplingPolicy {
    /// Choose the policy for a probed container.
    pub fn choose(info: &VideoInfo, config: &SelectorConfig) -> Self {
        if info.duration < config.short_video_threshold {
            SamplingPolicy::Uniform {
                max_frames: config.max_frames,
            }
        } else {
            SamplingPolicy::SceneChange {
                max_frames: config.max_frames,
                min_change_score: config.min_change_score,
                frame_skip: (info.fps.round() as u64).max(1),
            }
        }
    }
}

/// Chooses a sampling policy and extracts key frames.
#[derive(Debug, Clone, Default)]
pub struct KeyFrameSelector {
    config: SelectorConfig,
}

impl KeyFrameSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Select key frames from an opened container.
    ///
    /// Returns between 1 and `max_frames` frames in stream order. Fails with
    /// `Unreadable` when the container yields no decodable frames; retry
    /// policy, if any, belongs to the caller.
    pub async fn select_frames(
        &self,
        decoder: &dyn FrameDecoder,
    ) -> MediaResult<Vec<SampledFrame>> {
        let info = decoder.info().clone();
        if info.frame_count == 0 {
            return Err(MediaError::unreadable("Container reports zero frames"));
        }

        let policy = SamplingPolicy::choose(&info, &self.config);
        debug!(
            duration = info.duration,
            fps = info.fps,
            ?policy,
            "Selecting key frames"
        );

        let frames = match policy {
            SamplingPolicy::Uniform { max_frames } => {
                self.uniform_frames(decoder, &info, max_frames).await?
            }
            SamplingPolicy::SceneChange {
                max_frames,
                min_change_score,
                frame_skip,
            } => {
                let frames = self
                    .scene_change_frames(decoder, max_frames, min_change_score, frame_skip)
                    .await?;

                if frames.len() < self.config.min_keyframes {
                    info!(
                        found = frames.len(),
                        floor = self.config.min_keyframes,
                        "Too few scene changes, falling back to uniform sampling"
                    );
                    self.uniform_frames(decoder, &info, max_frames).await?
                } else {
                    frames
                }
            }
        };

        if frames.is_empty() {
            return Err(MediaError::unreadable("No frames could be decoded"));
        }

        Ok(frames)
    }

    /// Decode every `interval`-th frame up to the cap.
    async fn uniform_frames(
        &self,
        decoder: &dyn FrameDecoder,
        info: &VideoInfo,
        max_frames: usize,
    ) -> MediaResult<Vec<SampledFrame>> {
        let interval = (info.frame_count / max_frames as u64).max(1);
        let mut stream = decoder.stream(interval).await?;

        let mut frames = Vec::new();
        while frames.len() < max_frames {
            let Some(frame) = stream.next_frame().await? else {
                break;
            };
            frames.push(SampledFrame {
                index: frame.index,
                timestamp: frame.timestamp,
                pixels: frame.pixels,
            });
        }

        Ok(frames)
    }

    /// Evaluate frames at coarse steps, keeping those whose grayscale diff
    /// against the previous evaluated frame crosses the threshold. The first
    /// evaluated frame is always kept (nothing to diff against).
    async fn scene_change_frames(
        &self,
        decoder: &dyn FrameDecoder,
        max_frames: usize,
        min_change_score: f64,
        frame_skip: u64,
    ) -> MediaResult<Vec<SampledFrame>> {
        let detector = SceneChangeDetector::new(min_change_score);
        let mut stream = decoder.stream(frame_skip).await?;

        let mut previous: Option<GrayImage> = None;
        let mut frames = Vec::new();

        while frames.len() < max_frames {
            let Some(frame) = stream.next_frame().await? else {
                break;
            };
            let gray = image::imageops::grayscale(&frame.pixels);

            match &previous {
                Some(prev) => {
                    let score = SceneChangeDetector::score(prev, &gray);
                    if detector.is_scene_change(score) {
                        debug!(
                            index = frame.index,
                            score = score,
                            "Scene change detected"
                        );
                        frames.push(SampledFrame {
                            index: frame.index,
                            timestamp: frame.timestamp,
                            pixels: frame.pixels,
                        });
                    }
                }
                None => {
                    frames.push(SampledFrame {
                        index: frame.index,
                        timestamp: frame.timestamp,
                        pixels: frame.pixels,
                    });
                }
            }

            previous = Some(gray);
        }

        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::decoder::{DecodedFrame, FrameStream};
    use async_trait::async_trait;

    fn solid(luma: u8) -> RgbImage {
        RgbImage::from_pixel(4, 4, image::Rgb([luma, luma, luma]))
    }

    struct FakeDecoder {
        info: VideoInfo,
        frames: Vec<RgbImage>,
    }

    impl FakeDecoder {
        fn new(frames: Vec<RgbImage>, fps: f64) -> Self {
            let info = VideoInfo {
                duration: frames.len() as f64 / fps,
                width: 4,
                height: 4,
                fps,
                frame_count: frames.len() as u64,
                has_audio: false,
            };
            Self { info, frames }
        }
    }

    struct FakeStream {
        frames: Vec<(u64, RgbImage)>,
        fps: f64,
        position: usize,
    }

    #[async_trait]
    impl FrameStream for FakeStream {
        async fn next_frame(&mut self) -> MediaResult<Option<DecodedFrame>> {
            let Some((index, pixels)) = self.frames.get(self.position).cloned() else {
                return Ok(None);
            };
            self.position += 1;
            Ok(Some(DecodedFrame {
                index,
                timestamp: index as f64 / self.fps,
                pixels,
            }))
        }
    }

    #[async_trait]
    impl FrameDecoder for FakeDecoder {
        fn info(&self) -> &VideoInfo {
            &self.info
        }

        async fn stream(&self, step: u64) -> MediaResult<Box<dyn FrameStream>> {
            let step = step.max(1) as usize;
            let frames = self
                .frames
                .iter()
                .enumerate()
                .filter(|(i, _)| i % step == 0)
                .map(|(i, f)| (i as u64, f.clone()))
                .collect();
            Ok(Box::new(FakeStream {
                frames,
                fps: self.info.fps,
                position: 0,
            }))
        }
    }

    #[tokio::test]
    async fn test_short_video_uses_uniform_policy() {
        // 60 frames at 30 fps = 2 seconds
        let decoder = FakeDecoder::new((0..60).map(|_| solid(10)).collect(), 30.0);
        let config = SelectorConfig::default().with_max_frames(10);

        let policy = SamplingPolicy::choose(decoder.info(), &config);
        assert_eq!(policy, SamplingPolicy::Uniform { max_frames: 10 });

        let frames = KeyFrameSelector::new(config)
            .select_frames(&decoder)
            .await
            .unwrap();

        // interval = 60 / 10 = 6; timestamps follow index / fps exactly
        assert_eq!(frames.len(), 10);
        for (k, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index, k as u64 * 6);
            assert!((frame.timestamp - frame.index as f64 / 30.0).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_static_long_video_falls_back_to_uniform() {
        // 40 identical frames at 1 fps = 40 seconds, scene change never fires
        let decoder = FakeDecoder::new((0..40).map(|_| solid(10)).collect(), 1.0);
        let config = SelectorConfig::default();

        assert!(matches!(
            SamplingPolicy::choose(decoder.info(), &config),
            SamplingPolicy::SceneChange { .. }
        ));

        let frames = KeyFrameSelector::new(config.clone())
            .select_frames(&decoder)
            .await
            .unwrap();

        // The single scene-change hit (first frame) is below the floor, so
        // uniform sampling takes over.
        assert!(frames.len() > config.min_keyframes);
        assert!(frames.len() <= config.max_frames);
    }

    #[tokio::test]
    async fn test_scene_changes_are_detected_and_bounded() {
        // Alternate black/white every frame: every evaluated pair differs
        let frames: Vec<RgbImage> = (0..40)
            .map(|i| if i % 2 == 0 { solid(0) } else { solid(255) })
            .collect();
        let decoder = FakeDecoder::new(frames, 1.0);
        let config = SelectorConfig::default();

        let selected = KeyFrameSelector::new(config.clone())
            .select_frames(&decoder)
            .await
            .unwrap();

        assert_eq!(selected.len(), config.max_frames);
        // First evaluated frame is always present
        assert_eq!(selected[0].index, 0);
    }

    #[tokio::test]
    async fn test_timestamps_are_ordered_and_in_range() {
        let frames: Vec<RgbImage> = (0..50)
            .map(|i| if i % 3 == 0 { solid(0) } else { solid(255) })
            .collect();
        let decoder = FakeDecoder::new(frames, 1.0);
        let duration = decoder.info().duration;

        let selected = KeyFrameSelector::new(SelectorConfig::default())
            .select_frames(&decoder)
            .await
            .unwrap();

        assert!(!selected.is_empty());
        for pair in selected.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        for frame in &selected {
            assert!(frame.timestamp >= 0.0 && frame.timestamp <= duration);
        }
    }

    #[tokio::test]
    async fn test_fewer_frames_than_cap_returns_all() {
        let decoder = FakeDecoder::new((0..5).map(|_| solid(10)).collect(), 30.0);

        let frames = KeyFrameSelector::new(SelectorConfig::default())
            .select_frames(&decoder)
            .await
            .unwrap();

        assert_eq!(frames.len(), 5);
    }

    #[tokio::test]
    async fn test_empty_container_is_unreadable() {
        let decoder = FakeDecoder::new(Vec::new(), 30.0);

        let result = KeyFrameSelector::new(SelectorConfig::default())
            .select_frames(&decoder)
            .await;

        assert!(matches!(result, Err(MediaError::Unreadable(_))));
    }
}
