//! Scene-change detection over grayscale rasters.
//!
//! A frame is compared against the previously *evaluated* frame by absolute
//! pixel difference; the change score is the percentage of pixels that
//! differ at all. Scores above the configured threshold mark a key frame.

use image::GrayImage;

/// Default minimum change score (percent of pixels changed) for a key frame.
pub const DEFAULT_MIN_CHANGE_SCORE: f64 = 30.0;

/// Scores grayscale frame pairs for scene changes.
#[derive(Debug, Clone)]
pub struct SceneChangeDetector {
    min_change_score: f64,
}

impl Default for SceneChangeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CHANGE_SCORE)
    }
}

impl SceneChangeDetector {
    /// Create a detector with the given change-score threshold.
    pub fn new(min_change_score: f64) -> Self {
        Self { min_change_score }
    }

    /// Percentage of pixels that differ between two frames, in `[0, 100]`.
    ///
    /// Mismatched dimensions count as a full change.
    pub fn score(previous: &GrayImage, current: &GrayImage) -> f64 {
        if previous.dimensions() != current.dimensions() {
            return 100.0;
        }

        let total = previous.as_raw().len();
        if total == 0 {
            return 0.0;
        }

        let changed = previous
            .as_raw()
            .iter()
            .zip(current.as_raw().iter())
            .filter(|(a, b)| a != b)
            .count();

        changed as f64 * 100.0 / total as f64
    }

    /// Whether a score crosses the key-frame threshold.
    pub fn is_scene_change(&self, score: f64) -> bool {
        score > self.min_change_score
    }
}
