//! On-screen text extraction via the `tesseract` CLI.
//!
//! OCR is best-effort: a missing binary or a failed invocation degrades to
//! empty text rather than failing the job.

use image::{GrayImage, RgbImage};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Binarization cutoff applied before OCR.
const DEFAULT_OCR_THRESHOLD: u8 = 150;

/// Tesseract wrapper with raster preprocessing.
#[derive(Debug, Clone)]
pub struct OcrEngine {
    threshold: u8,
}

impl Default for OcrEngine {
    fn default() -> Self {
        Self::new(DEFAULT_OCR_THRESHOLD)
    }
}

impl OcrEngine {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    /// Extract text from a single frame.
    ///
    /// Returns an empty string when tesseract is unavailable or fails.
    pub async fn extract_text(&self, frame: &RgbImage) -> MediaResult<String> {
        if which::which("tesseract").is_err() {
            warn!("tesseract not found in PATH, skipping OCR");
            return Ok(String::new());
        }

        let preprocessed = self.preprocess(frame);

        let dir = tempfile::tempdir()?;
        let input_path = dir.path().join("frame.png");
        preprocessed
            .save(&input_path)
            .map_err(|e| crate::error::MediaError::ocr_failed(e.to_string()))?;

        let output = Command::new("tesseract")
            .arg(&input_path)
            .arg("stdout")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            warn!(
                exit = ?output.status.code(),
                "tesseract failed, returning empty text"
            );
            return Ok(String::new());
        }

        let text = clean_text(&String::from_utf8_lossy(&output.stdout));
        debug!(chars = text.len(), "OCR extracted text");
        Ok(text)
    }

    /// Grayscale and binarize the frame to improve OCR accuracy.
    fn preprocess(&self, frame: &RgbImage) -> GrayImage {
        let gray = image::imageops::grayscale(frame);
        let mut binary = gray;
        for pixel in binary.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > self.threshold { 255 } else { 0 };
        }
        binary
    }
}

/// Collapse whitespace runs into single spaces.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  hello \n\n world\t!  "), "hello world !");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_preprocess_binarizes() {
        let mut frame = RgbImage::from_pixel(2, 1, image::Rgb([200, 200, 200]));
        frame.put_pixel(1, 0, image::Rgb([10, 10, 10]));

        let binary = OcrEngine::default().preprocess(&frame);
        assert_eq!(binary.get_pixel(0, 0).0[0], 255);
        assert_eq!(binary.get_pixel(1, 0).0[0], 0);
    }
}
